//! Progress-callback trait for stage and crew-step events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as a run moves through extraction, translation, the crew steps and
//! export. The CLI drives an `indicatif` spinner from these; the upload server
//! leaves them unset.
//!
//! # Example
//!
//! ```rust
//! use edgequake_contentgen::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     steps: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_step_complete(&self, step: usize, total: usize, role: &str, output_len: usize) {
//!         self.steps.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{step}/{total} {role}: {output_len} chars");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { steps: AtomicUsize::new(0) });
//! let config = ConversionConfig::builder()
//!     .progress_callback(cb as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Coarse pipeline stages, reported in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Extracting,
    Translating,
    BrandContext,
    Crew,
    Exporting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extracting => "Extracting text",
            Stage::Translating => "Translating",
            Stage::BrandContext => "Reading brand guidelines",
            Stage::Crew => "Running crew",
            Stage::Exporting => "Exporting",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a run progresses.
///
/// All methods default to no-ops so callers override only what they need.
/// Implementations must be `Send + Sync`: brand-context extraction runs
/// concurrently with main-text preparation.
pub trait ConversionProgressCallback: Send + Sync {
    /// A new stage has begun.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// A crew step is about to call the LLM.
    ///
    /// * `step`  — 1-indexed position in the crew
    /// * `total` — number of steps in the crew
    /// * `role`  — the agent's role, e.g. "Research Analyst"
    fn on_step_start(&self, step: usize, total: usize, role: &str) {
        let _ = (step, total, role);
    }

    /// A crew step finished; `output_len` is the byte length of its answer.
    fn on_step_complete(&self, step: usize, total: usize, role: &str, output_len: usize) {
        let _ = (step, total, role, output_len);
    }

    /// A crew step failed after all retries. The crew stops here.
    fn on_step_error(&self, step: usize, total: usize, role: &str, error: &str) {
        let _ = (step, total, role, error);
    }

    /// Called once after export with the number of files written.
    fn on_conversion_complete(&self, files_written: usize) {
        let _ = files_written;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        stages: Mutex<Vec<Stage>>,
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        written: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_step_start(&self, _step: usize, _total: usize, _role: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_step_complete(&self, _step: usize, _total: usize, _role: &str, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_step_error(&self, _step: usize, _total: usize, _role: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, files_written: usize) {
            self.written.store(files_written, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(Stage::Extracting);
        cb.on_step_start(1, 3, "Research Analyst");
        cb.on_step_complete(1, 3, "Research Analyst", 42);
        cb.on_step_error(2, 3, "Content Creator", "quota");
        cb.on_conversion_complete(2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_stage(Stage::Extracting);
        tracker.on_stage(Stage::Crew);
        tracker.on_step_start(1, 2, "a");
        tracker.on_step_complete(1, 2, "a", 10);
        tracker.on_step_start(2, 2, "b");
        tracker.on_step_error(2, 2, "b", "boom");
        tracker.on_conversion_complete(0);

        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![Stage::Extracting, Stage::Crew]
        );
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.written.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::BrandContext.to_string(), "Reading brand guidelines");
        assert_eq!(Stage::Exporting.to_string(), "Exporting");
    }
}
