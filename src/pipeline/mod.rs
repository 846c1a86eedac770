//! Pipeline stages for PDF-to-content conversion.
//!
//! Each submodule implements one transformation step; orchestration lives
//! in [`crate::convert`] and [`crate::crew`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ normalize ──▶ llm ──▶ postprocess
//! (URL/path) (pdf-extract) (cleanup)  (crew)  (polish)
//! ```
//!
//! 1. [`input`]   resolve the user-supplied path or URL to a local file and
//!    validate the PDF signature
//! 2. [`extract`] per-page text extraction; runs in `spawn_blocking` because
//!    the parser is CPU-bound
//! 3. [`normalize`] control-char removal, mojibake repair, Latin-1 folding
//! 4. [`llm`]     single chat calls with retry/backoff; the only stage with
//!    network I/O
//! 5. [`postprocess`] deterministic cleanup of model output before export

pub mod extract;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod postprocess;
