//! # edgequake-contentgen
//!
//! Turn research papers into readable, brand-aware content, and write blog
//! posts from a topic, using a chain of role-prompted LLM calls.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (path, URL or upload)
//!  │
//!  ├─ 1. Input      resolve local file or download from URL, check %PDF
//!  ├─ 2. Extract    per-page text (pdf-extract, spawn_blocking) + cleanup
//!  ├─ 3. Translate  optional, one extraction-temperature call
//!  ├─ 4. Brand      optional brand-guidelines summary, concurrent with 2–3
//!  ├─ 5. Crew       Research Analyst → Content Creator → Content Formatter
//!  ├─ 6. Polish     deterministic Markdown cleanup
//!  └─ 7. Export     PDF (lopdf) and/or HTML into exports/<unix-seconds>/
//! ```
//!
//! The blog writer ([`blog`]) runs its own three-step crew (research → NLP →
//! writer) and can score a post's quality and originality.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_contentgen::{convert, ConversionConfig, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Gemini by default; needs GEMINI_API_KEY (or GOOGLE_API_KEY)
//!     let config = ConversionConfig::builder()
//!         .output_format(OutputFormat::Both)
//!         .build()?;
//!     let output = convert("paper.pdf", &config).await?;
//!     for file in &output.exports.files {
//!         println!("{}", file.path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `contentgen` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `server` | on      | Enables [`server`], the axum upload UI behind `contentgen serve` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod blog;
pub mod config;
pub mod convert;
pub mod crew;
pub mod encoding;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use blog::{
    analyze_content, check_originality, export_blog, write_blog, BlogOutput, BlogRequest,
    OriginalityBand, OriginalityReport,
};
pub use config::{ConversionConfig, ConversionConfigBuilder, OutputFormat};
pub use convert::{convert, convert_from_bytes, convert_sync, inspect};
pub use encoding::EncodingReport;
pub use error::{ContentGenError, ExportError, StepError};
pub use output::{
    ConversionOutput, ConversionStats, ExportReport, ExportedFile, ExtractedDocument,
    InspectReport, StepResult,
};
pub use pipeline::llm::{ChatBackend, ChatReply, Prompt, SamplingOptions};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
