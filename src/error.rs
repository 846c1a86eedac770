//! Error types for the edgequake-contentgen library.
//!
//! Two kinds of failure, two kinds of type:
//!
//! * [`ContentGenError`] — **Fatal**: the run cannot produce a document
//!   (bad upload, unreadable PDF, provider not configured, every crew step
//!   exhausted its retries). Returned as `Err(ContentGenError)` from the
//!   top-level `convert*` / `write_blog` functions.
//!
//! * [`StepError`] / [`ExportError`] — **Non-fatal**: recorded inside
//!   [`crate::output::ConversionOutput`] so callers can see that, say, the
//!   HTML export failed while the PDF export succeeded.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-contentgen library.
#[derive(Debug, Error)]
pub enum ContentGenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The uploaded buffer contained no bytes at all.
    #[error("Uploaded file '{name}' is empty")]
    EmptyUpload { name: String },

    /// The uploaded buffer exceeds the configured size limit.
    #[error("Uploaded file '{name}' is {size} bytes; the limit is {limit} bytes")]
    UploadTooLarge { name: String, size: usize, limit: usize },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF could not be parsed.
    #[error("PDF '{path}' could not be read: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PDF parsed, but no page carries any extractable text
    /// (typically a scanned document without a text layer).
    #[error("PDF '{path}' has {pages} pages but no extractable text.\nScanned documents need OCR first.")]
    NoExtractableText { path: PathBuf, pages: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A crew step failed after all retries; the chain cannot continue.
    #[error("{role} step failed after {retries} retries: {detail}")]
    LlmFailed {
        role: String,
        retries: u32,
        detail: String,
    },

    /// The model answered, but with nothing usable.
    #[error("{role} step returned an empty response")]
    EmptyResponse { role: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the export directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every requested export format failed.
    #[error("No outputs were generated: {0}")]
    NoOutputs(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or request validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContentGenError {
    /// `true` when the caller supplied something unusable (bad file, bad
    /// option) as opposed to an upstream or environment failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ContentGenError::FileNotFound { .. }
                | ContentGenError::PermissionDenied { .. }
                | ContentGenError::EmptyUpload { .. }
                | ContentGenError::UploadTooLarge { .. }
                | ContentGenError::NotAPdf { .. }
                | ContentGenError::CorruptPdf { .. }
                | ContentGenError::NoExtractableText { .. }
                | ContentGenError::InvalidConfig(_)
        )
    }
}

/// A single LLM step that exhausted its retries.
///
/// Converted into [`ContentGenError::LlmFailed`] by the crew, since the
/// following steps depend on its output.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StepError {
    /// Every attempt returned an error from the provider.
    #[error("{role}: LLM call failed after {retries} retries: {detail}")]
    Failed {
        role: String,
        retries: u32,
        detail: String,
    },

    /// The last attempt hit the per-call timeout.
    #[error("{role}: LLM call timed out after {secs}s")]
    Timeout { role: String, secs: u64 },
}

impl StepError {
    pub fn role(&self) -> &str {
        match self {
            StepError::Failed { role, .. } | StepError::Timeout { role, .. } => role,
        }
    }
}

impl From<StepError> for ContentGenError {
    fn from(e: StepError) -> Self {
        match e {
            StepError::Failed {
                role,
                retries,
                detail,
            } => ContentGenError::LlmFailed {
                role,
                retries,
                detail,
            },
            StepError::Timeout { role, secs } => ContentGenError::LlmFailed {
                role,
                retries: 0,
                detail: format!("timed out after {secs}s"),
            },
        }
    }
}

/// One export format that could not be written.
///
/// The other format (if requested) is still attempted.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{format} export to '{path}' failed: {detail}")]
pub struct ExportError {
    pub format: String,
    pub path: PathBuf,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_not_configured_display_carries_hint() {
        let e = ContentGenError::ProviderNotConfigured {
            provider: "gemini".into(),
            hint: "Set GEMINI_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"), "got: {msg}");
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn upload_too_large_display() {
        let e = ContentGenError::UploadTooLarge {
            name: "paper.pdf".into(),
            size: 300,
            limit: 200,
        };
        assert!(e.to_string().contains("300 bytes"));
        assert!(e.is_user_error());
    }

    #[test]
    fn step_timeout_maps_to_llm_failed() {
        let e: ContentGenError = StepError::Timeout {
            role: "Content Writer".into(),
            secs: 30,
        }
        .into();
        match e {
            ContentGenError::LlmFailed { role, detail, .. } => {
                assert_eq!(role, "Content Writer");
                assert!(detail.contains("30s"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn llm_failures_are_not_user_errors() {
        let e = ContentGenError::LlmFailed {
            role: "Research Analyst".into(),
            retries: 3,
            detail: "quota exceeded".into(),
        };
        assert!(!e.is_user_error());
    }

    #[test]
    fn export_error_display() {
        let e = ExportError {
            format: "html".into(),
            path: PathBuf::from("exports/1/doc.html"),
            detail: "disk full".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("html export"));
        assert!(msg.contains("disk full"));
    }
}
