//! Result types returned by the converter and the blog writer.

use crate::config::OutputFormat;
use crate::encoding::EncodingReport;
use crate::error::ExportError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One completed crew step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Agent role, e.g. "Content Formatter".
    pub role: String,
    /// Raw model answer (before post-processing).
    pub output: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Attempts beyond the first.
    pub retries: u32,
}

/// Text pulled from the source PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Page count reported by the parser, including empty pages.
    pub page_count: usize,
    /// `(1-based page number, raw text)` for pages that carry text.
    pub pages: Vec<(usize, String)>,
    /// Normalised text with `=== Page N ===` markers, as fed to the crew.
    pub processed_text: String,
}

impl ExtractedDocument {
    /// Raw text with the same page markers, for side-by-side inspection.
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        for (num, text) in &self.pages {
            out.push_str(&format!("\n=== Page {num} Raw ===\n{text}\n"));
        }
        out
    }
}

/// A file written by an exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFile {
    /// "pdf" or "html".
    pub format: String,
    pub path: PathBuf,
    pub bytes: u64,
}

impl ExportedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// What the exporters produced for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportReport {
    /// Directory the files were written to (`<output_dir>/<id>`).
    pub directory: PathBuf,
    pub files: Vec<ExportedFile>,
    pub errors: Vec<ExportError>,
}

impl ExportReport {
    pub fn find(&self, format: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|f| f.format == format)
            .map(|f| f.path.as_path())
    }
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub text_pages: usize,
    pub extracted_chars: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// Everything a PDF conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Source name (file name or URL) the run was started with.
    pub source: String,
    /// Final, post-processed Markdown that was exported.
    pub markdown: String,
    /// Text that went into the crew (translated when requested).
    pub crew_input: String,
    pub document: ExtractedDocument,
    /// Brand summary, when guidelines were supplied.
    pub brand_context: Option<String>,
    pub steps: Vec<StepResult>,
    pub format: OutputFormat,
    pub exports: ExportReport,
    pub stats: ConversionStats,
}

/// What `inspect` learned about a PDF without calling a model.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub source: String,
    pub file_bytes: usize,
    pub page_count: usize,
    pub text_pages: usize,
    pub raw_chars: usize,
    pub processed_chars: usize,
    /// Encoding view of the processed text.
    pub encoding: EncodingReport,
    /// First characters of the raw and processed text.
    pub raw_preview: String,
    pub processed_preview: String,
}

/// First `max` characters of `text`, with `...` when cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_text_keeps_page_numbers() {
        let doc = ExtractedDocument {
            page_count: 3,
            pages: vec![(1, "alpha".into()), (3, "gamma".into())],
            processed_text: String::new(),
        };
        let raw = doc.raw_text();
        assert!(raw.contains("=== Page 1 Raw ===\nalpha"));
        assert!(raw.contains("=== Page 3 Raw ===\ngamma"));
        assert!(!raw.contains("Page 2"));
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        assert_eq!(preview("नमस्ते", 2), "नम...");
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn export_report_find() {
        let report = ExportReport {
            directory: PathBuf::from("exports/1"),
            files: vec![ExportedFile {
                format: "pdf".into(),
                path: PathBuf::from("exports/1/doc.pdf"),
                bytes: 10,
            }],
            errors: vec![],
        };
        assert_eq!(report.find("pdf"), Some(Path::new("exports/1/doc.pdf")));
        assert_eq!(report.find("html"), None);
        assert_eq!(report.files[0].file_name(), "doc.pdf");
    }
}
