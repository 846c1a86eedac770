//! Document export.
//!
//! ```text
//! <output_dir>/<unix-seconds>/<stem>[_english].pdf
//!                             <stem>[_english].html
//! ```
//!
//! [`export_all`] writes every requested format. A format that fails is
//! logged and recorded in the report; the run only fails when nothing at all
//! was written.

pub mod html;
pub mod pdf;

use crate::config::OutputFormat;
use crate::error::ContentGenError;
use crate::output::ExportReport;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// File stem for exported documents.
pub fn output_stem(input_stem: &str, translated: bool) -> String {
    if translated {
        format!("{input_stem}_english")
    } else {
        input_stem.to_string()
    }
}

/// Create a fresh `<root>/<unix-seconds>` directory.
///
/// A run that starts in the same second as an earlier one gets a
/// `-1`, `-2`, … suffix instead of sharing its directory.
pub fn create_export_dir(root: &Path) -> Result<PathBuf, ContentGenError> {
    std::fs::create_dir_all(root).map_err(|e| ContentGenError::OutputDirFailed {
        path: root.to_path_buf(),
        source: e,
    })?;

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut suffix = 0u32;
    loop {
        let name = if suffix == 0 {
            secs.to_string()
        } else {
            format!("{secs}-{suffix}")
        };
        let dir = root.join(name);
        match std::fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => {
                return Err(ContentGenError::OutputDirFailed { path: dir, source: e });
            }
        }
    }
}

/// Write the selected formats of `markdown` into `dir`.
///
/// `title` overrides the title each exporter would otherwise derive.
pub fn export_all(
    markdown: &str,
    title: Option<&str>,
    stem: &str,
    dir: &Path,
    format: OutputFormat,
) -> Result<ExportReport, ContentGenError> {
    let mut report = ExportReport {
        directory: dir.to_path_buf(),
        ..Default::default()
    };

    if format.wants_pdf() {
        match pdf::export_pdf(markdown, title, stem, dir) {
            Ok(file) => {
                info!("Wrote {} ({} bytes)", file.path.display(), file.bytes);
                report.files.push(file);
            }
            Err(e) => {
                warn!("{}", e);
                report.errors.push(e);
            }
        }
    }

    if format.wants_html() {
        match html::export_html(markdown, title, stem, dir) {
            Ok(file) => {
                info!("Wrote {} ({} bytes)", file.path.display(), file.bytes);
                report.files.push(file);
            }
            Err(e) => {
                warn!("{}", e);
                report.errors.push(e);
            }
        }
    }

    if report.files.is_empty() {
        let reasons = report
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ContentGenError::NoOutputs(reasons));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems() {
        assert_eq!(output_stem("paper", false), "paper");
        assert_eq!(output_stem("paper", true), "paper_english");
    }

    #[test]
    fn export_dirs_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = create_export_dir(root.path()).unwrap();
        let b = create_export_dir(root.path()).unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
        assert_eq!(a.parent(), Some(root.path()));
    }

    #[test]
    fn export_both() {
        let root = tempfile::tempdir().unwrap();
        let report =
            export_all("# T\n\nBody", None, "doc", root.path(), OutputFormat::Both).unwrap();
        assert_eq!(report.files.len(), 2);
        assert!(report.errors.is_empty());
        assert!(report.find("pdf").is_some());
        assert!(report.find("html").is_some());
    }

    #[test]
    fn export_only_html() {
        let root = tempfile::tempdir().unwrap();
        let report =
            export_all("# T", None, "doc", root.path(), OutputFormat::Html).unwrap();
        assert_eq!(report.files.len(), 1);
        assert!(!root.path().join("doc.pdf").exists());
    }

    #[test]
    fn nothing_written_is_no_outputs() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("gone");
        let err = export_all("# T", None, "doc", &missing, OutputFormat::Both).unwrap_err();
        match err {
            ContentGenError::NoOutputs(msg) => {
                assert!(msg.contains("pdf export"));
                assert!(msg.contains("html export"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
