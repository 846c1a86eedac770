//! Input resolution: turn a path, URL or uploaded buffer into PDF bytes.
//!
//! URL inputs are downloaded into a `TempDir` that lives as long as the
//! returned [`ResolvedInput`], so nothing is left behind if the run fails.
//! Every route ends in the same `%PDF` magic check, which gives callers a
//! meaningful error instead of a parser failure deep in extraction.

use crate::error::ContentGenError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input — either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory kept alive here.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// File stem used to name exported documents.
    pub fn stem(&self) -> String {
        file_stem(self.path())
    }
}

/// Stem of `path`, falling back to "document" for odd names.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, ContentGenError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Read a resolved input and confirm it is a PDF.
pub async fn read_pdf(resolved: &ResolvedInput) -> Result<Vec<u8>, ContentGenError> {
    let path = resolved.path();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ContentGenError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ContentGenError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;
    check_magic(&bytes).map_err(|magic| ContentGenError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Validate an in-memory upload: non-empty, within `max_bytes`, `%PDF` magic.
pub fn validate_upload(name: &str, bytes: &[u8], max_bytes: usize) -> Result<(), ContentGenError> {
    if bytes.is_empty() {
        return Err(ContentGenError::EmptyUpload { name: name.to_string() });
    }
    if bytes.len() > max_bytes {
        return Err(ContentGenError::UploadTooLarge {
            name: name.to_string(),
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    check_magic(bytes).map_err(|magic| ContentGenError::NotAPdf {
        path: PathBuf::from(name),
        magic,
    })
}

/// `Ok` when `bytes` starts with `%PDF`; otherwise the first (up to) 4 bytes.
pub fn check_magic(bytes: &[u8]) -> Result<(), [u8; 4]> {
    if bytes.len() >= 4 && &bytes[..4] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(magic)
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, ContentGenError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(ContentGenError::FileNotFound { path });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ContentGenError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ContentGenError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ContentGenError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ContentGenError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ContentGenError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let temp_dir = TempDir::new().map_err(|e| ContentGenError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ContentGenError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ContentGenError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_check_magic() {
        assert!(check_magic(b"%PDF-1.7\n").is_ok());
        assert_eq!(check_magic(b"PK\x03\x04rest"), Err(*b"PK\x03\x04"));
        assert_eq!(check_magic(b"%P"), Err([b'%', b'P', 0, 0]));
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("a.pdf", b"%PDF-1.4", 100).is_ok());
        assert!(matches!(
            validate_upload("a.pdf", b"", 100),
            Err(ContentGenError::EmptyUpload { .. })
        ));
        assert!(matches!(
            validate_upload("a.pdf", b"%PDF-1.4 and more", 4),
            Err(ContentGenError::UploadTooLarge { size: 17, limit: 4, .. })
        ));
        assert!(matches!(
            validate_upload("a.docx", b"PK\x03\x04", 100),
            Err(ContentGenError::NotAPdf { .. })
        ));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://arxiv.org/pdf/paper.pdf"), "paper.pdf");
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706"), "downloaded.pdf");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/tmp/report.v2.pdf")), "report.v2");
        assert_eq!(file_stem(Path::new("/")), "document");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.err().unwrap();
        assert!(matches!(err, ContentGenError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn read_pdf_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello world").unwrap();
        let resolved = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        let err = read_pdf(&resolved).await.unwrap_err();
        assert!(matches!(err, ContentGenError::NotAPdf { magic, .. } if &magic == b"hell"));
    }
}
