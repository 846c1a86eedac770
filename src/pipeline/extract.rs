//! Text extraction: per-page text via `pdf-extract`.
//!
//! `pdf-extract` is synchronous and CPU-bound, and it panics on some
//! malformed files instead of returning an error. Running it under
//! `spawn_blocking` keeps the Tokio workers free and turns a parser panic
//! into a `JoinError` that maps cleanly onto [`ContentGenError::CorruptPdf`].

use crate::error::ContentGenError;
use crate::output::ExtractedDocument;
use crate::pipeline::normalize::{clean_text, normalize_text};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extract the raw text of every page, in page order.
pub async fn extract_pages(bytes: Vec<u8>, source: &Path) -> Result<Vec<String>, ContentGenError> {
    let path = source.to_path_buf();

    let joined = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| e.to_string())
    })
    .await;

    match joined {
        Ok(Ok(pages)) => {
            debug!("Extracted {} pages from {}", pages.len(), path.display());
            Ok(pages)
        }
        Ok(Err(detail)) => Err(ContentGenError::CorruptPdf { path, detail }),
        Err(e) if e.is_panic() => Err(ContentGenError::CorruptPdf {
            path,
            detail: "PDF parser panicked on this file".to_string(),
        }),
        Err(e) => Err(ContentGenError::Internal(format!("Extraction task failed: {}", e))),
    }
}

/// Extract, normalise and page-mark a PDF.
///
/// Fails with [`ContentGenError::NoExtractableText`] when no page carries text.
pub async fn extract_document(
    bytes: Vec<u8>,
    source: &Path,
) -> Result<ExtractedDocument, ContentGenError> {
    let pages = extract_pages(bytes, source).await?;
    let doc = assemble(pages);

    if doc.pages.is_empty() {
        return Err(ContentGenError::NoExtractableText {
            path: PathBuf::from(source),
            pages: doc.page_count,
        });
    }

    info!(
        "Extracted text from {}/{} pages ({} chars)",
        doc.pages.len(),
        doc.page_count,
        doc.processed_text.len()
    );
    Ok(doc)
}

/// Build an [`ExtractedDocument`] from raw page texts.
///
/// Blank pages are skipped but keep their place in the numbering.
pub fn assemble(pages: Vec<String>) -> ExtractedDocument {
    let page_count = pages.len();
    let mut kept = Vec::new();
    let mut processed_text = String::new();

    for (idx, raw) in pages.into_iter().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let num = idx + 1;
        let cleaned = clean_text(&normalize_text(&raw));
        processed_text.push_str(&format!("\n=== Page {num} ===\n{cleaned}\n"));
        kept.push((num, raw));
    }

    ExtractedDocument {
        page_count,
        pages: kept,
        processed_text,
    }
}
