//! Research-PDF conversion entry points.
//!
//! ```text
//! resolve ─▶ extract ─▶ [translate] ─┐
//!                                    ├─▶ crew ─▶ polish ─▶ export
//!            [brand summary] ────────┘
//! ```
//!
//! The brand summary does not depend on the main document, so it runs
//! concurrently with extraction and translation.

use crate::config::ConversionConfig;
use crate::crew::Crew;
use crate::encoding::EncodingReport;
use crate::error::ContentGenError;
use crate::export;
use crate::output::{
    preview, ConversionOutput, ConversionStats, ExtractedDocument, InspectReport, StepResult,
};
use crate::pipeline::llm::{self, ChatBackend, Prompt, RetryPolicy, SamplingOptions};
use crate::pipeline::{extract, input, postprocess};
use crate::progress::Stage;
use crate::prompts;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Characters shown in `inspect` previews.
const PREVIEW_CHARS: usize = 1000;

/// Convert a PDF file or URL into exported documents.
///
/// # Errors
/// Fatal errors only: unusable input, provider not configured, a crew
/// step that exhausted its retries, or no export format written. A single
/// failed export format is recorded in `output.exports.errors` instead.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ContentGenError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let backend = llm::resolve_backend(config)?;

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let bytes = input::read_pdf(&resolved).await?;
    let stem = resolved.stem();

    run(backend, bytes, resolved.path(), input_str, &stem, config).await
}

/// Convert an uploaded PDF held in memory.
///
/// `name` is the uploaded file name; its stem names the exported files.
pub async fn convert_from_bytes(
    bytes: &[u8],
    name: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ContentGenError> {
    input::validate_upload(name, bytes, config.max_upload_bytes)?;
    info!("Starting conversion of upload '{}' ({} bytes)", name, bytes.len());

    let backend = llm::resolve_backend(config)?;
    let stem = input::file_stem(Path::new(name));

    run(backend, bytes.to_vec(), Path::new(name), name, &stem, config).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ContentGenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ContentGenError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract and describe a PDF without calling a model.
///
/// Does not require an API key.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<InspectReport, ContentGenError> {
    let input_str = input_str.as_ref();
    let resolved = input::resolve_input(input_str, 120).await?;
    let bytes = input::read_pdf(&resolved).await?;
    let file_bytes = bytes.len();

    let pages = extract::extract_pages(bytes, resolved.path()).await?;
    let doc = extract::assemble(pages);
    let raw = doc.raw_text();

    Ok(InspectReport {
        source: input_str.to_string(),
        file_bytes,
        page_count: doc.page_count,
        text_pages: doc.pages.len(),
        raw_chars: raw.chars().count(),
        processed_chars: doc.processed_text.chars().count(),
        encoding: EncodingReport::analyze(doc.processed_text.as_bytes()),
        raw_preview: preview(&raw, PREVIEW_CHARS),
        processed_preview: preview(&doc.processed_text, PREVIEW_CHARS),
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Extracted document plus the text the crew will read.
struct PreparedText {
    document: ExtractedDocument,
    crew_input: String,
    translation: Option<StepResult>,
}

async fn run(
    backend: Arc<dyn ChatBackend>,
    bytes: Vec<u8>,
    pdf_path: &Path,
    source: &str,
    stem: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ContentGenError> {
    let total_start = Instant::now();
    let progress = config.progress_callback.as_ref();
    let policy = RetryPolicy::from_config(config);

    // ── Step 1: Text + brand context, concurrently ───────────────────────
    let (prepared, brand) = futures::try_join!(
        prepare_text(backend.as_ref(), bytes, pdf_path, config),
        brand_context(backend.as_ref(), config),
    )?;

    // ── Step 2: Crew ─────────────────────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_stage(Stage::Crew);
    }
    let brand_summary = brand.as_ref().map(|s| s.output.as_str());
    let crew = Crew::new(prompts::research_crew(&prepared.crew_input, brand_summary));
    let crew_steps = crew
        .kickoff(
            backend.as_ref(),
            &SamplingOptions::creative(config),
            &policy,
            progress,
        )
        .await?;

    // ── Step 3: Polish ───────────────────────────────────────────────────
    let last = crew_steps
        .last()
        .ok_or_else(|| ContentGenError::Internal("crew returned no steps".into()))?;
    let markdown = postprocess::polish_markdown(&last.output);
    if markdown.trim().is_empty() {
        return Err(ContentGenError::EmptyResponse {
            role: last.role.clone(),
        });
    }

    // ── Step 4: Export ───────────────────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_stage(Stage::Exporting);
    }
    let dir = export::create_export_dir(&config.output_dir)?;
    let out_stem = export::output_stem(stem, config.translate);
    let exports = export::export_all(&markdown, None, &out_stem, &dir, config.output_format)?;

    if let Some(cb) = progress {
        cb.on_conversion_complete(exports.files.len());
    }

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let brand_context = brand.as_ref().map(|s| s.output.clone());
    let steps: Vec<StepResult> = prepared
        .translation
        .into_iter()
        .chain(brand)
        .chain(crew_steps)
        .collect();

    let stats = ConversionStats {
        total_pages: prepared.document.page_count,
        text_pages: prepared.document.pages.len(),
        extracted_chars: prepared.document.processed_text.chars().count(),
        total_input_tokens: steps.iter().map(|s| s.input_tokens as u64).sum(),
        total_output_tokens: steps.iter().map(|s| s.output_tokens as u64).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        llm_duration_ms: steps.iter().map(|s| s.duration_ms).sum(),
    };

    info!(
        "Conversion complete: {} steps, {} files, {}ms total",
        steps.len(),
        exports.files.len(),
        stats.total_duration_ms
    );

    Ok(ConversionOutput {
        source: source.to_string(),
        markdown,
        crew_input: prepared.crew_input,
        document: prepared.document,
        brand_context,
        steps,
        format: config.output_format,
        exports,
        stats,
    })
}

/// Extract the main document and translate it when requested.
async fn prepare_text(
    backend: &dyn ChatBackend,
    bytes: Vec<u8>,
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<PreparedText, ContentGenError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(Stage::Extracting);
    }
    let document = extract::extract_document(bytes, pdf_path).await?;

    if !config.translate {
        return Ok(PreparedText {
            crew_input: document.processed_text.clone(),
            document,
            translation: None,
        });
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(Stage::Translating);
    }
    let prompt = Prompt::new(
        prompts::TRANSLATOR_SYSTEM,
        prompts::translation_prompt(&document.processed_text),
    );
    let step = llm::run_step(
        backend,
        "Translator",
        &prompt,
        &SamplingOptions::extraction(config),
        &RetryPolicy::from_config(config),
    )
    .await?;
    debug!("Translated {} chars into {} chars", document.processed_text.len(), step.output.len());

    Ok(PreparedText {
        crew_input: step.output.clone(),
        document,
        translation: Some(step),
    })
}

/// Summarise the brand guidelines PDF, if one is configured.
async fn brand_context(
    backend: &dyn ChatBackend,
    config: &ConversionConfig,
) -> Result<Option<StepResult>, ContentGenError> {
    let Some(ref path) = config.brand_guidelines else {
        return Ok(None);
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(Stage::BrandContext);
    }
    let path_str = path.to_string_lossy();
    let resolved = input::resolve_input(&path_str, config.download_timeout_secs).await?;
    let bytes = input::read_pdf(&resolved).await?;
    let guidelines = extract::extract_document(bytes, resolved.path()).await?;

    let prompt = Prompt::new(
        prompts::BRAND_SYSTEM,
        prompts::brand_prompt(&guidelines.processed_text),
    );
    let step = llm::run_step(
        backend,
        "Brand Analyst",
        &prompt,
        &SamplingOptions::extraction(config),
        &RetryPolicy::from_config(config),
    )
    .await?;
    info!("Brand context: {} chars", step.output.len());

    Ok(Some(step))
}
