//! Configuration types for content generation.
//!
//! Every run (PDF conversion or blog writing) is controlled through one
//! [`ConversionConfig`], built via its [`ConversionConfigBuilder`]. The same
//! struct is shared by the CLI, the upload server and library callers, so the
//! three front ends cannot drift apart on defaults.

use crate::error::ContentGenError;
use crate::pipeline::llm::ChatBackend;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Provider used when neither the config nor the environment names one.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Models offered in the CLI help and the upload form, with a one-line blurb.
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[
    ("gemini-2.0-flash", "Fast, efficient model for quick responses"),
    ("gemini-1.5-flash", "Balanced performance and speed"),
    ("gemini-2.5-pro", "Most capable model, best for complex tasks"),
    ("gemini-2.5-flash", "Fast version of 2.5, good balance"),
    ("gemini-1.5-pro", "Pro version with enhanced capabilities"),
];

/// Look up the blurb for a model id.
pub fn model_description(model: &str) -> Option<&'static str> {
    AVAILABLE_MODELS
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, blurb)| *blurb)
}

/// Configuration shared by the converter and the blog writer.
///
/// Built via [`ConversionConfig::builder()`] or [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_contentgen::{ConversionConfig, OutputFormat};
///
/// let config = ConversionConfig::builder()
///     .model("gemini-2.5-flash")
///     .output_format(OutputFormat::Html)
///     .translate(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// LLM model identifier. If None, [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    /// If None, `EDGEQUAKE_LLM_PROVIDER` or [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,

    /// Pre-constructed chat backend. Takes precedence over `provider_name`.
    pub backend: Option<Arc<dyn ChatBackend>>,

    /// Sampling temperature for the creative steps. Default: 0.7.
    ///
    /// Extraction-style calls (translation, brand summary) always run at
    /// [`ConversionConfig::EXTRACTION_TEMPERATURE`] regardless of this value.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per step. Default: 8192.
    ///
    /// The formatter step reproduces the whole document, so this must be
    /// large enough to hold it.
    pub max_tokens: usize,

    /// Maximum retry attempts on a failed LLM call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Largest accepted upload in bytes. Default: 200 MiB.
    pub max_upload_bytes: usize,

    /// Root directory for exports. Each run writes into a fresh
    /// `<output_dir>/<unix-seconds>/` subdirectory. Default: `exports`.
    pub output_dir: PathBuf,

    /// Which documents to write. Default: [`OutputFormat::Both`].
    pub output_format: OutputFormat,

    /// Translate the extracted text to English before the crew runs.
    /// Adds `_english` to the output file stem. Default: true.
    pub translate: bool,

    /// Optional brand guidelines PDF used to steer presentation.
    pub brand_guidelines: Option<PathBuf>,

    /// Progress events for each pipeline stage and crew step.
    pub progress_callback: Option<ProgressCallback>,
}

impl ConversionConfig {
    /// Temperature for calls that must copy rather than create.
    pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model that will be requested from the provider.
    pub fn effective_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            backend: None,
            temperature: 0.7,
            max_tokens: 8192,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            max_upload_bytes: 200 * 1024 * 1024,
            output_dir: PathBuf::from("exports"),
            output_format: OutputFormat::default(),
            translate: true,
            brand_guidelines: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn ChatBackend>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("output_dir", &self.output_dir)
            .field("output_format", &self.output_format)
            .field("translate", &self.translate)
            .field("brand_guidelines", &self.brand_guidelines)
            .finish()
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    /// Use an already-configured `edgequake-llm` provider.
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.backend = Some(Arc::new(
            crate::pipeline::llm::ProviderBackend::new(provider),
        ));
        self
    }

    /// Use any [`ChatBackend`] (test doubles, caching layers, …).
    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn translate(mut self, v: bool) -> Self {
        self.config.translate = v;
        self
    }

    pub fn brand_guidelines(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.brand_guidelines = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ContentGenError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ContentGenError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ContentGenError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(ContentGenError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(ContentGenError::InvalidConfig(
                "output_dir must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which documents a run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Html,
    #[default]
    Both,
}

impl OutputFormat {
    pub fn wants_pdf(self) -> bool {
        matches!(self, OutputFormat::Pdf | OutputFormat::Both)
    }

    pub fn wants_html(self) -> bool {
        matches!(self, OutputFormat::Html | OutputFormat::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Html => "html",
            OutputFormat::Both => "both",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ContentGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "html" => Ok(OutputFormat::Html),
            "both" => Ok(OutputFormat::Both),
            other => Err(ContentGenError::InvalidConfig(format!(
                "output format must be pdf, html or both (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.effective_model(), "gemini-2.0-flash");
        assert_eq!(c.output_format, OutputFormat::Both);
        assert_eq!(c.output_dir, PathBuf::from("exports"));
        assert!(c.translate);
        assert!((c.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ConversionConfig::builder().temperature(9.0).build().unwrap();
        assert!((c.temperature - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn builder_rejects_zero_tokens() {
        let err = ConversionConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, ContentGenError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_output_dir() {
        let err = ConversionConfig::builder().output_dir("").build().unwrap_err();
        assert!(err.to_string().contains("output_dir"));
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!(" html ".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("both".parse::<OutputFormat>().unwrap(), OutputFormat::Both);
        assert!("docx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_selection() {
        assert!(OutputFormat::Pdf.wants_pdf() && !OutputFormat::Pdf.wants_html());
        assert!(!OutputFormat::Html.wants_pdf() && OutputFormat::Html.wants_html());
        assert!(OutputFormat::Both.wants_pdf() && OutputFormat::Both.wants_html());
    }

    #[test]
    fn known_model_blurbs() {
        assert_eq!(
            model_description("gemini-2.5-pro"),
            Some("Most capable model, best for complex tasks")
        );
        assert_eq!(model_description("gpt-9"), None);
    }
}
