//! LLM interaction: one system + one user message per step, with retry.
//!
//! Everything that talks to a model goes through [`ChatBackend`]. The
//! production implementation, [`ProviderBackend`], adapts an
//! `edgequake-llm` provider; tests plug in scripted backends instead.
//!
//! ## Retry Strategy
//!
//! Quota and overload errors from hosted models are transient. Attempts are
//! spaced by `retry_backoff_ms * 2^(attempt-1)`: with the defaults (500 ms,
//! 3 retries) the waits are 500 ms → 1 s → 2 s. Each attempt is bounded by
//! `api_timeout_secs`.

use crate::config::{ConversionConfig, DEFAULT_PROVIDER};
use crate::error::{ContentGenError, StepError};
use crate::output::StepResult;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// A two-message prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Sampling parameters for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl SamplingOptions {
    /// The configured temperature; used for the crew's writing steps.
    pub fn creative(config: &ConversionConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Low temperature for translation and summarisation.
    pub fn extraction(config: &ConversionConfig) -> Self {
        Self {
            temperature: ConversionConfig::EXTRACTION_TEMPERATURE,
            max_tokens: config.max_tokens,
        }
    }
}

/// A model answer with its token accounting.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Anything that can answer a [`Prompt`].
///
/// Errors are plain strings: the caller only logs them and decides whether
/// to retry.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, prompt: &Prompt, options: &SamplingOptions) -> Result<ChatReply, String>;
}

/// [`ChatBackend`] over an `edgequake-llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChatBackend for ProviderBackend {
    async fn chat(&self, prompt: &Prompt, options: &SamplingOptions) -> Result<ChatReply, String> {
        let messages = vec![
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];
        let options = build_options(options);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| e.to_string())?;

        Ok(ChatReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

fn build_options(options: &SamplingOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_tokens),
        ..Default::default()
    }
}

// ── Step execution ───────────────────────────────────────────────────────

/// Retry and timeout settings for [`run_step`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
            timeout_secs: config.api_timeout_secs,
        }
    }

    /// Delay before `attempt` (1-based retry number).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

enum AttemptFailure {
    Error(String),
    Timeout,
}

/// Run one LLM step for `role`, retrying until it returns non-empty text.
///
/// An empty answer counts as a failed attempt.
pub async fn run_step(
    backend: &dyn ChatBackend,
    role: &str,
    prompt: &Prompt,
    options: &SamplingOptions,
    policy: &RetryPolicy,
) -> Result<StepResult, StepError> {
    let start = Instant::now();
    let per_call = Duration::from_secs(policy.timeout_secs);
    let mut last_failure = AttemptFailure::Error("no attempt made".to_string());

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let backoff = policy.backoff(attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                role,
                attempt,
                policy.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }

        match timeout(per_call, backend.chat(prompt, options)).await {
            Ok(Ok(reply)) if !reply.content.trim().is_empty() => {
                let duration = start.elapsed();
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    role, reply.prompt_tokens, reply.completion_tokens, duration
                );
                return Ok(StepResult {
                    role: role.to_string(),
                    output: reply.content,
                    input_tokens: reply.prompt_tokens,
                    output_tokens: reply.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt,
                });
            }
            Ok(Ok(_)) => {
                warn!("{}: attempt {} returned an empty response", role, attempt + 1);
                last_failure = AttemptFailure::Error("empty response".to_string());
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", role, attempt + 1, e);
                last_failure = AttemptFailure::Error(e);
            }
            Err(_) => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    role,
                    attempt + 1,
                    policy.timeout_secs
                );
                last_failure = AttemptFailure::Timeout;
            }
        }
    }

    Err(match last_failure {
        AttemptFailure::Timeout => StepError::Timeout {
            role: role.to_string(),
            secs: policy.timeout_secs,
        },
        AttemptFailure::Error(detail) => StepError::Failed {
            role: role.to_string(),
            retries: policy.max_retries,
            detail,
        },
    })
}

// ── Provider resolution ──────────────────────────────────────────────────

/// API key variables checked for each provider. Any one of them suffices.
fn key_variables(provider: &str) -> Option<&'static [&'static str]> {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
        "openai" => Some(&["OPENAI_API_KEY"]),
        "anthropic" => Some(&["ANTHROPIC_API_KEY"]),
        "mistral" => Some(&["MISTRAL_API_KEY"]),
        _ => None,
    }
}

/// Return a hint when `provider` needs an API key that `lookup` cannot find.
///
/// Local providers (`ollama`, `lmstudio`) and unknown names are left to the
/// provider factory.
pub fn missing_api_key<F>(provider: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = key_variables(provider)?;
    let present = vars
        .iter()
        .any(|var| lookup(var).is_some_and(|v| !v.trim().is_empty()));
    if present {
        None
    } else {
        Some(format!(
            "Set {} in the environment or pass --api-key.",
            vars.join(" or ")
        ))
    }
}

/// Resolve the chat backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with the configured model.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Default**: `gemini` with `gemini-2.0-flash`.
///
/// The provider's API key is checked before the factory runs so a missing
/// key surfaces as [`ContentGenError::ProviderNotConfigured`].
pub fn resolve_backend(config: &ConversionConfig) -> Result<Arc<dyn ChatBackend>, ContentGenError> {
    resolve_backend_with(config, |var| std::env::var(var).ok())
}

/// [`resolve_backend`] with an injectable environment lookup.
pub fn resolve_backend_with<F>(
    config: &ConversionConfig,
    lookup: F,
) -> Result<Arc<dyn ChatBackend>, ContentGenError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let (provider, model) = provider_and_model(config, &lookup);

    if let Some(hint) = missing_api_key(&provider, &lookup) {
        return Err(ContentGenError::ProviderNotConfigured { provider, hint });
    }

    info!("Using provider '{}' with model '{}'", provider, model);
    let llm = ProviderFactory::create_llm_provider(&provider, &model).map_err(|e| {
        ContentGenError::ProviderNotConfigured {
            provider: provider.clone(),
            hint: format!("{e}"),
        }
    })?;

    Ok(Arc::new(ProviderBackend::new(llm)))
}

fn provider_and_model<F>(config: &ConversionConfig, lookup: &F) -> (String, String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(ref name) = config.provider_name {
        return (name.clone(), config.effective_model().to_string());
    }

    let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
    if let (Some(prov), Some(model)) = (
        non_empty("EDGEQUAKE_LLM_PROVIDER"),
        non_empty("EDGEQUAKE_MODEL"),
    ) {
        let model = config.model.clone().unwrap_or(model);
        return (prov, model);
    }

    (
        DEFAULT_PROVIDER.to_string(),
        config.effective_model().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned results in order, then keeps failing.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, String>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn chat(&self, _p: &Prompt, _o: &SamplingOptions) -> Result<ChatReply, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".into()));
            next.map(|content| ChatReply {
                content,
                prompt_tokens: 10,
                completion_tokens: 5,
            })
        }
    }

    struct Sleeper;

    #[async_trait]
    impl ChatBackend for Sleeper {
        async fn chat(&self, _p: &Prompt, _o: &SamplingOptions) -> Result<ChatReply, String> {
            sleep(Duration::from_secs(3600)).await;
            Ok(ChatReply::default())
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_ms: 1,
            timeout_secs: 5,
        }
    }

    fn opts() -> SamplingOptions {
        SamplingOptions {
            temperature: 0.7,
            max_tokens: 100,
        }
    }

    #[test]
    fn build_options_copies_sampling() {
        let o = build_options(&opts());
        assert_eq!(o.temperature, Some(0.7));
        assert_eq!(o.max_tokens, Some(100));
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy {
            max_retries: 3,
            backoff_ms: 500,
            timeout_secs: 1,
        };
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_millis(1000));
        assert_eq!(p.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn extraction_options_use_low_temperature() {
        let config = ConversionConfig::default();
        assert_eq!(SamplingOptions::extraction(&config).temperature, 0.1);
        assert_eq!(SamplingOptions::creative(&config).temperature, 0.7);
    }

    #[tokio::test]
    async fn run_step_succeeds_after_retries() {
        let backend = Scripted::new(vec![Err("429"), Ok("   "), Ok("done")]);
        let prompt = Prompt::new("sys", "user");
        let step = run_step(&backend, "Writer", &prompt, &opts(), &fast_policy(3))
            .await
            .unwrap();
        assert_eq!(step.output, "done");
        assert_eq!(step.retries, 2);
        assert_eq!(step.input_tokens, 10);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_step_gives_up() {
        let backend = Scripted::new(vec![Err("quota"), Err("quota")]);
        let prompt = Prompt::new("sys", "user");
        let err = run_step(&backend, "Writer", &prompt, &opts(), &fast_policy(1))
            .await
            .unwrap_err();
        match err {
            StepError::Failed { role, retries, detail } => {
                assert_eq!(role, "Writer");
                assert_eq!(retries, 1);
                assert_eq!(detail, "quota");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_step_times_out() {
        let prompt = Prompt::new("sys", "user");
        let policy = RetryPolicy {
            max_retries: 0,
            backoff_ms: 1,
            timeout_secs: 2,
        };
        let err = run_step(&Sleeper, "Analyst", &prompt, &opts(), &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Timeout { secs: 2, .. }));
    }

    #[test]
    fn missing_key_is_reported_with_hint() {
        let hint = missing_api_key("gemini", |_| None).unwrap();
        assert!(hint.contains("GEMINI_API_KEY"));
        assert!(hint.contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn google_key_satisfies_gemini() {
        let env: HashMap<&str, &str> = [("GOOGLE_API_KEY", "abc")].into();
        assert!(missing_api_key("gemini", |k| env.get(k).map(|v| v.to_string())).is_none());
    }

    #[test]
    fn blank_key_counts_as_missing() {
        assert!(missing_api_key("openai", |_| Some("  ".into())).is_some());
    }

    #[test]
    fn local_providers_need_no_key() {
        assert!(missing_api_key("ollama", |_| None).is_none());
        assert!(missing_api_key("lmstudio", |_| None).is_none());
    }

    #[test]
    fn resolve_without_key_is_not_configured() {
        let config = ConversionConfig::default();
        let err = resolve_backend_with(&config, |_| None).err().unwrap();
        match err {
            ContentGenError::ProviderNotConfigured { provider, hint } => {
                assert_eq!(provider, "gemini");
                assert!(hint.contains("GEMINI_API_KEY"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn resolve_honours_env_pair() {
        let env: HashMap<&str, &str> = [
            ("EDGEQUAKE_LLM_PROVIDER", "anthropic"),
            ("EDGEQUAKE_MODEL", "claude-x"),
        ]
        .into();
        let config = ConversionConfig::default();
        let (p, m) = provider_and_model(&config, &|k: &str| env.get(k).map(|v| v.to_string()));
        assert_eq!((p.as_str(), m.as_str()), ("anthropic", "claude-x"));
    }

    #[test]
    fn prebuilt_backend_wins() {
        let config = ConversionConfig::builder()
            .backend(Arc::new(Scripted::new(vec![])))
            .build()
            .unwrap();
        assert!(resolve_backend_with(&config, |_| None).is_ok());
    }
}
