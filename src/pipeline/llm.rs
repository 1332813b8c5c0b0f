//! Text generation: send one prompt, get one completion.
//!
//! [`TextGenerator`] is the seam between rule evaluation and the outside
//! world. Production code uses [`LlmGenerator`], which drives any
//! `edgequake_llm` provider; tests plug in a stub. All prompt wording lives
//! in [`crate::prompts`] so it can change without touching retry or timeout
//! logic here.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^attempt`) with the defaults (500 ms base, 2
//! retries) waits 500 ms → 1 s before giving up on a rule. Each attempt is
//! bounded by `api_timeout_secs`; a timed-out attempt is retried like any
//! other failure.

use crate::config::EvaluatorConfig;
use crate::error::{GenerationError, RuleCheckError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Model used with `GEMINI_API_KEY` when `GEMINI_MODEL` is unset.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Anything that turns a prompt into raw completion text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

// ── LLM provider adapter ─────────────────────────────────────────────────

/// [`TextGenerator`] over an `edgequake_llm` provider, with timeout and retry.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &EvaluatorConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    /// Resolve a provider from `config` and the environment.
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, RuleCheckError> {
        let provider = resolve_provider(config)?;
        info!(
            "LLM provider resolved (model: {})",
            config.model.as_deref().unwrap_or("provider default")
        );
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];
        let limit = Duration::from_secs(self.api_timeout_secs);

        let mut last_err = GenerationError::Provider("no attempt made".into());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "LLM retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(limit, self.provider.chat(&messages, Some(&self.options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "{} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    warn!("LLM attempt {} failed: {}", attempt + 1, e);
                    last_err = GenerationError::Provider(e.to_string());
                }
                Err(_) => {
                    warn!(
                        "LLM attempt {} timed out after {}s",
                        attempt + 1,
                        self.api_timeout_secs
                    );
                    last_err = GenerationError::Timeout {
                        secs: self.api_timeout_secs,
                    };
                }
            }
        }

        Err(last_err)
    }
}

/// Build `CompletionOptions` from the evaluator config.
fn build_options(config: &EvaluatorConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

// ── Unconfigured stand-in ────────────────────────────────────────────────

/// Used when no provider could be resolved: every call fails with the
/// configuration problem, which then shows up in each verdict's reasoning.
#[derive(Debug, Clone)]
pub struct UnavailableGenerator {
    reason: String,
}

impl UnavailableGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured(self.reason.clone()))
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, RuleCheckError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        RuleCheckError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **Gemini** when `GEMINI_API_KEY` is set, with `GEMINI_MODEL` or
///    [`DEFAULT_GEMINI_MODEL`].
/// 5. **Auto-detection** through [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &EvaluatorConfig) -> Result<Arc<dyn LLMProvider>, RuleCheckError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let fallback_model = if name.eq_ignore_ascii_case("gemini") {
            DEFAULT_GEMINI_MODEL
        } else {
            "gpt-4.1-nano"
        };
        let model = config.model.as_deref().unwrap_or(fallback_model);
        return create_provider(name, model);
    }

    if let (Some(prov), Some(model)) = (
        non_empty_env("EDGEQUAKE_LLM_PROVIDER"),
        non_empty_env("EDGEQUAKE_MODEL"),
    ) {
        return create_provider(&prov, &model);
    }

    if non_empty_env("GEMINI_API_KEY").is_some() {
        let model = config
            .model
            .clone()
            .or_else(|| non_empty_env("GEMINI_MODEL"))
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        return create_provider("gemini", &model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| RuleCheckError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
