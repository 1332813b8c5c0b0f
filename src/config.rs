//! Configuration types for rule evaluation and the HTTP service.
//!
//! Rule evaluation is controlled through [`EvaluatorConfig`], built via its
//! [`EvaluatorConfigBuilder`]. The HTTP layer reads [`ServerConfig`], a plain
//! struct with defaults that match the original deployment (port 4000,
//! uploads under `./uploads`).
//!
//! # Design choice: builder over constructor
//! Callers set only what they care about and rely on the documented defaults
//! for the rest; `build()` is the single place where invariants are checked.

use crate::error::RuleCheckError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default number of document characters sent with each rule.
pub const DEFAULT_DOCUMENT_CHAR_LIMIT: usize = 3500;

/// Configuration for evaluating rules against extracted text.
///
/// # Example
/// ```rust
/// use pdf_rulecheck::EvaluatorConfig;
///
/// let config = EvaluatorConfig::builder()
///     .model("gemini-2.0-flash")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.document_char_limit, 3500);
/// ```
#[derive(Clone)]
pub struct EvaluatorConfig {
    /// LLM model identifier, e.g. "gpt-4.1-mini", "gemini-2.0-flash".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    /// If None along with `provider`, the environment decides.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Verdicts should be repeatable; a low temperature keeps the model close
    /// to the document instead of improvising evidence.
    pub temperature: f32,

    /// Maximum tokens the model may generate per rule. Default: 1024.
    ///
    /// The expected answer is one small JSON object; the headroom covers
    /// models that insist on prose before the object.
    pub max_tokens: usize,

    /// Retry attempts on a transient provider failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 60.
    ///
    /// A timed-out call is a failed call: the rule gets a failing verdict and
    /// evaluation moves on.
    pub api_timeout_secs: u64,

    /// Leading document characters included in every prompt. Default: 3500.
    ///
    /// Counted in Unicode scalar values, not bytes or tokens.
    pub document_char_limit: usize,

    /// Rules evaluated at once. Default: 1 (strictly sequential).
    pub concurrency: usize,

    /// Receives per-rule progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 1024,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            document_char_limit: DEFAULT_DOCUMENT_CHAR_LIMIT,
            concurrency: 1,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EvaluatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("document_char_limit", &self.document_char_limit)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn EvaluationProgressCallback>"),
            )
            .finish()
    }
}

impl EvaluatorConfig {
    /// Create a new builder for `EvaluatorConfig`.
    pub fn builder() -> EvaluatorConfigBuilder {
        EvaluatorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EvaluatorConfig`].
#[derive(Debug)]
pub struct EvaluatorConfigBuilder {
    config: EvaluatorConfig,
}

impl EvaluatorConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
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

    pub fn document_char_limit(mut self, chars: usize) -> Self {
        self.config.document_char_limit = chars;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EvaluatorConfig, RuleCheckError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(RuleCheckError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(RuleCheckError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(RuleCheckError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Settings for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind. Default: `0.0.0.0`.
    pub host: String,
    /// TCP port. Default: 4000.
    pub port: u16,
    /// Directory receiving uploaded PDFs. Created on start-up.
    pub upload_dir: PathBuf,
    /// Document served by `POST /api/check/pdf/sample`.
    pub sample_pdf: PathBuf,
    /// Directory exposed under `/pdfium/standard_fonts`.
    pub fonts_dir: PathBuf,
    /// Request body cap for uploads. Default: 25 MiB.
    pub max_upload_bytes: usize,
    /// Keywords reported by the document analysis.
    pub keywords: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 4000,
            upload_dir: PathBuf::from("uploads"),
            sample_pdf: PathBuf::from("uploads/sample.pdf"),
            fonts_dir: PathBuf::from("assets/standard_fonts"),
            max_upload_bytes: 25 * 1024 * 1024,
            keywords: crate::analysis::DEFAULT_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl ServerConfig {
    /// `host:port` as passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
