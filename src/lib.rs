//! # pdf-rulecheck
//!
//! Extract the text of a PDF and ask a language model whether it satisfies a
//! list of free-text rules ("The document must state a total amount").
//!
//! ## Why this crate?
//!
//! Checking a contract or an invoice against a checklist is tedious but
//! rarely needs more than the document's text and a careful reader. This
//! crate supplies both halves: robust text extraction with an engine
//! fallback, and one LLM judgement per rule that is normalised into a
//! structured verdict. A flaky model answer costs one failing verdict, never
//! the whole batch.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Extract   PDFium per-page text (spawn_blocking)
//!  │               └─ blank or failed → pdf-extract fallback
//!  ├─ 2. Prompt    rule + first 3500 chars of the document
//!  ├─ 3. Generate  one LLM call per rule (timeout, retry/backoff)
//!  └─ 4. Verdict   first '{' … last '}' → JSON → normalised RuleVerdict
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_rulecheck::{check_document, EvaluatorConfig, RuleEvaluator, TextExtractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let evaluator = RuleEvaluator::connect(EvaluatorConfig::default())?;
//!     let pdf = std::fs::read("invoice.pdf")?;
//!     let report = check_document(
//!         pdf,
//!         &["The document states a total amount"],
//!         &TextExtractor::default(),
//!         &evaluator,
//!     )
//!     .await?;
//!     for v in &report.verdicts {
//!         println!("{} [{}] {}", v.status, v.confidence, v.rule);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum HTTP service ([`server`]) |
//! | `cli`    | on      | The `pdf-rulecheck` binary (clap + anyhow + tracing-subscriber); implies `server` |
//!
//! Disable both when using only the library:
//! ```toml
//! pdf-rulecheck = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analysis;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analysis::{KeywordAnalyzer, TextAnalyzer};
pub use config::{EvaluatorConfig, EvaluatorConfigBuilder, ServerConfig};
pub use error::{EngineError, GenerationError, RuleCheckError};
pub use evaluate::{check_document, RuleEvaluator};
pub use output::{CheckReport, DocumentAnalysis, ExtractionResult, RuleVerdict, VerdictStatus};
pub use pipeline::extract::{PdfBytes, TextEngine, TextExtractor};
pub use pipeline::llm::{LlmGenerator, TextGenerator, UnavailableGenerator};
pub use progress::{EvaluationProgressCallback, NoopProgressCallback, ProgressCallback};
