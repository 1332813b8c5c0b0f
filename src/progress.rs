//! Progress-callback trait for per-rule evaluation events.
//!
//! Inject an [`Arc<dyn EvaluationProgressCallback>`] via
//! [`crate::config::EvaluatorConfigBuilder::progress_callback`] to receive
//! events as the evaluator works through a rule list.
//!
//! # Why callbacks instead of channels?
//!
//! Callers can forward events to a terminal progress bar, a log line or a
//! channel of their own without the library knowing how the host
//! application communicates. The trait is `Send + Sync` because rules may be
//! evaluated concurrently when `concurrency > 1`.
//!
//! # Example
//!
//! ```rust
//! use pdf_rulecheck::{EvaluationProgressCallback, EvaluatorConfig, RuleVerdict};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PassCounter {
//!     passed: AtomicUsize,
//! }
//!
//! impl EvaluationProgressCallback for PassCounter {
//!     fn on_rule_complete(&self, _index: usize, _total: usize, verdict: &RuleVerdict) {
//!         if verdict.status.is_pass() {
//!             self.passed.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(PassCounter { passed: AtomicUsize::new(0) });
//! let config = EvaluatorConfig::builder()
//!     .progress_callback(counter as Arc<dyn EvaluationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::RuleVerdict;
use std::sync::Arc;

/// Called by the rule evaluator as it processes each rule.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Rule indices are 0-based positions in the input.
///
/// # Thread safety
///
/// With `concurrency > 1`, `on_rule_start`, `on_rule_complete` and
/// `on_rule_error` may interleave across rules. Implementations must protect
/// shared mutable state (`Mutex`, atomics).
pub trait EvaluationProgressCallback: Send + Sync {
    /// Called once before the first rule.
    fn on_batch_start(&self, total_rules: usize) {
        let _ = total_rules;
    }

    /// Called just before the prompt for a rule is sent.
    fn on_rule_start(&self, index: usize, total_rules: usize, rule: &str) {
        let _ = (index, total_rules, rule);
    }

    /// Called when a rule has a verdict, including parse-failure verdicts.
    fn on_rule_complete(&self, index: usize, total_rules: usize, verdict: &RuleVerdict) {
        let _ = (index, total_rules, verdict);
    }

    /// Called when the generation call for a rule failed.
    ///
    /// `on_rule_complete` still follows with the failing verdict.
    fn on_rule_error(&self, index: usize, total_rules: usize, error: &str) {
        let _ = (index, total_rules, error);
    }

    /// Called once after every rule has a verdict.
    fn on_batch_complete(&self, total_rules: usize, passed: usize) {
        let _ = (total_rules, passed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl EvaluationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::EvaluatorConfig`].
pub type ProgressCallback = Arc<dyn EvaluationProgressCallback>;
