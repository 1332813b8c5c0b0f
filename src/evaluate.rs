//! Rule evaluation and the end-to-end check.
//!
//! [`RuleEvaluator::evaluate`] never fails: a generation error or an
//! unreadable answer for one rule becomes a failing verdict for that rule
//! only, and the output always has one verdict per rule in input order.
//!
//! Rules run one at a time by default. With `concurrency > 1` they go
//! through [`StreamExt::buffered`], which overlaps the calls but still
//! yields results in input order.

use crate::config::EvaluatorConfig;
use crate::error::RuleCheckError;
use crate::output::{CheckReport, RuleVerdict};
use crate::pipeline::extract::{PdfBytes, TextExtractor};
use crate::pipeline::llm::{LlmGenerator, TextGenerator, UnavailableGenerator};
use crate::pipeline::verdict::parse_verdict;
use crate::prompts::{rule_prompt, truncate_chars};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Judges rules against document text through a [`TextGenerator`].
#[derive(Clone)]
pub struct RuleEvaluator {
    generator: Arc<dyn TextGenerator>,
    config: EvaluatorConfig,
}

impl std::fmt::Debug for RuleEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEvaluator")
            .field("generator", &"<dyn TextGenerator>")
            .field("config", &self.config)
            .finish()
    }
}

impl RuleEvaluator {
    pub fn new(generator: Arc<dyn TextGenerator>, config: EvaluatorConfig) -> Self {
        Self { generator, config }
    }

    /// Resolve an LLM provider from `config` and the environment.
    pub fn connect(config: EvaluatorConfig) -> Result<Self, RuleCheckError> {
        let generator = LlmGenerator::from_config(&config)?;
        Ok(Self::new(Arc::new(generator), config))
    }

    /// Like [`connect`](Self::connect), but an unresolvable provider yields
    /// an evaluator whose every verdict explains the configuration problem.
    pub fn connect_or_degrade(config: EvaluatorConfig) -> Self {
        match LlmGenerator::from_config(&config) {
            Ok(generator) => Self::new(Arc::new(generator), config),
            Err(e) => {
                warn!("Rule evaluation disabled: {e}");
                Self::new(Arc::new(UnavailableGenerator::new(e.to_string())), config)
            }
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// One verdict per rule, same order as `rules`.
    pub async fn evaluate<S: AsRef<str> + Sync>(
        &self,
        rules: &[S],
        document_text: &str,
    ) -> Vec<RuleVerdict> {
        let total = rules.len();
        let limit = self.config.document_char_limit;
        let excerpt = truncate_chars(document_text, limit);
        let callback = self.config.progress_callback.as_ref();

        info!(
            "Evaluating {} rules against {} document chars",
            total,
            excerpt.chars().count()
        );
        if let Some(cb) = callback {
            cb.on_batch_start(total);
        }

        let verdicts: Vec<RuleVerdict> = if self.config.concurrency <= 1 {
            let mut out = Vec::with_capacity(total);
            for (index, rule) in rules.iter().enumerate() {
                out.push(self.evaluate_one(index, total, rule.as_ref(), excerpt).await);
            }
            out
        } else {
            // Collected up front so the returned future stays `Send`.
            let pending: Vec<_> = rules
                .iter()
                .enumerate()
                .map(|(index, rule)| self.evaluate_one(index, total, rule.as_ref(), excerpt))
                .collect();
            stream::iter(pending)
                .buffered(self.config.concurrency)
                .collect()
                .await
        };

        let passed = verdicts.iter().filter(|v| v.status.is_pass()).count();
        info!("{passed}/{total} rules passed");
        if let Some(cb) = callback {
            cb.on_batch_complete(total, passed);
        }
        verdicts
    }

    async fn evaluate_one(
        &self,
        index: usize,
        total: usize,
        rule: &str,
        excerpt: &str,
    ) -> RuleVerdict {
        let callback = self.config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_rule_start(index, total, rule);
        }

        let prompt = rule_prompt(rule, excerpt, self.config.document_char_limit);
        let verdict = match self.generator.generate(&prompt).await {
            Ok(raw) => {
                debug!("Rule {}: {} chars of model output", index + 1, raw.len());
                parse_verdict(rule, &raw)
            }
            Err(e) => {
                warn!("Rule {}: LLM call failed: {e}", index + 1);
                if let Some(cb) = callback {
                    cb.on_rule_error(index, total, &e.to_string());
                }
                RuleVerdict::failed(rule, format!("LLM call failed: {e}"))
            }
        };

        if let Some(cb) = callback {
            cb.on_rule_complete(index, total, &verdict);
        }
        verdict
    }
}

/// Extract `pdf`, then judge `rules` against its text.
pub async fn check_document<S: AsRef<str> + Sync>(
    pdf: impl Into<PdfBytes>,
    rules: &[S],
    extractor: &TextExtractor,
    evaluator: &RuleEvaluator,
) -> Result<CheckReport, RuleCheckError> {
    let extraction = extractor.extract(pdf).await?;
    let verdicts = evaluator.evaluate(rules, &extraction.text).await;
    Ok(CheckReport {
        extraction,
        verdicts,
    })
}
