//! Result types produced by extraction, evaluation and analysis.
//!
//! All of these cross the HTTP boundary, so they serialise with camelCase
//! field names.

use serde::{Deserialize, Serialize};

/// Plain text of a document plus its page count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub text: String,
    pub page_count: usize,
}

impl ExtractionResult {
    pub fn new(text: impl Into<String>, page_count: usize) -> Self {
        Self {
            text: text.into(),
            page_count,
        }
    }

    /// True when the text holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Outcome of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Pass,
    #[default]
    Fail,
}

impl VerdictStatus {
    /// Case-insensitive: `"pass"` is `Pass`, anything else is `Fail`.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("pass") {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised judgement of one rule against a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVerdict {
    pub rule: String,
    pub status: VerdictStatus,
    pub evidence: String,
    pub reasoning: String,
    /// 0..=100.
    pub confidence: u8,
}

impl RuleVerdict {
    /// The verdict recorded whenever a rule cannot be judged.
    pub fn failed(rule: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            status: VerdictStatus::Fail,
            evidence: String::new(),
            reasoning: reasoning.into(),
            confidence: 0,
        }
    }
}

/// Summary produced by a [`crate::analysis::TextAnalyzer`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub summary: String,
    pub keywords_found: Vec<String>,
    pub warnings: Vec<String>,
}

impl DocumentAnalysis {
    /// Placeholder returned when the analyzer fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            summary: "analysis unavailable".into(),
            keywords_found: Vec::new(),
            warnings: vec![reason.into()],
        }
    }
}

/// End-to-end result of extracting a document and judging rules against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub extraction: ExtractionResult,
    pub verdicts: Vec<RuleVerdict>,
}

impl CheckReport {
    pub fn passed(&self) -> usize {
        self.verdicts.iter().filter(|v| v.status.is_pass()).count()
    }
}
