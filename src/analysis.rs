//! Document analysis shown next to the extracted text.
//!
//! The HTTP layer calls a [`TextAnalyzer`] after every extraction. Analysis
//! is advisory: callers replace any error with
//! [`DocumentAnalysis::unavailable`] rather than failing the request.

use crate::config::DEFAULT_DOCUMENT_CHAR_LIMIT;
use crate::output::DocumentAnalysis;
use async_trait::async_trait;

/// Keywords reported when none are configured.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "total",
    "amount",
    "date",
    "invoice",
    "signature",
    "terms",
    "payment",
];

/// Characters kept in the summary.
const SUMMARY_CHARS: usize = 200;

#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<DocumentAnalysis, String>;
}

/// Deterministic analyzer: a leading-text summary plus keyword hits.
#[derive(Debug, Clone)]
pub struct KeywordAnalyzer {
    keywords: Vec<String>,
    char_limit: usize,
}

impl Default for KeywordAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }
}

impl KeywordAnalyzer {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            char_limit: DEFAULT_DOCUMENT_CHAR_LIMIT,
        }
    }

    /// Text longer than this draws a warning that rules only see a prefix.
    pub fn with_char_limit(mut self, chars: usize) -> Self {
        self.char_limit = chars;
        self
    }

    fn summarize(text: &str) -> String {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut summary: String = normalized.chars().take(SUMMARY_CHARS).collect();
        if normalized.chars().count() > SUMMARY_CHARS {
            summary.push('…');
        }
        summary
    }
}

#[async_trait]
impl TextAnalyzer for KeywordAnalyzer {
    async fn analyze(&self, text: &str) -> Result<DocumentAnalysis, String> {
        let lower = text.to_lowercase();
        let keywords_found = self
            .keywords
            .iter()
            .filter(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
            .cloned()
            .collect();

        let mut warnings = Vec::new();
        if text.trim().is_empty() {
            warnings.push("No extractable text found; the PDF may be scanned images.".to_string());
        }
        let chars = text.chars().count();
        if chars > self.char_limit {
            warnings.push(format!(
                "Document has {chars} characters; rules are checked against the first {}.",
                self.char_limit
            ));
        }

        Ok(DocumentAnalysis {
            summary: Self::summarize(text),
            keywords_found,
            warnings,
        })
    }
}
