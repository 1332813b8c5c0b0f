//! Error types for the pdf-rulecheck library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`RuleCheckError`]: **Fatal**. The request cannot proceed at all (empty
//!   input, both extraction engines failed, provider not configured).
//!   Returned as `Err(RuleCheckError)` from extraction and input loading.
//!
//! * [`EngineError`]: one text-extraction engine failed. The extractor
//!   swallows the primary engine's error while it tries the fallback, and
//!   only surfaces it when the fallback fails as well.
//!
//! * [`GenerationError`]: one LLM call failed. Never escapes rule evaluation;
//!   it is folded into a failing [`crate::output::RuleVerdict`] so the
//!   remaining rules are unaffected.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-rulecheck library.
#[derive(Debug, Error)]
pub enum RuleCheckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The caller supplied something unusable (empty buffer, bad request).
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Both engines failed. `primary` is the root cause reported to callers.
    #[error("PDF text extraction failed: {primary}")]
    ExtractionFailed {
        #[source]
        primary: EngineError,
        fallback: EngineError,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not persist an uploaded file.
    #[error("Failed to store upload '{path}': {source}")]
    UploadWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RuleCheckError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::InputNotFound { .. }
                | Self::DownloadFailed { .. }
                | Self::DownloadTimeout { .. }
        )
    }
}

/// Failure of a single text-extraction engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine could not be initialised (library missing, bind failed).
    #[error("{engine} unavailable: {detail}")]
    Unavailable { engine: &'static str, detail: String },

    /// The document could not be opened or parsed.
    #[error("{engine} could not parse document: {detail}")]
    Parse { engine: &'static str, detail: String },

    /// Text retrieval failed for one page.
    #[error("{engine} failed on page {page}: {detail}")]
    Page {
        engine: &'static str,
        page: usize,
        detail: String,
    },

    /// The engine panicked or its worker went away.
    #[error("{engine} aborted: {detail}")]
    Panicked { engine: &'static str, detail: String },
}

/// Failure of a single text-generation call.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The call did not finish within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider returned an error (after retries).
    #[error("{0}")]
    Provider(String),

    /// No provider could be resolved at start-up.
    #[error("LLM provider not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn extraction_failed_reports_primary_cause() {
        let e = RuleCheckError::ExtractionFailed {
            primary: EngineError::Parse {
                engine: "pdfium",
                detail: "bad xref".into(),
            },
            fallback: EngineError::Parse {
                engine: "pdf-extract",
                detail: "invalid file header".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("pdfium"), "got: {msg}");
        assert!(msg.contains("bad xref"), "got: {msg}");
        assert!(!msg.contains("invalid file header"), "got: {msg}");
        assert!(e.source().is_some());
    }

    #[test]
    fn input_errors_are_classified() {
        assert!(RuleCheckError::InvalidInput {
            reason: "empty".into()
        }
        .is_input_error());
        assert!(!RuleCheckError::Internal("boom".into()).is_input_error());
    }

    #[test]
    fn timeout_display() {
        let e = GenerationError::Timeout { secs: 60 };
        assert_eq!(e.to_string(), "request timed out after 60s");
    }

    #[test]
    fn page_error_display() {
        let e = EngineError::Page {
            engine: "pdfium",
            page: 3,
            detail: "no text layer".into(),
        };
        assert!(e.to_string().contains("page 3"));
    }
}
