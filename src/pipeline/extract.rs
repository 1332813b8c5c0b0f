//! Two-stage text extraction: primary engine, then fallback.
//!
//! ## Policy
//!
//! 1. Run the primary engine (PDFium).
//! 2. If it succeeded with non-blank text, that result is final.
//! 3. Otherwise run the fallback engine (pdf-extract).
//!    * Fallback succeeded: its result is final.
//!    * Fallback failed after a blank primary result: the blank primary
//!      result is returned; a document without a text layer is not an error.
//!    * Fallback failed after a primary failure: extraction fails with the
//!      *primary* error as the reported cause.
//!
//! ## Why spawn_blocking?
//!
//! Both engines are synchronous and CPU-bound. Each runs on Tokio's blocking
//! pool so extraction never stalls the async workers, and a panic inside an
//! engine surfaces as a [`JoinError`](tokio::task::JoinError) that we turn
//! into that engine's [`EngineError::Panicked`].

use super::fallback::PdfExtractEngine;
use super::pdfium::PdfiumTextEngine;
use crate::error::{EngineError, RuleCheckError};
use crate::output::ExtractionResult;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ── Input bytes ──────────────────────────────────────────────────────────

/// Shared, immutable PDF bytes.
///
/// Accepts `Vec<u8>`, `&[u8]`, `Box<[u8]>` and `Arc<[u8]>`; any other type is
/// a compile-time error. Cloning is an `Arc` bump, so both engines can hold
/// the same buffer without copying it.
#[derive(Debug, Clone)]
pub struct PdfBytes(Arc<[u8]>);

impl From<Vec<u8>> for PdfBytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v.into())
    }
}

impl From<&[u8]> for PdfBytes {
    fn from(v: &[u8]) -> Self {
        Self(v.into())
    }
}

impl From<Box<[u8]>> for PdfBytes {
    fn from(v: Box<[u8]>) -> Self {
        Self(v.into())
    }
}

impl From<Arc<[u8]>> for PdfBytes {
    fn from(v: Arc<[u8]>) -> Self {
        Self(v)
    }
}

impl Deref for PdfBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

// ── Engines ──────────────────────────────────────────────────────────────

/// A synchronous text-extraction backend.
pub trait TextEngine: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Extract the text and page count of `pdf`.
    fn extract(&self, pdf: &PdfBytes) -> Result<ExtractionResult, EngineError>;
}

/// PDF-to-text with a primary engine and a fallback engine.
#[derive(Clone)]
pub struct TextExtractor {
    primary: Arc<dyn TextEngine>,
    fallback: Arc<dyn TextEngine>,
}

impl Default for TextExtractor {
    /// PDFium first, pdf-extract as fallback.
    fn default() -> Self {
        Self::with_engines(Arc::new(PdfiumTextEngine), Arc::new(PdfExtractEngine))
    }
}

impl std::fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextExtractor")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl TextExtractor {
    pub fn with_engines(primary: Arc<dyn TextEngine>, fallback: Arc<dyn TextEngine>) -> Self {
        Self { primary, fallback }
    }

    /// Extract plain text and the page count from a PDF.
    ///
    /// Fails only when the buffer is empty or both engines fail.
    pub async fn extract(
        &self,
        pdf: impl Into<PdfBytes>,
    ) -> Result<ExtractionResult, RuleCheckError> {
        let pdf = pdf.into();
        if pdf.is_empty() {
            return Err(RuleCheckError::InvalidInput {
                reason: "PDF buffer is empty".into(),
            });
        }

        let primary_outcome = match run_engine(&self.primary, &pdf).await {
            Ok(result) if !result.is_blank() => {
                info!(
                    "{}: extracted {} chars from {} pages",
                    self.primary.name(),
                    result.text.len(),
                    result.page_count
                );
                return Ok(result);
            }
            Ok(blank) => {
                debug!(
                    "{} returned no text; trying {}",
                    self.primary.name(),
                    self.fallback.name()
                );
                Ok(blank)
            }
            Err(e) => {
                warn!("{} failed: {e}; trying {}", self.primary.name(), self.fallback.name());
                Err(e)
            }
        };

        match (primary_outcome, run_engine(&self.fallback, &pdf).await) {
            (_, Ok(result)) => {
                info!(
                    "{}: extracted {} chars from {} pages",
                    self.fallback.name(),
                    result.text.len(),
                    result.page_count
                );
                Ok(result)
            }
            (Ok(blank), Err(e)) => {
                warn!("{} failed: {e}; keeping empty primary result", self.fallback.name());
                Ok(blank)
            }
            (Err(primary), Err(fallback)) => {
                warn!("{} failed as well: {fallback}", self.fallback.name());
                Err(RuleCheckError::ExtractionFailed { primary, fallback })
            }
        }
    }
}

async fn run_engine(
    engine: &Arc<dyn TextEngine>,
    pdf: &PdfBytes,
) -> Result<ExtractionResult, EngineError> {
    let name = engine.name();
    let engine = Arc::clone(engine);
    let pdf = pdf.clone();

    tokio::task::spawn_blocking(move || engine.extract(&pdf))
        .await
        .map_err(|e| EngineError::Panicked {
            engine: name,
            detail: join_error_detail(e),
        })?
}

fn join_error_detail(e: tokio::task::JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "engine panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        result: Result<ExtractionResult, EngineError>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(text: &str, pages: usize) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(ExtractionResult::new(text, pages)),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(detail: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Err(EngineError::Parse {
                    engine: "fixed",
                    detail: detail.into(),
                }),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl TextEngine for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn extract(&self, _pdf: &PdfBytes) -> Result<ExtractionResult, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct Panics;

    impl TextEngine for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        fn extract(&self, _pdf: &PdfBytes) -> Result<ExtractionResult, EngineError> {
            panic!("corrupt xref");
        }
    }

    #[test]
    fn pdf_bytes_from_supported_types() {
        let a = PdfBytes::from(vec![1u8, 2]);
        let b = PdfBytes::from(&[1u8, 2][..]);
        let c = PdfBytes::from(vec![1u8, 2].into_boxed_slice());
        let d = PdfBytes::from(Arc::<[u8]>::from(vec![1u8, 2]));
        for bytes in [a, b, c, d] {
            assert_eq!(&*bytes, &[1, 2]);
        }
    }

    #[tokio::test]
    async fn empty_buffer_never_reaches_engines() {
        let primary = Fixed::ok("text", 1);
        let fallback = Fixed::ok("text", 1);
        let extractor = TextExtractor::with_engines(primary.clone(), fallback.clone());

        let err = extractor.extract(Vec::new()).await.unwrap_err();
        assert!(matches!(err, RuleCheckError::InvalidInput { .. }));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_primary_kept_when_fallback_fails() {
        let extractor = TextExtractor::with_engines(Fixed::ok(" \n", 2), Fixed::err("nope"));
        let result = extractor.extract(&b"%PDF"[..]).await.unwrap();
        assert_eq!(result, ExtractionResult::new(" \n", 2));
    }

    #[tokio::test]
    async fn panicking_primary_is_an_engine_error() {
        let fallback = Fixed::ok("recovered", 1);
        let extractor = TextExtractor::with_engines(Arc::new(Panics), fallback.clone());
        let result = extractor.extract(&b"%PDF"[..]).await.unwrap();
        assert_eq!(result.text, "recovered");
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panic_detail_is_reported() {
        let extractor = TextExtractor::with_engines(Arc::new(Panics), Fixed::err("also broken"));
        let err = extractor.extract(&b"%PDF"[..]).await.unwrap_err();
        match err {
            RuleCheckError::ExtractionFailed { primary, .. } => {
                assert!(matches!(primary, EngineError::Panicked { engine: "panics", .. }));
                assert!(primary.to_string().contains("corrupt xref"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
