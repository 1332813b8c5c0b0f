//! Fallback engine backed by `pdf-extract`.
//!
//! Pure Rust, so it works even when the PDFium library cannot be fetched.
//! It has no per-page API; the page count comes from the `lopdf` document
//! that `pdf-extract` re-exports, and defaults to 1 when that load fails.

use super::extract::{PdfBytes, TextEngine};
use crate::error::EngineError;
use crate::output::ExtractionResult;
use tracing::debug;

const ENGINE: &str = "pdf-extract";

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractEngine;

impl TextEngine for PdfExtractEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn extract(&self, pdf: &PdfBytes) -> Result<ExtractionResult, EngineError> {
        let text = pdf_extract::extract_text_from_mem(pdf).map_err(|e| EngineError::Parse {
            engine: ENGINE,
            detail: e.to_string(),
        })?;

        let page_count = match pdf_extract::Document::load_mem(pdf) {
            Ok(doc) => doc.get_pages().len(),
            Err(e) => {
                debug!("{ENGINE}: page count unavailable ({e}); assuming 1");
                1
            }
        };

        Ok(ExtractionResult { text, page_count })
    }
}
