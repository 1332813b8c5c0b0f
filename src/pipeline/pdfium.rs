//! Primary engine: per-page text retrieval through PDFium.
//!
//! ## Process-wide engine thread
//!
//! Binding PDFium means locating (and possibly downloading) a shared library,
//! so it happens once per process. The first extraction starts a dedicated
//! `pdfium-engine` thread that owns the [`Pdfium`] bindings for the life of
//! the process and serves jobs from a channel. Concurrent first callers
//! block on the [`OnceCell`] initializer; a failed start-up is not cached,
//! so a later call tries again (e.g. after the network comes back).
//!
//! Pages are visited in order. Text segments within a page are joined with
//! single spaces and every page, empty or not, contributes a trailing `\n`.

use super::extract::{PdfBytes, TextEngine};
use crate::error::EngineError;
use crate::output::ExtractionResult;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use tracing::{debug, info, warn};

const ENGINE: &str = "pdfium";

type Reply = mpsc::Sender<Result<ExtractionResult, EngineError>>;

struct Job {
    pdf: PdfBytes,
    reply: Reply,
}

/// Handle to the engine thread.
struct PdfiumEngine {
    jobs: mpsc::Sender<Job>,
}

static ENGINE_HANDLE: OnceCell<PdfiumEngine> = OnceCell::new();

impl PdfiumEngine {
    fn global() -> Result<&'static Self, EngineError> {
        ENGINE_HANDLE.get_or_try_init(Self::start)
    }

    fn start() -> Result<Self, EngineError> {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), EngineError>>();

        std::thread::Builder::new()
            .name("pdfium-engine".into())
            .spawn(move || {
                let pdfium = match bind_pdfium() {
                    Ok(pdfium) => {
                        let _ = ready_tx.send(Ok(()));
                        pdfium
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                for job in jobs_rx {
                    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                        extract_with(&pdfium, &job.pdf)
                    }))
                    .unwrap_or_else(|_| {
                        Err(EngineError::Panicked {
                            engine: ENGINE,
                            detail: "PDFium panicked while reading the document".into(),
                        })
                    });
                    let _ = job.reply.send(result);
                }
            })
            .map_err(|e| EngineError::Unavailable {
                engine: ENGINE,
                detail: format!("cannot spawn engine thread: {e}"),
            })?;

        ready_rx.recv().map_err(|_| EngineError::Unavailable {
            engine: ENGINE,
            detail: "engine thread exited during start-up".into(),
        })??;

        info!("PDFium engine ready");
        Ok(Self { jobs: jobs_tx })
    }

    fn submit(&self, pdf: PdfBytes) -> Result<ExtractionResult, EngineError> {
        let gone = || EngineError::Panicked {
            engine: ENGINE,
            detail: "engine thread is gone".into(),
        };
        let (reply_tx, reply_rx) = mpsc::channel();
        self.jobs
            .send(Job {
                pdf,
                reply: reply_tx,
            })
            .map_err(|_| gone())?;
        reply_rx.recv().map_err(|_| gone())?
    }
}

/// Fetched library first, then whatever the system loader can find.
fn bind_pdfium() -> Result<Pdfium, EngineError> {
    let fetched = pdfium_fetch::ensure_library(None).and_then(|path| {
        debug!("Binding PDFium from {}", path.display());
        pdfium_fetch::bind(&path)
    });

    match fetched {
        Ok(pdfium) => Ok(pdfium),
        Err(e) => {
            warn!("{e}; trying the system PDFium library");
            Pdfium::bind_to_system_library()
                .map(Pdfium::new)
                .map_err(|sys| EngineError::Unavailable {
                    engine: ENGINE,
                    detail: format!("{e}; system library: {sys:?}"),
                })
        }
    }
}

fn extract_with(pdfium: &Pdfium, pdf: &[u8]) -> Result<ExtractionResult, EngineError> {
    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| EngineError::Parse {
            engine: ENGINE,
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    let mut text = String::new();

    for (idx, page) in pages.iter().enumerate() {
        let page_text = page.text().map_err(|e| EngineError::Page {
            engine: ENGINE,
            page: idx + 1,
            detail: format!("{e:?}"),
        })?;
        push_page(
            &mut text,
            page_text.segments().iter().map(|segment| segment.text()),
        );
    }

    debug!("PDFium read {page_count} pages");
    Ok(ExtractionResult { text, page_count })
}

/// Append one page: segments joined by single spaces, then `\n`.
fn push_page(text: &mut String, segments: impl IntoIterator<Item = String>) {
    for (i, segment) in segments.into_iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(&segment);
    }
    text.push('\n');
}

/// [`TextEngine`] front for the shared PDFium thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumTextEngine;

impl TextEngine for PdfiumTextEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn extract(&self, pdf: &PdfBytes) -> Result<ExtractionResult, EngineError> {
        PdfiumEngine::global()?.submit(pdf.clone())
    }
}

/// Start the engine ahead of the first request.
///
/// Returns an error instead of logging it so callers can decide how loud a
/// missing PDFium should be; extraction still works through the fallback.
pub fn warm_up() -> Result<(), EngineError> {
    PdfiumEngine::global().map(|_| ())
}
