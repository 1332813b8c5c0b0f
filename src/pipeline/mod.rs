//! Pipeline stages for checking rules against a PDF.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and backends can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──────────────────▶ llm ──▶ verdict
//! (path/URL) (pdfium → pdf-extract)     (LLM)   (JSON → RuleVerdict)
//! ```
//!
//! 1. [`input`]: load a local path or URL into memory (CLI only; the
//!    server receives bytes directly)
//! 2. [`extract`]: the primary/fallback policy; engines live in
//!    [`pdfium`] and [`fallback`] and run in `spawn_blocking`
//! 3. [`llm`]: one completion per rule with timeout and retry/backoff;
//!    the only stage with network I/O
//! 4. [`verdict`]: pull the JSON object out of free text and normalise it

pub mod extract;
pub mod fallback;
pub mod input;
pub mod llm;
pub mod pdfium;
pub mod verdict;
