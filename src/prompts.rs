//! Prompt template for rule evaluation.
//!
//! Every prompt the evaluator sends is built here so the wording can change
//! without touching retry or parsing logic, and so tests can inspect the
//! exact text without a live model.

/// Persona and answer contract sent before every rule.
///
/// The JSON shape here is the one [`crate::pipeline::verdict`] normalises.
pub const EVALUATOR_INSTRUCTIONS: &str = r#"You are a precise evaluator. Check the RULE below against the DOCUMENT TEXT and return ONLY a single JSON object (no surrounding text):

{
"rule": "<the same rule string>",
"status": "pass" or "fail",
"evidence": "<one short sentence from the document that proves the decision, or empty string>",
"reasoning": "<one-line reasoning>",
"confidence": <integer 0-100>
}"#;

/// Build the prompt for one rule.
///
/// `excerpt` must already be truncated; the header states the configured
/// limit so the model knows it may be looking at a partial document.
pub fn rule_prompt(rule: &str, excerpt: &str, char_limit: usize) -> String {
    format!(
        "{EVALUATOR_INSTRUCTIONS}\n\nRULE:\n{rule}\n\nDOCUMENT (first {char_limit} chars):\n{excerpt}\n"
    )
}

/// The first `limit` Unicode scalar values of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
