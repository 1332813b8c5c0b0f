//! Best-effort parsing of raw model output into a [`RuleVerdict`].
//!
//! Models wrap their JSON in prose, code fences or apologies. We take the
//! span from the first `{` to the last `}`, parse it as an untyped
//! [`serde_json::Value`], and normalise every field with a safe default, so
//! a sloppy but recognisable answer still produces a usable verdict.

use crate::output::{RuleVerdict, VerdictStatus};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasoning recorded when the output holds no usable JSON object.
pub const PARSE_FAILURE_REASONING: &str = "Could not parse LLM response";

/// Why a completion could not be read as a verdict.
#[derive(Debug, Error)]
pub enum VerdictParseError {
    #[error("no JSON object delimiters in response")]
    NoObject,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The substring from the first `{` to the last `}` inclusive.
///
/// `None` when either brace is missing or the last `}` precedes the first `{`.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let first = raw.find('{')?;
    let last = raw.rfind('}')?;
    (last > first).then(|| &raw[first..=last])
}

/// Parse and normalise, reporting why parsing failed.
pub fn try_parse_verdict(rule: &str, raw: &str) -> Result<RuleVerdict, VerdictParseError> {
    let json = extract_json_object(raw).ok_or(VerdictParseError::NoObject)?;
    let obj: Map<String, Value> = serde_json::from_str(json)?;
    Ok(normalize(rule, &obj))
}

/// Parse and normalise; any failure becomes the parse-failure verdict.
pub fn parse_verdict(rule: &str, raw: &str) -> RuleVerdict {
    try_parse_verdict(rule, raw).unwrap_or_else(|e| {
        tracing::warn!("Unparseable verdict for rule {rule:?}: {e}");
        RuleVerdict::failed(rule, PARSE_FAILURE_REASONING)
    })
}

fn normalize(rule: &str, obj: &Map<String, Value>) -> RuleVerdict {
    let echoed_rule = match obj.get("rule") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => rule.to_string(),
    };
    let status = match obj.get("status") {
        Some(Value::String(s)) => VerdictStatus::from_label(s),
        _ => VerdictStatus::Fail,
    };

    RuleVerdict {
        rule: echoed_rule,
        status,
        evidence: text_field(obj.get("evidence")),
        reasoning: text_field(obj.get("reasoning")),
        confidence: obj.get("confidence").map(coerce_confidence).unwrap_or(0),
    }
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Number or numeric string, rounded and clamped to 0..=100; otherwise 0.
pub fn coerce_confidence(value: &Value) -> u8 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}
