//! JSON extraction from raw model text.
//!
//! Models wrap JSON in Markdown fences or add prose around it despite instructions. This is
//! the single place that turns raw text into a JSON object or an explicit fallback reason.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

const FENCE: &str = "```";

/// Outcome of parsing untrusted model output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Map<String, Value>),
    Fallback(MalformedOutput),
}

/// Why model output could not be used. Recovered locally, never surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedOutput {
    pub reason: String,
}

impl MalformedOutput {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Greedy: from the first `{` to the last `}`, across newlines.
fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static JSON object pattern"))
}

/// Strips a leading ``` fence (with or without a language tag) and its matching trailing
/// fence. Text without a leading fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text;
    };

    // Language tag runs to the first newline; single-line fences carry it inline.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    body.trim_end()
        .strip_suffix(FENCE)
        .unwrap_or(body)
        .trim()
}

/// Locates the first `{ ... }` span in the text.
pub fn extract_json_object(text: &str) -> Option<&str> {
    json_object_pattern().find(text).map(|m| m.as_str())
}

/// Fence-strip → locate object → parse. Never fails; bad input becomes `Fallback`.
pub fn parse_model_json(raw: &str) -> ParseOutcome {
    let unfenced = strip_code_fences(raw);
    let Some(candidate) = extract_json_object(unfenced) else {
        return ParseOutcome::Fallback(MalformedOutput::new("no JSON object found in model output"));
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => ParseOutcome::Parsed(map),
        Ok(_) => ParseOutcome::Fallback(MalformedOutput::new("model output is not a JSON object")),
        Err(e) => ParseOutcome::Fallback(MalformedOutput::new(format!(
            "model output is not valid JSON: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_with_language_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_fences_single_line() {
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_unfenced_text_is_returned_trimmed() {
        let input = "  {\"key\": \"value\"}\n";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_unterminated_fence_keeps_body() {
        let input = "```json\n{\"key\": 1}";
        assert_eq!(strip_code_fences(input), "{\"key\": 1}");
    }

    #[test]
    fn test_extracts_object_surrounded_by_prose() {
        let input = "Here is the result:\n{\"score\": 5, \"nested\": {\"a\": 1}}\nHope this helps.";
        assert_eq!(
            extract_json_object(input),
            Some("{\"score\": 5, \"nested\": {\"a\": 1}}")
        );
    }

    #[test]
    fn test_no_json_found() {
        assert_eq!(extract_json_object("not json at all"), None);
        match parse_model_json("not json at all") {
            ParseOutcome::Fallback(m) => assert!(m.reason.contains("no JSON object")),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_fallback() {
        match parse_model_json("{\"score\": 5,,}") {
            ParseOutcome::Fallback(m) => assert!(m.reason.contains("not valid JSON")),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_fenced_prose_wrapped_json_parses() {
        let input = "```json\nSure! {\"overall_score\": 81}\n```";
        match parse_model_json(input) {
            ParseOutcome::Parsed(map) => assert_eq!(map["overall_score"], 81),
            other => panic!("expected parsed object, got {other:?}"),
        }
    }
}
