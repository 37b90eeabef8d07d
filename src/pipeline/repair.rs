//! Recovering a JSON object from a model completion.
//!
//! Models are asked for "valid JSON only" but regularly wrap the object in
//! prose or a ```json fence. Two attempts are made, in order:
//!
//! 1. parse the whole completion as a JSON object;
//! 2. parse the widest `{ … }` span: first `{` to last `}`.
//!
//! Nothing else is attempted: no fence stripping, no trailing-comma fixes.
//! A reply that is valid JSON but not an object (`[…]`, `"…"`, `42`) is not a
//! record and falls through to step 2.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// First `{` to last `}`, across newlines.
static RE_BRACE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Which attempt produced the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The completion was a JSON object as-is.
    Direct,
    /// The object was cut out of surrounding text.
    BraceSpan,
}

/// Parse a completion into a JSON object, or `None` if neither attempt works.
pub fn parse_completion(raw: &str) -> Option<(Map<String, Value>, Recovery)> {
    if let Some(map) = parse_object(raw) {
        return Some((map, Recovery::Direct));
    }
    widest_brace_span(raw)
        .and_then(parse_object)
        .map(|map| (map, Recovery::BraceSpan))
}

/// The substring from the first `{` to the last `}` inclusive.
pub fn widest_brace_span(raw: &str) -> Option<&str> {
    RE_BRACE_SPAN.find(raw).map(|m| m.as_str())
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
