//! Agent output sanitizing.
//!
//! The agent does not guarantee clean JSON: bodies arrive as plain JSON, as a
//! JSON string wrapping markdown, or as prose around a fenced block or bare object.
//! [`parse_agent_output`] strips the known wrappers and returns the structured
//! value, or a [`ParseError`] that never leaks a raw serde error.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ParseError;

fn fenced_block() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").expect("fence pattern is valid")
    })
}

pub fn parse_agent_output(raw: &str) -> Result<Value, ParseError> {
    parse_with_unwrap(raw, true)
}

fn parse_with_unwrap(raw: &str, allow_unwrap: bool) -> Result<Value, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new("agent output is empty", raw));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Object(_) | Value::Array(_) => Ok(value),
            Value::String(inner) if allow_unwrap => parse_with_unwrap(&inner, false),
            _ => Err(ParseError::new(
                "agent output is not a JSON object or array",
                trimmed,
            )),
        };
    }

    let mut first_error = None;
    for captures in fenced_block().captures_iter(trimmed) {
        let Some(inner) = captures.get(1) else {
            continue;
        };
        match structured(inner.as_str()) {
            Ok(value) => return Ok(value),
            Err(error) if first_error.is_none() => first_error = Some(error),
            Err(_) => {}
        }
    }

    if let Some(value) = first_embedded_value(trimmed) {
        return Ok(value);
    }

    Err(first_error
        .unwrap_or_else(|| ParseError::new("no JSON content found in agent output", trimmed)))
}

fn structured(candidate: &str) -> Result<Value, ParseError> {
    let candidate = candidate.trim();
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
        Ok(_) => Err(ParseError::new(
            "agent output is not a JSON object or array",
            candidate,
        )),
        Err(error) => Err(ParseError::new(
            format!("invalid JSON at line {} column {}", error.line(), error.column()),
            candidate,
        )),
    }
}

/// First object or array that parses from an opening brace or bracket,
/// ignoring whatever text follows it.
fn first_embedded_value(text: &str) -> Option<Value> {
    text.match_indices(['{', '['])
        .find_map(|(start, _)| {
            serde_json::Deserializer::from_str(&text[start..])
                .into_iter::<Value>()
                .next()
                .and_then(Result::ok)
        })
}
