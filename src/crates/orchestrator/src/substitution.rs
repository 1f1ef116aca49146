//! Placeholder substitution over node inputs.
//!
//! A node's `config.input` may reference upstream results with
//! `{<node_id>.result}` or `{<node_id>.result.<key>...}` tokens. The
//! substitution is a typed walk over the input tree:
//!
//! - a string leaf that is *exactly* one placeholder is replaced with the
//!   referenced value, preserving its type (object, array, number, ...);
//! - a placeholder embedded in a larger string splices in string values
//!   only; a non-string reference there fails the node;
//! - references to unknown or not-yet-completed nodes are left in place;
//! - the walk is a single pass: substituted values are never re-expanded.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

static FULL_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)\.result((?:\.[A-Za-z_][A-Za-z0-9_]*)*)\}$").unwrap()
});

static EMBEDDED_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\.result((?:\.[A-Za-z_][A-Za-z0-9_]*)*)\}").unwrap()
});

/// Substitution failure: the offending placeholder is carried in the
/// error and recorded on the node.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubstitutionError {
    /// An embedded reference resolved to a non-string value.
    #[error("Cannot embed non-string value for placeholder {0}")]
    NonStringEmbedded(String),
}

/// Resolve a `(node_id, dotted path)` reference against the completed
/// results. `None` leaves the placeholder in place.
fn resolve(results: &HashMap<String, Value>, node_id: &str, path: &str) -> Option<Value> {
    let mut value = results.get(node_id)?;
    for key in path.split('.').filter(|k| !k.is_empty()) {
        value = value.as_object()?.get(key)?;
    }
    Some(value.clone())
}

/// Substitute placeholders in `input` against `results` (the map of
/// completed node id to non-null result). Deterministic: the same inputs
/// produce byte-identical output.
pub fn substitute_placeholders(
    input: &Value,
    results: &HashMap<String, Value>,
) -> Result<Value, SubstitutionError> {
    match input {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), substitute_placeholders(value, results)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(substitute_placeholders(item, results)?);
            }
            Ok(Value::Array(out))
        }
        Value::String(text) => substitute_string(text, results),
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    text: &str,
    results: &HashMap<String, Value>,
) -> Result<Value, SubstitutionError> {
    // Whole-string reference: typed reinsertion.
    if let Some(captures) = FULL_PLACEHOLDER.captures(text) {
        let node_id = &captures[1];
        let path = &captures[2];
        return Ok(match resolve(results, node_id, path) {
            Some(value) => value,
            None => Value::String(text.to_string()),
        });
    }

    if !EMBEDDED_PLACEHOLDER.is_match(text) {
        return Ok(Value::String(text.to_string()));
    }

    // Embedded references: string splicing only.
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    for captures in EMBEDDED_PLACEHOLDER.captures_iter(text) {
        let whole = captures.get(0).expect("capture 0 always present");
        out.push_str(&text[last_end..whole.start()]);

        match resolve(results, &captures[1], &captures[2]) {
            Some(Value::String(s)) => out.push_str(&s),
            Some(_) => {
                return Err(SubstitutionError::NonStringEmbedded(
                    whole.as_str().to_string(),
                ))
            }
            None => out.push_str(whole.as_str()),
        }
        last_end = whole.end();
    }
    out.push_str(&text[last_end..]);
    Ok(Value::String(out))
}
