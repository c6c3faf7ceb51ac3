//! Input sanitization applied before writes.
//!
//! Escapes the HTML-sensitive characters `<`, `>`, `"`, `'`, and `/` in
//! every string leaf and object key, and drops keys starting with `__` or
//! `$` to block prototype- and operator-injection shaped payloads. Reads are
//! not sanitized.

use serde_json::{Map, Value};

const ESCAPES: &[(char, &str)] = &[
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#x27;"),
    ('/', "&#x2F;"),
];

/// Escape the five HTML-sensitive characters in a string.
pub fn escape_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match ESCAPES.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

/// Whether an object key is dropped entirely.
fn is_forbidden_key(key: &str) -> bool {
    key.starts_with("__") || key.starts_with('$')
}

/// Recursively sanitize a JSON-like value.
///
/// String leaves and object keys are escaped; keys starting with `__` or `$`
/// are removed along with their values. Numbers, booleans, and nulls pass
/// through untouched.
pub fn sanitize_input(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_str(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_input).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                if is_forbidden_key(key) {
                    continue;
                }
                out.insert(escape_str(key), sanitize_input(item));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
