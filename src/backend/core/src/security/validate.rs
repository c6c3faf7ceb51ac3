//! Shallow field-schema validation.
//!
//! A schema maps top-level field names to constraints. Validation produces a
//! list of human-readable error messages; an empty list means valid, and the
//! absence of a schema is always valid. Nested objects are not descended
//! into.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Array => "an array",
            Self::Object => "an object",
        }
    }
}

/// Constraints for one field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(default)]
    pub required: bool,

    #[serde(rename = "type")]
    pub expected: Option<FieldType>,

    pub min_length: Option<usize>,
    pub max_length: Option<usize>,

    /// Regex the string value must match.
    pub pattern: Option<String>,
}

impl FieldSchema {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn typed(mut self, expected: FieldType) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

/// A full validation schema: field name to constraints, in stable order.
pub type ValidationSchema = BTreeMap<String, FieldSchema>;

/// Validate `data` against `schema`, returning error messages.
///
/// Missing and null values only fail the `required` check; the remaining
/// constraints apply when a value is present.
pub fn validate_data(data: &Value, schema: Option<&ValidationSchema>) -> Vec<String> {
    let Some(schema) = schema else {
        return Vec::new();
    };

    let mut errors = Vec::new();
    for (field, rules) in schema {
        let value = data.get(field);
        let present = matches!(value, Some(v) if !v.is_null());

        if rules.required && !present {
            errors.push(format!("{field} is required"));
            continue;
        }
        let Some(value) = value.filter(|v| !v.is_null()) else {
            continue;
        };

        if let Some(expected) = rules.expected {
            if !expected.matches(value) {
                errors.push(format!("{field} must be {}", expected.describe()));
                continue;
            }
        }

        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if let Some(min) = rules.min_length {
                if len < min {
                    errors.push(format!("{field} must be at least {min} characters"));
                }
            }
            if let Some(max) = rules.max_length {
                if len > max {
                    errors.push(format!("{field} must be at most {max} characters"));
                }
            }
            if let Some(pattern) = &rules.pattern {
                match Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(s) {
                            errors.push(format!("{field} has an invalid format"));
                        }
                    }
                    Err(e) => {
                        debug!(field, error = %e, "Invalid schema pattern");
                        errors.push(format!("{field} has an invalid validation pattern"));
                    }
                }
            }
        }
    }
    errors
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
