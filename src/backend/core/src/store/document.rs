//! Document representation for the store seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, ErrorCode, Result};

/// A document held in a named collection.
///
/// Fields are a flat JSON object. Optional values are kept as explicit JSON
/// `null` so that document shapes stay stable across partial writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Collection the document belongs to.
    pub collection: String,

    /// Document identifier, unique within the collection.
    pub id: String,

    /// Document payload.
    pub fields: Map<String, Value>,

    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Build a document from a JSON value, which must be an object.
    ///
    /// Missing optional values should already be `null` in the input; this
    /// constructor additionally coerces any `fields` the caller explicitly
    /// set to an absent marker (an empty object is allowed).
    pub fn from_value(collection: &str, id: &str, value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
                updated_at: Utc::now(),
            }),
            other => Err(CoreError::with_internal(
                ErrorCode::InvalidInput,
                "Document data must be a JSON object",
                format!("got {}", json_type_name(&other)),
            )),
        }
    }

    /// Serialize a typed value into a document.
    pub fn from_serializable<T: Serialize>(collection: &str, id: &str, data: &T) -> Result<Self> {
        let value = serde_json::to_value(data)?;
        Self::from_value(collection, id, value)
    }

    /// Read a field, `None` when absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Read a string field; absent and non-string both yield `None`.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// The payload as a JSON value (object).
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Deserialize the payload into a typed value.
    pub fn deserialize<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_value())?)
    }

    /// Merge `patch` into the payload, overwriting existing fields. `None`
    /// values arriving from typed models land as explicit nulls.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (k, v) in patch {
            self.fields.insert(k, v);
        }
        self.updated_at = Utc::now();
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_object() {
        let doc = Document::from_value("dues", "d1", json!({"amount": 10.0, "note": null}));
        assert!(doc.is_ok());

        let err = Document::from_value("dues", "d1", json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn test_field_accessors() {
        let doc =
            Document::from_value("customers", "c1", json!({"name": "Ada", "phone": null})).unwrap();
        assert_eq!(doc.str_field("name"), Some("Ada"));
        assert_eq!(doc.str_field("phone"), None);
        assert!(doc.field("phone").unwrap().is_null());
        assert!(doc.field("missing").is_none());
    }

    #[test]
    fn test_merge_overwrites_and_keeps_nulls() {
        let mut doc = Document::from_value("dues", "d1", json!({"amount": 10.0})).unwrap();
        let patch = match json!({"amount": 25.0, "note": null}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        doc.merge(patch);
        assert_eq!(doc.field("amount"), Some(&json!(25.0)));
        assert!(doc.field("note").unwrap().is_null());
    }

    #[test]
    fn test_typed_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Row {
            name: String,
            rank: Option<u32>,
        }

        let row = Row {
            name: "first".into(),
            rank: None,
        };
        let doc = Document::from_serializable("rows", "r1", &row).unwrap();
        // Optional None serialized as explicit null.
        assert!(doc.field("rank").unwrap().is_null());
        let back: Row = doc.deserialize().unwrap();
        assert_eq!(back, row);
    }
}
