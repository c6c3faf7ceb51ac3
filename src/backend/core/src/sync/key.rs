//! Cache key derivation.
//!
//! Keys are plain strings with a shape prefix:
//!
//! - `doc:{collection}:{id}` — a single document
//! - `query:{collection}:{constraints}` — a constrained collection read,
//!   with the constraint list serialized to canonical JSON
//! - `query:dynamic_content:type:{content_type}:all` — the by-type
//!   dynamic-content listing
//!
//! Batch writes invalidate by exact `doc:` key only; `query:` entries over
//! the same collection keep serving until their TTL lapses.

use crate::store::QueryConstraint;

/// Key for a single cached document.
pub fn document_key(collection: &str, id: &str) -> String {
    format!("doc:{collection}:{id}")
}

/// Key for a constrained collection read.
pub fn query_key(collection: &str, constraints: &[QueryConstraint]) -> String {
    let serialized =
        serde_json::to_string(constraints).unwrap_or_else(|_| "[]".to_string());
    format!("query:{collection}:{serialized}")
}

/// Key for a dynamic-content lookup. With an id this is the document key, so
/// batch invalidation reaches it; without one it is the by-type listing key.
pub fn dynamic_content_key(content_type: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => document_key(crate::store::collections::DYNAMIC_CONTENT, id),
        None => format!("query:dynamic_content:type:{content_type}:all"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::QueryConstraint;

    #[test]
    fn test_document_key_shape() {
        assert_eq!(document_key("dues", "d1"), "doc:dues:d1");
    }

    #[test]
    fn test_query_key_distinguishes_constraints() {
        let a = query_key("dues", &[QueryConstraint::where_eq("customer_id", "c1")]);
        let b = query_key("dues", &[QueryConstraint::where_eq("customer_id", "c2")]);
        let c = query_key("dues", &[]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert!(c.starts_with("query:dues:"));
    }

    #[test]
    fn test_same_constraints_share_key() {
        let constraints = vec![
            QueryConstraint::where_eq("status", "pending"),
            QueryConstraint::order_by_asc("due_date"),
        ];
        assert_eq!(
            query_key("dues", &constraints),
            query_key("dues", &constraints.clone())
        );
    }

    #[test]
    fn test_dynamic_content_keys() {
        assert_eq!(
            dynamic_content_key("banner", Some("b-1")),
            "doc:dynamic_content:b-1"
        );
        assert_eq!(
            dynamic_content_key("banner", None),
            "query:dynamic_content:type:banner:all"
        );
    }
}
