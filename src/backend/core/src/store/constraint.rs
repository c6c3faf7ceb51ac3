//! Query constraints applied to collection reads.
//!
//! Constraints are serializable: the sync layer derives cache keys from their
//! canonical JSON form, so two queries with the same constraint list share a
//! cache entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use super::document::Document;

// ═══════════════════════════════════════════════════════════════════════════════
// Ordering
// ═══════════════════════════════════════════════════════════════════════════════

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl Default for OrderDirection {
    fn default() -> Self {
        Self::Asc
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Filters
// ═══════════════════════════════════════════════════════════════════════════════

/// Comparison operator for field filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    ArrayContains,
}

/// A single field filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    /// Whether a document satisfies this filter. Documents missing the field
    /// never match.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.field(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Gt => compare_values(actual, &self.value) == Ordering::Greater,
            FilterOp::Gte => compare_values(actual, &self.value) != Ordering::Less,
            FilterOp::Lt => compare_values(actual, &self.value) == Ordering::Less,
            FilterOp::Lte => compare_values(actual, &self.value) != Ordering::Greater,
            FilterOp::ArrayContains => actual
                .as_array()
                .map(|items| items.contains(&self.value))
                .unwrap_or(false),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constraints
// ═══════════════════════════════════════════════════════════════════════════════

/// One constraint in a collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryConstraint {
    Where(FieldFilter),
    OrderBy {
        field: String,
        direction: OrderDirection,
    },
    Limit(usize),
}

impl QueryConstraint {
    /// Equality filter.
    pub fn where_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Where(FieldFilter {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        })
    }

    /// Comparison filter.
    pub fn where_op(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self::Where(FieldFilter {
            field: field.into(),
            op,
            value: value.into(),
        })
    }

    /// Ascending order-by.
    pub fn order_by_asc(field: impl Into<String>) -> Self {
        Self::OrderBy {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order-by.
    pub fn order_by_desc(field: impl Into<String>) -> Self {
        Self::OrderBy {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }

    /// Result count limit.
    pub fn limit(n: usize) -> Self {
        Self::Limit(n)
    }
}

/// Apply a constraint list to a document set: filters first, then the last
/// order-by, then the smallest limit.
pub fn apply_constraints(mut docs: Vec<Document>, constraints: &[QueryConstraint]) -> Vec<Document> {
    for c in constraints {
        if let QueryConstraint::Where(filter) = c {
            docs.retain(|d| filter.matches(d));
        }
    }

    let order = constraints.iter().rev().find_map(|c| match c {
        QueryConstraint::OrderBy { field, direction } => Some((field.clone(), *direction)),
        _ => None,
    });
    if let Some((field, direction)) = order {
        let null = Value::Null;
        docs.sort_by(|a, b| {
            let av = a.field(&field).unwrap_or(&null);
            let bv = b.field(&field).unwrap_or(&null);
            let ord = compare_values(av, bv).then_with(|| a.id.cmp(&b.id));
            match direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            }
        });
    }

    let limit = constraints
        .iter()
        .filter_map(|c| match c {
            QueryConstraint::Limit(n) => Some(*n),
            _ => None,
        })
        .min();
    if let Some(n) = limit {
        docs.truncate(n);
    }

    docs
}

/// Total ordering over the JSON values that appear in ordered fields.
/// Null sorts first; mixed types sort by type rank rather than panicking.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let xf = x.as_f64().unwrap_or(f64::NAN);
            let yf = y.as_f64().unwrap_or(f64::NAN);
            xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
