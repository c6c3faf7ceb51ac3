//! Named-condition predicate registry.
//!
//! Conditions on permissions and rules are names resolved against this
//! registry of statically-typed predicate functions, registered ahead of
//! time at composition. Caller-supplied strings are never compiled into
//! code; a name with no registered predicate evaluates to a denial.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::models::Session;

/// Name of the built-in ownership condition.
pub const OWN_DATA: &str = "own_data";

/// Fields a record may carry to declare its owner.
pub const OWNER_FIELDS: &[&str] = &["userId", "ownerId", "createdBy", "user_id"];

/// A predicate over the current session and a candidate record.
pub type Predicate = Arc<dyn Fn(&Session, &Value) -> bool + Send + Sync>;

/// True iff the record carries an owner field equal to the session id.
pub fn check_own_data(session: &Session, data: &Value) -> bool {
    OWNER_FIELDS
        .iter()
        .filter_map(|field| data.get(field))
        .filter_map(Value::as_str)
        .any(|owner| owner == session.id)
}

/// Registry of named predicates.
pub struct PredicateRegistry {
    predicates: RwLock<HashMap<String, Predicate>>,
}

impl PredicateRegistry {
    /// Create a registry with the built-in `own_data` predicate.
    pub fn new() -> Self {
        let registry = Self {
            predicates: RwLock::new(HashMap::new()),
        };
        registry.register(OWN_DATA, check_own_data);
        registry
    }

    /// Register a predicate under a name, replacing any previous one.
    pub fn register<F>(&self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Session, &Value) -> bool + Send + Sync + 'static,
    {
        self.predicates
            .write()
            .insert(name.into(), Arc::new(predicate));
    }

    /// Whether a predicate is registered under this name.
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.read().contains_key(name)
    }

    /// Evaluate a named predicate. `None` means no such predicate is
    /// registered; callers treat that as a denial.
    pub fn evaluate(&self, name: &str, session: &Session, data: &Value) -> Option<bool> {
        let predicate = self.predicates.read().get(name).cloned();
        match predicate {
            Some(p) => Some(p(session, data)),
            None => {
                debug!(condition = name, "Unknown condition predicate; denying");
                None
            }
        }
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
