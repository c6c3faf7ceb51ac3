//! Document store abstraction.
//!
//! The hosted document database behind the application is an external
//! collaborator; everything in this crate talks to it through the
//! [`DocumentStore`] trait. [`MemoryStore`] is the in-process implementation
//! used by tests and development. [`StoreHandle`] wraps the optional wiring:
//! the application must keep working, degraded, when no store is configured.

pub mod constraint;
pub mod document;
pub mod memory;

pub use constraint::{
    apply_constraints, compare_values, FieldFilter, FilterOp, OrderDirection, QueryConstraint,
};
pub use document::Document;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::{CoreError, Result};

/// Well-known collection names.
pub mod collections {
    pub const CUSTOMERS: &str = "customers";
    pub const DUES: &str = "dues";
    pub const PAYMENTS: &str = "payments";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const NOTIFICATION_PREFERENCES: &str = "notification_preferences";
    pub const USERS: &str = "users";
    pub const DYNAMIC_CONTENT: &str = "dynamic_content";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Batch Operations
// ═══════════════════════════════════════════════════════════════════════════════

/// A single mutation inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Create or fully replace a document.
    Set {
        collection: String,
        id: String,
        data: Value,
    },
    /// Merge fields into an existing document. Fails the batch if absent.
    Update {
        collection: String,
        id: String,
        data: Value,
    },
    /// Remove a document. Removing an absent document is a no-op.
    Delete { collection: String, id: String },
}

impl BatchOp {
    pub fn set(collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        Self::Set {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    pub fn update(collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        Self::Update {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Delete {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// The collection this op touches.
    pub fn collection(&self) -> &str {
        match self {
            Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    /// The document id this op touches.
    pub fn doc_id(&self) -> &str {
        match self {
            Self::Set { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => id,
        }
    }
}

/// Emitted on the per-collection change channel after any committed write.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub collection: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// The seam to the external document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Run a constrained query over a collection.
    async fn query(&self, collection: &str, constraints: &[QueryConstraint])
        -> Result<Vec<Document>>;

    /// Create or replace a document.
    async fn set_document(&self, collection: &str, id: &str, data: Value) -> Result<()>;

    /// Merge fields into an existing document.
    async fn update_document(&self, collection: &str, id: &str, data: Value) -> Result<()>;

    /// Delete a document. Returns whether it existed.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<bool>;

    /// Apply a batch atomically: either every op commits or none does.
    async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<()>;

    /// Subscribe to the change signal for a collection. A notice fires after
    /// every committed write touching the collection; receivers re-query for
    /// the full updated result set.
    fn changes(&self, collection: &str) -> broadcast::Receiver<ChangeNotice>;

    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentStore({})", self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Store Handle
// ═══════════════════════════════════════════════════════════════════════════════

/// Optional wiring to a [`DocumentStore`].
///
/// When unconfigured, collection reads degrade to empty results and writes
/// fail with `StoreNotConfigured`; see the sync service for the policy.
#[derive(Clone, Default)]
pub struct StoreHandle {
    inner: Option<Arc<dyn DocumentStore>>,
}

impl StoreHandle {
    /// A handle backed by a live store.
    pub fn configured(store: Arc<dyn DocumentStore>) -> Self {
        Self { inner: Some(store) }
    }

    /// A handle with no store wired.
    pub fn unconfigured() -> Self {
        Self { inner: None }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }

    /// Borrow the store, or fail with `StoreNotConfigured`.
    pub fn get(&self) -> Result<&Arc<dyn DocumentStore>> {
        self.inner.as_ref().ok_or_else(CoreError::not_configured)
    }

    /// Borrow the store if wired.
    pub fn try_get(&self) -> Option<&Arc<dyn DocumentStore>> {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Some(store) => write!(f, "StoreHandle({})", store.name()),
            None => write!(f, "StoreHandle(unconfigured)"),
        }
    }
}
