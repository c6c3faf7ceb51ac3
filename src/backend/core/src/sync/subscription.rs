//! Live-subscription bookkeeping.
//!
//! Every subscription owns its own forwarding task; two subscriptions to the
//! same collection and constraints share a cache key but not a listener, so
//! fan-out equals subscriber count.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::debug;

/// Identifier of one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub(crate) struct SubscriptionEntry {
    pub collection: String,
    pub cache_key: String,
    pub task: JoinHandle<()>,
}

/// Registry of live subscriptions.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: DashMap<u64, SubscriptionEntry>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(
        &self,
        collection: String,
        cache_key: String,
        task: JoinHandle<()>,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.insert(
            id,
            SubscriptionEntry {
                collection,
                cache_key,
                task,
            },
        );
        SubscriptionId(id)
    }

    /// Detach a listener and drop its bookkeeping entry. Cached data stays.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        if let Some((_, entry)) = self.entries.remove(&id.0) {
            entry.task.abort();
            debug!(
                collection = %entry.collection,
                cache_key = %entry.cache_key,
                "Subscription detached"
            );
            true
        } else {
            false
        }
    }

    pub(crate) fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.contains_key(&id.0)
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Abort every listener task and clear the registry.
    pub(crate) fn abort_all(&self) {
        let ids: Vec<u64> = self.entries.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, entry)) = self.entries.remove(&id) {
                entry.task.abort();
            }
        }
    }
}

/// Handle returned from `subscribe_to_collection`.
///
/// Dropping the handle does NOT detach the listener; call
/// [`SubscriptionHandle::unsubscribe`] explicitly. Handles returned for an
/// unconfigured store are inert.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    registry: Weak<SubscriptionRegistry>,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: SubscriptionId, registry: &Arc<SubscriptionRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    /// A handle with nothing behind it; `unsubscribe` is a no-op.
    pub(crate) fn inert() -> Self {
        Self {
            id: SubscriptionId(0),
            registry: Weak::new(),
        }
    }

    /// Whether the listener is still attached.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|r| r.contains(self.id))
            .unwrap_or(false)
    }

    /// Detach the listener and remove bookkeeping. Cached data is untouched.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        let id = registry.register("dues".into(), "query:dues:[]".into(), task);
        assert_eq!(registry.len(), 1);

        let handle = SubscriptionHandle::new(id, &registry);
        assert!(handle.is_active());
        handle.unsubscribe();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_inert_handle_is_noop() {
        let handle = SubscriptionHandle::inert();
        assert!(!handle.is_active());
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn test_abort_all() {
        let registry = Arc::new(SubscriptionRegistry::new());
        for i in 0..3 {
            let task = tokio::spawn(async {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            });
            registry.register(format!("c{i}"), format!("k{i}"), task);
        }
        assert_eq!(registry.len(), 3);
        registry.abort_all();
        assert!(registry.is_empty());
    }
}
