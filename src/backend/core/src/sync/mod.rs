//! Content synchronization service.
//!
//! Provides collections-as-queries access to the document store with:
//!
//! - **TTL caching**: query results cached by collection + constraints
//! - **Live subscriptions**: per-subscriber listener tasks delivering the
//!   full updated result set on every remote change
//! - **Cursor pagination**: `page_size + 1` fetch-and-trim, no count query
//! - **Atomic batches**: multi-document writes with exact-key invalidation
//! - **Latency measurement**: wrap any query and record its duration
//!
//! When the store is unconfigured, collection reads degrade to empty result
//! sets so the UI can render a disconnected state; writes and by-id reads
//! fail with `StoreNotConfigured`.

pub mod cache;
pub mod key;
pub mod pagination;
pub mod subscription;

pub use cache::{CacheEntry, CacheStats, QueryCache};
pub use pagination::{Page, PageCursor, PageRequest};
pub use subscription::{SubscriptionHandle, SubscriptionId, SubscriptionRegistry};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::histogram;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument, warn};

use crate::config::CacheSettings;
use crate::error::{CoreError, Result};
use crate::store::{collections, BatchOp, Document, DocumentStore, QueryConstraint, StoreHandle};

// ═══════════════════════════════════════════════════════════════════════════════
// Results
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a dynamic-content lookup: one document when an id was given,
/// otherwise every document of the requested type.
#[derive(Debug, Clone)]
pub enum DynamicContent {
    Single(Document),
    Collection(Vec<Document>),
}

impl DynamicContent {
    pub fn into_single(self) -> Option<Document> {
        match self {
            Self::Single(doc) => Some(doc),
            Self::Collection(_) => None,
        }
    }

    pub fn into_collection(self) -> Vec<Document> {
        match self {
            Self::Single(doc) => vec![doc],
            Self::Collection(docs) => docs,
        }
    }
}

/// A measured query outcome.
#[derive(Debug, Clone)]
pub struct Measured<T> {
    pub result: T,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Cache + real-time + pagination access to the document store.
///
/// Construct once at the composition root and share via `Arc`; `cleanup`
/// detaches all listeners and clears the cache.
pub struct ContentSyncService {
    store: StoreHandle,
    cache: Arc<QueryCache>,
    subscriptions: Arc<SubscriptionRegistry>,
    dynamic_content_ttl: ChronoDuration,
}

impl ContentSyncService {
    /// Create a service over the given store wiring.
    pub fn new(store: StoreHandle, settings: &CacheSettings) -> Self {
        Self {
            store,
            cache: Arc::new(QueryCache::new(settings.default_ttl_secs)),
            subscriptions: Arc::new(SubscriptionRegistry::new()),
            dynamic_content_ttl: ChronoDuration::seconds(settings.dynamic_content_ttl_secs as i64),
        }
    }

    /// Whether a store is wired.
    pub fn is_configured(&self) -> bool {
        self.store.is_configured()
    }

    /// The underlying store wiring.
    pub fn store_handle(&self) -> &StoreHandle {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Cached constrained read over a collection.
    ///
    /// Serves from cache while the entry is fresh; otherwise queries the
    /// store and overwrites the entry. Unconfigured store degrades to an
    /// empty result set.
    #[instrument(skip(self, constraints), fields(collection = collection))]
    pub async fn fetch_collection(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> Result<Vec<Document>> {
        let cache_key = key::query_key(collection, constraints);
        if let Some(docs) = self.cache.get(&cache_key) {
            debug!(cache_key = %cache_key, "Serving collection from cache");
            return Ok(docs);
        }

        let Some(store) = self.store.try_get() else {
            warn!(collection, "Store not configured; returning empty result set");
            return Ok(Vec::new());
        };

        let docs = store.query(collection, constraints).await?;
        self.cache.insert(&cache_key, docs.clone());
        Ok(docs)
    }

    /// Dynamic-content lookup.
    ///
    /// With an id: single-document read, `DocumentNotFound` when absent.
    /// Without: all documents whose `type` field equals `content_type`.
    /// By-id reads against an unconfigured store fail with
    /// `StoreNotConfigured`; listings degrade to empty.
    #[instrument(skip(self))]
    pub async fn get_dynamic_content(
        &self,
        content_type: &str,
        id: Option<&str>,
    ) -> Result<DynamicContent> {
        let cache_key = key::dynamic_content_key(content_type, id);

        match id {
            Some(id) => {
                if let Some(mut docs) = self.cache.get(&cache_key) {
                    if let Some(doc) = docs.pop() {
                        return Ok(DynamicContent::Single(doc));
                    }
                }
                let store = self.store.get()?;
                let doc = store
                    .get_document(collections::DYNAMIC_CONTENT, id)
                    .await?
                    .ok_or_else(|| CoreError::not_found(collections::DYNAMIC_CONTENT, id))?;
                self.cache.insert_with_ttl(
                    &cache_key,
                    vec![doc.clone()],
                    self.dynamic_content_ttl,
                );
                Ok(DynamicContent::Single(doc))
            }
            None => {
                if let Some(docs) = self.cache.get(&cache_key) {
                    return Ok(DynamicContent::Collection(docs));
                }
                let Some(store) = self.store.try_get() else {
                    warn!(content_type, "Store not configured; returning empty content list");
                    return Ok(DynamicContent::Collection(Vec::new()));
                };
                let docs = store
                    .query(
                        collections::DYNAMIC_CONTENT,
                        &[QueryConstraint::where_eq("type", content_type)],
                    )
                    .await?;
                self.cache
                    .insert_with_ttl(&cache_key, docs.clone(), self.dynamic_content_ttl);
                Ok(DynamicContent::Collection(docs))
            }
        }
    }

    /// Cursor-based forward pagination over a collection.
    ///
    /// Results are not cached; each call fetches `page_size + 1` matching
    /// rows and trims the extra to compute `has_more`.
    #[instrument(skip(self, request, constraints), fields(collection = collection))]
    pub async fn paginated_query(
        &self,
        collection: &str,
        request: &PageRequest,
        constraints: &[QueryConstraint],
    ) -> Result<Page> {
        let Some(store) = self.store.try_get() else {
            warn!(collection, "Store not configured; returning empty page");
            return Ok(Page {
                items: Vec::new(),
                has_more: false,
                next_cursor: None,
            });
        };

        let mut all = constraints.to_vec();
        all.push(QueryConstraint::OrderBy {
            field: request.order_by.clone(),
            direction: request.direction,
        });
        let docs = store.query(collection, &all).await?;
        Ok(pagination::paginate(docs, request))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a batch atomically, then invalidate the cache entry of every
    /// written or deleted document by exact key.
    ///
    /// Query entries cached under other constraints for the same collection
    /// are NOT invalidated and may serve stale data until their TTL lapses.
    #[instrument(skip(self, ops), fields(op_count = ops.len()))]
    pub async fn batch_operation(&self, ops: Vec<BatchOp>) -> Result<()> {
        let store = self.store.get()?;

        let doc_keys: Vec<String> = ops
            .iter()
            .map(|op| key::document_key(op.collection(), op.doc_id()))
            .collect();

        store.apply_batch(ops).await?;

        for doc_key in &doc_keys {
            self.cache.invalidate(doc_key);
        }
        debug!(invalidated = doc_keys.len(), "Batch committed and cache invalidated");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to a constrained collection view.
    ///
    /// Any cached, non-expired snapshot is delivered synchronously through
    /// `on_change` before the listener attaches; the listener's own first
    /// snapshot follows once the initial query completes, and every remote
    /// change after that re-delivers the full updated result set (not a
    /// diff), refreshing the cache entry.
    ///
    /// On an unconfigured store `on_error` is invoked once and the returned
    /// handle is inert. `unsubscribe` detaches the listener and removes the
    /// bookkeeping entry only; cached data is left in place.
    pub fn subscribe_to_collection<C, E>(
        &self,
        collection: &str,
        constraints: Vec<QueryConstraint>,
        on_change: C,
        on_error: E,
    ) -> SubscriptionHandle
    where
        C: Fn(Vec<Document>) + Send + Sync + 'static,
        E: Fn(CoreError) + Send + Sync + 'static,
    {
        let cache_key = key::query_key(collection, &constraints);

        let Some(store) = self.store.try_get() else {
            let err = CoreError::not_configured();
            err.track();
            on_error(err);
            return SubscriptionHandle::inert();
        };

        // Cached snapshot first, synchronously.
        if let Some(docs) = self.cache.get(&cache_key) {
            on_change(docs);
        }

        // Attach the change signal before the initial query so no committed
        // write can fall between them.
        let mut rx = store.changes(collection);
        let store = Arc::clone(store);
        let cache: Weak<QueryCache> = Arc::downgrade(&self.cache);
        let collection_owned = collection.to_string();
        let task_key = cache_key.clone();

        let task = tokio::spawn(async move {
            let refresh = |docs: &Vec<Document>| {
                if let Some(cache) = cache.upgrade() {
                    cache.insert(&task_key, docs.clone());
                }
            };

            match store.query(&collection_owned, &constraints).await {
                Ok(docs) => {
                    refresh(&docs);
                    on_change(docs);
                }
                Err(e) => {
                    e.track();
                    on_error(e);
                }
            }

            loop {
                match rx.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        match store.query(&collection_owned, &constraints).await {
                            Ok(docs) => {
                                refresh(&docs);
                                on_change(docs);
                            }
                            Err(e) => {
                                e.track();
                                on_error(e);
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let id = self
            .subscriptions
            .register(collection.to_string(), cache_key, task);
        SubscriptionHandle::new(id, &self.subscriptions)
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Measurement & lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Run an arbitrary async query, recording its latency. Failures are
    /// logged with the elapsed time and then propagated unchanged.
    pub async fn measure_query_performance<T, F>(&self, name: &str, query: F) -> Result<Measured<T>>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let timestamp = Utc::now();
        match query.await {
            Ok(result) => {
                let duration = start.elapsed();
                histogram!("sync_query_duration_seconds", "query" => name.to_string())
                    .record(duration.as_secs_f64());
                debug!(query = name, duration_ms = duration.as_millis() as u64, "Query measured");
                Ok(Measured {
                    result,
                    duration,
                    timestamp,
                })
            }
            Err(e) => {
                let duration = start.elapsed();
                histogram!("sync_query_duration_seconds", "query" => name.to_string())
                    .record(duration.as_secs_f64());
                warn!(
                    query = name,
                    duration_ms = duration.as_millis() as u64,
                    error = %e,
                    "Query failed"
                );
                Err(e)
            }
        }
    }

    /// Detach every listener and clear the cache. Idempotent.
    pub fn cleanup(&self) {
        self.subscriptions.abort_all();
        self.cache.clear();
        debug!("Sync service cleaned up");
    }

    /// Cache statistics snapshot.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Direct cache access for composition and tests.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn service_with_store() -> (ContentSyncService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = ContentSyncService::new(
            StoreHandle::configured(store.clone()),
            &CacheSettings::default(),
        );
        (service, store)
    }

    fn unconfigured_service() -> ContentSyncService {
        ContentSyncService::new(StoreHandle::unconfigured(), &CacheSettings::default())
    }

    #[tokio::test]
    async fn test_fetch_collection_caches() {
        let (service, store) = service_with_store();
        store
            .set_document("dues", "d1", json!({"amount": 10.0}))
            .await
            .unwrap();

        let first = service.fetch_collection("dues", &[]).await.unwrap();
        assert_eq!(first.len(), 1);

        // Write behind the cache's back; the cached entry still serves.
        store
            .set_document("dues", "d2", json!({"amount": 20.0}))
            .await
            .unwrap();
        let second = service.fetch_collection("dues", &[]).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(service.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_unconfigured_reads_degrade_to_empty() {
        let service = unconfigured_service();
        let docs = service.fetch_collection("dues", &[]).await.unwrap();
        assert!(docs.is_empty());

        let listing = service.get_dynamic_content("banner", None).await.unwrap();
        assert!(listing.into_collection().is_empty());

        let page = service
            .paginated_query("dues", &PageRequest::new(5, "amount"), &[])
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_unconfigured_writes_fail() {
        let service = unconfigured_service();
        let err = service
            .batch_operation(vec![BatchOp::set("dues", "d1", json!({"amount": 1.0}))])
            .await
            .unwrap_err();
        assert!(err.is_not_configured());
    }

    #[tokio::test]
    async fn test_dynamic_content_by_id_not_found() {
        let (service, _store) = service_with_store();
        let err = service
            .get_dynamic_content("banner", Some("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::DocumentNotFound);
    }

    #[tokio::test]
    async fn test_dynamic_content_type_filter() {
        let (service, store) = service_with_store();
        store
            .set_document(
                "dynamic_content",
                "b1",
                json!({"type": "banner", "text": "hello"}),
            )
            .await
            .unwrap();
        store
            .set_document(
                "dynamic_content",
                "f1",
                json!({"type": "footer", "text": "bye"}),
            )
            .await
            .unwrap();

        let banners = service
            .get_dynamic_content("banner", None)
            .await
            .unwrap()
            .into_collection();
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].id, "b1");

        let single = service
            .get_dynamic_content("banner", Some("b1"))
            .await
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(single.str_field("text"), Some("hello"));
    }

    #[tokio::test]
    async fn test_batch_invalidates_exact_doc_keys_only() {
        let (service, store) = service_with_store();
        store
            .set_document("dues", "d1", json!({"amount": 10.0}))
            .await
            .unwrap();

        // Prime a query cache entry and a document cache entry.
        service.fetch_collection("dues", &[]).await.unwrap();
        service
            .cache()
            .insert(&key::document_key("dues", "d1"), vec![]);

        service
            .batch_operation(vec![BatchOp::update("dues", "d1", json!({"amount": 99.0}))])
            .await
            .unwrap();

        // The document entry is gone; the query entry still serves stale data.
        assert!(!service.cache().contains_fresh(&key::document_key("dues", "d1")));
        let stale = service.fetch_collection("dues", &[]).await.unwrap();
        assert_eq!(stale[0].field("amount"), Some(&json!(10.0)));
    }

    #[tokio::test]
    async fn test_subscription_receives_updates() {
        let (service, store) = service_with_store();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = service.subscribe_to_collection(
            "dues",
            vec![],
            move |docs| {
                let _ = tx.send(docs.len());
            },
            |e| panic!("unexpected error: {e}"),
        );

        // Initial listener snapshot (empty collection).
        assert_eq!(rx.recv().await.unwrap(), 0);

        store
            .set_document("dues", "d1", json!({"amount": 1.0}))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), 1);

        store
            .set_document("dues", "d2", json!({"amount": 2.0}))
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), 2);

        assert_eq!(service.active_subscriptions(), 1);
        handle.unsubscribe();
        assert_eq!(service.active_subscriptions(), 0);

        // Detaching does not clear cached data.
        assert!(service
            .cache()
            .contains_fresh(&key::query_key("dues", &[])));
    }

    #[tokio::test]
    async fn test_subscription_delivers_cached_snapshot_synchronously() {
        let (service, store) = service_with_store();
        store
            .set_document("dues", "d1", json!({"amount": 1.0}))
            .await
            .unwrap();
        service.fetch_collection("dues", &[]).await.unwrap();

        let sync_count = Arc::new(AtomicUsize::new(0));
        let counter = sync_count.clone();
        let handle = service.subscribe_to_collection(
            "dues",
            vec![],
            move |_docs| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            |_e| {},
        );

        // The cached snapshot was delivered before subscribe returned.
        assert!(sync_count.load(Ordering::SeqCst) >= 1);
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn test_subscription_unconfigured_errors_once() {
        let service = unconfigured_service();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();

        let handle = service.subscribe_to_collection(
            "dues",
            vec![],
            |_docs| panic!("no data expected"),
            move |e| sink.lock().unwrap().push(e.code()),
        );

        assert!(!handle.is_active());
        handle.unsubscribe();
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0], crate::error::ErrorCode::StoreNotConfigured);
    }

    #[tokio::test]
    async fn test_no_listener_deduplication() {
        let (service, store) = service_with_store();
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));

        let a = count_a.clone();
        let h1 = service.subscribe_to_collection(
            "dues",
            vec![],
            move |_d| {
                a.fetch_add(1, Ordering::SeqCst);
            },
            |_e| {},
        );
        let b = count_b.clone();
        let h2 = service.subscribe_to_collection(
            "dues",
            vec![],
            move |_d| {
                b.fetch_add(1, Ordering::SeqCst);
            },
            |_e| {},
        );

        assert_eq!(service.active_subscriptions(), 2);

        store
            .set_document("dues", "d1", json!({"amount": 1.0}))
            .await
            .unwrap();
        // Both listeners observe the change independently.
        tokio::time::timeout(Duration::from_secs(2), async {
            while count_a.load(Ordering::SeqCst) < 2 || count_b.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("both subscribers should observe the write");

        h1.unsubscribe();
        h2.unsubscribe();
    }

    #[tokio::test]
    async fn test_measure_query_performance() {
        let (service, _store) = service_with_store();
        let measured = service
            .measure_query_performance("noop", async { Ok(42u32) })
            .await
            .unwrap();
        assert_eq!(measured.result, 42);

        let err = service
            .measure_query_performance("failing", async {
                Err::<(), _>(CoreError::not_found("dues", "x"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::DocumentNotFound);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let (service, store) = service_with_store();
        store
            .set_document("dues", "d1", json!({"amount": 1.0}))
            .await
            .unwrap();
        service.fetch_collection("dues", &[]).await.unwrap();
        let _handle = service.subscribe_to_collection("dues", vec![], |_d| {}, |_e| {});

        service.cleanup();
        assert_eq!(service.active_subscriptions(), 0);
        assert_eq!(service.cache().len(), 0);

        // Second call is a no-op.
        service.cleanup();
        assert_eq!(service.active_subscriptions(), 0);
    }
}
