//! Integration tests for the content sync service.
//!
//! These tests verify the caching, invalidation, pagination, and
//! subscription contracts end-to-end against the in-process store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use duetrack_core::config::CacheSettings;
use duetrack_core::store::{BatchOp, DocumentStore, MemoryStore, QueryConstraint, StoreHandle};
use duetrack_core::sync::{key, ContentSyncService, PageRequest};

// ============================================================================
// Test Utilities
// ============================================================================

fn service() -> (Arc<ContentSyncService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let sync = Arc::new(ContentSyncService::new(
        StoreHandle::configured(store.clone()),
        &CacheSettings::default(),
    ));
    (sync, store)
}

fn short_ttl_service(store: Arc<MemoryStore>, ttl_secs: u64) -> ContentSyncService {
    ContentSyncService::new(
        StoreHandle::configured(store),
        &CacheSettings {
            default_ttl_secs: ttl_secs,
            dynamic_content_ttl_secs: ttl_secs,
        },
    )
}

async fn seed_dues(store: &MemoryStore, count: usize) {
    for i in 0..count {
        store
            .set_document(
                "dues",
                &format!("d{i:02}"),
                json!({"amount": (i as f64) * 10.0, "customer_id": "c1"}),
            )
            .await
            .unwrap();
    }
}

// ============================================================================
// Cache TTL
// ============================================================================

#[tokio::test]
async fn cached_read_skips_the_store_before_expiry() {
    let (sync, store) = service();
    seed_dues(&store, 3).await;

    let first = sync.fetch_collection("dues", &[]).await.unwrap();
    assert_eq!(first.len(), 3);

    // A write the cache does not know about: the cached snapshot keeps
    // serving while fresh.
    store
        .set_document("dues", "d99", json!({"amount": 990.0}))
        .await
        .unwrap();
    let second = sync.fetch_collection("dues", &[]).await.unwrap();
    assert_eq!(second.len(), 3);

    let stats = sync.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn expired_entry_triggers_a_fresh_fetch() {
    let store = Arc::new(MemoryStore::new());
    seed_dues(&store, 2).await;
    // Zero TTL: every entry is expired the moment it lands.
    let sync = short_ttl_service(store.clone(), 0);

    assert_eq!(sync.fetch_collection("dues", &[]).await.unwrap().len(), 2);

    store
        .set_document("dues", "d99", json!({"amount": 990.0}))
        .await
        .unwrap();
    // The expired entry is overwritten by a fresh fetch that sees the write.
    assert_eq!(sync.fetch_collection("dues", &[]).await.unwrap().len(), 3);
}

// ============================================================================
// Batch Invalidation Exactness
// ============================================================================

#[tokio::test]
async fn batch_invalidates_document_keys_and_nothing_else() {
    let (sync, store) = service();
    seed_dues(&store, 2).await;

    // Prime: a by-id dynamic content entry and two query entries with
    // different constraints over the same collection.
    store
        .set_document("dynamic_content", "b1", json!({"type": "banner", "text": "old"}))
        .await
        .unwrap();
    sync.get_dynamic_content("banner", Some("b1")).await.unwrap();

    let all = sync.fetch_collection("dues", &[]).await.unwrap();
    assert_eq!(all.len(), 2);
    let filtered = sync
        .fetch_collection("dues", &[QueryConstraint::where_eq("customer_id", "c1")])
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);

    sync.batch_operation(vec![
        BatchOp::update("dynamic_content", "b1", json!({"text": "new"})),
        BatchOp::set("dues", "d50", json!({"amount": 500.0, "customer_id": "c1"})),
    ])
    .await
    .unwrap();

    // The by-id entry was invalidated: the next read sees the new text.
    let banner = sync
        .get_dynamic_content("banner", Some("b1"))
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(banner.str_field("text"), Some("new"));

    // Both query entries over `dues` remain stale by design: the batch only
    // invalidates exact document keys.
    assert_eq!(sync.fetch_collection("dues", &[]).await.unwrap().len(), 2);
    assert_eq!(
        sync.fetch_collection("dues", &[QueryConstraint::where_eq("customer_id", "c1")])
            .await
            .unwrap()
            .len(),
        2
    );
    assert!(sync.cache().contains_fresh(&key::query_key("dues", &[])));
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn page_size_and_has_more_are_exact() {
    let (sync, store) = service();
    seed_dues(&store, 7).await;

    let request = PageRequest::new(3, "amount");
    let first = sync.paginated_query("dues", &request, &[]).await.unwrap();
    assert_eq!(first.items.len(), 3);
    assert!(first.has_more);

    let second = sync
        .paginated_query("dues", &request.clone().after(first.next_cursor.unwrap()), &[])
        .await
        .unwrap();
    assert_eq!(second.items.len(), 3);
    assert!(second.has_more);

    let third = sync
        .paginated_query(
            "dues",
            &request.clone().after(second.next_cursor.unwrap()),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(third.items.len(), 1);
    assert!(!third.has_more);
    assert!(third.next_cursor.is_none());
}

#[tokio::test]
async fn pagination_respects_constraints() {
    let (sync, store) = service();
    seed_dues(&store, 5).await;
    store
        .set_document("dues", "other", json!({"amount": 1.0, "customer_id": "c2"}))
        .await
        .unwrap();

    let page = sync
        .paginated_query(
            "dues",
            &PageRequest::new(10, "amount"),
            &[QueryConstraint::where_eq("customer_id", "c1")],
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 5);
    assert!(!page.has_more);
    assert!(page.items.iter().all(|d| d.str_field("customer_id") == Some("c1")));
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test]
async fn subscription_full_result_set_on_every_change() {
    let (sync, store) = service();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = sync.subscribe_to_collection(
        "dues",
        vec![QueryConstraint::where_eq("customer_id", "c1")],
        move |docs| {
            let _ = tx.send(docs.iter().map(|d| d.id.clone()).collect::<Vec<_>>());
        },
        |e| panic!("unexpected subscription error: {e}"),
    );

    // Listener's initial snapshot.
    assert!(rx.recv().await.unwrap().is_empty());

    store
        .set_document("dues", "d1", json!({"customer_id": "c1", "amount": 1.0}))
        .await
        .unwrap();
    assert_eq!(rx.recv().await.unwrap(), vec!["d1".to_string()]);

    // A document outside the constraint still triggers a re-query; the
    // delivered set is the filtered view.
    store
        .set_document("dues", "dx", json!({"customer_id": "c2", "amount": 2.0}))
        .await
        .unwrap();
    assert_eq!(rx.recv().await.unwrap(), vec!["d1".to_string()]);

    handle.unsubscribe();
    assert_eq!(sync.active_subscriptions(), 0);
}

#[tokio::test]
async fn unsubscribe_keeps_cached_data() {
    let (sync, store) = service();
    store
        .set_document("dues", "d1", json!({"amount": 1.0}))
        .await
        .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = sync.subscribe_to_collection(
        "dues",
        vec![],
        move |docs| {
            let _ = tx.send(docs.len());
        },
        |_e| {},
    );
    // Wait for the listener snapshot so the cache entry exists.
    assert_eq!(rx.recv().await.unwrap(), 1);

    handle.unsubscribe();
    assert!(sync.cache().contains_fresh(&key::query_key("dues", &[])));
}

// ============================================================================
// Measurement
// ============================================================================

#[tokio::test]
async fn measurement_wraps_result_and_duration() {
    let (sync, store) = service();
    seed_dues(&store, 4).await;

    let sync2 = sync.clone();
    let measured = sync
        .measure_query_performance("dues:list", async move {
            sync2.fetch_collection("dues", &[]).await
        })
        .await
        .unwrap();
    assert_eq!(measured.result.len(), 4);
    assert!(measured.duration < Duration::from_secs(5));
}
