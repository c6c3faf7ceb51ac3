//! Notification service.
//!
//! Persists notifications through the sync service and fans them out on the
//! event bus. Per-user preferences gate delivery; a muted kind is dropped
//! before any write. Browser push and permission prompts stay in the UI
//! layer.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::assist::{ReminderComposer, ReminderTone};
use crate::error::Result;
use crate::events::{AppEvent, EventBus};
use crate::model::{Customer, DueItem, Notification, NotificationKind, NotificationPreference};
use crate::security::sanitize::sanitize_input;
use crate::store::{collections, BatchOp};
use crate::sync::ContentSyncService;

/// Store-backed notification delivery with bus fan-out.
pub struct NotificationService {
    sync: Arc<ContentSyncService>,
    bus: EventBus,
}

impl NotificationService {
    pub fn new(sync: Arc<ContentSyncService>, bus: EventBus) -> Self {
        Self { sync, bus }
    }

    /// Deliver a notification: preference check, sanitized store write, then
    /// bus publish. Returns whether it was delivered.
    #[instrument(skip(self, notification), fields(user_id = %notification.user_id))]
    pub async fn send(&self, notification: Notification) -> Result<bool> {
        let prefs = self.preferences_for(&notification.user_id).await?;
        if !prefs.allows(notification.kind) {
            debug!(kind = ?notification.kind, "Notification muted by preferences");
            return Ok(false);
        }

        let payload = sanitize_input(&serde_json::to_value(&notification)?);
        self.sync
            .batch_operation(vec![BatchOp::set(
                collections::NOTIFICATIONS,
                notification.id.as_str(),
                payload,
            )])
            .await?;

        self.bus.publish(AppEvent::InAppNotification(notification));
        Ok(true)
    }

    /// Ask dashboards to re-fetch.
    pub fn notify_dashboard(&self) {
        self.bus.publish(AppEvent::DashboardRefresh);
    }

    /// Compose and deliver a payment reminder for a due.
    ///
    /// The composer is the external text collaborator; it degrades to
    /// placeholder text, so this only fails on store errors.
    pub async fn remind(
        &self,
        composer: &dyn ReminderComposer,
        customer: &Customer,
        due: &DueItem,
        tone: ReminderTone,
    ) -> Result<bool> {
        let body = composer
            .compose_reminder(&customer.name, due.outstanding(), due.due_date, tone)
            .await;
        let notification = Notification::new(
            customer.id.as_str(),
            format!("Payment reminder: {}", due.title),
            body,
            NotificationKind::Reminder,
        );
        self.send(notification).await
    }

    /// Load the user's preferences, defaulting to everything enabled when no
    /// preference document exists or the store is unconfigured.
    async fn preferences_for(&self, user_id: &str) -> Result<NotificationPreference> {
        let docs = self
            .sync
            .fetch_collection(
                collections::NOTIFICATION_PREFERENCES,
                &[crate::store::QueryConstraint::where_eq("user_id", user_id)],
            )
            .await?;
        Ok(docs
            .first()
            .and_then(|doc| doc.deserialize::<NotificationPreference>().ok())
            .unwrap_or_else(|| NotificationPreference {
                user_id: user_id.to_string(),
                ..NotificationPreference::default()
            }))
    }
}

/// Convenience for UI code: the unread notifications of a user, newest
/// first.
pub async fn unread_notifications(
    sync: &ContentSyncService,
    user_id: &str,
) -> Result<Vec<Notification>> {
    let docs = sync
        .fetch_collection(
            collections::NOTIFICATIONS,
            &[
                crate::store::QueryConstraint::where_eq("user_id", user_id),
                crate::store::QueryConstraint::where_eq("read", Value::Bool(false)),
                crate::store::QueryConstraint::order_by_desc("created_at"),
            ],
        )
        .await?;
    Ok(docs
        .iter()
        .filter_map(|doc| doc.deserialize::<Notification>().ok())
        .collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheSettings;
    use crate::model::CustomerId;
    use crate::store::{DocumentStore, MemoryStore, StoreHandle};
    use chrono::Utc;

    fn setup() -> (NotificationService, Arc<MemoryStore>, EventBus) {
        let store = Arc::new(MemoryStore::new());
        let sync = Arc::new(ContentSyncService::new(
            StoreHandle::configured(store.clone()),
            &CacheSettings::default(),
        ));
        let bus = EventBus::default();
        (NotificationService::new(sync, bus.clone()), store, bus)
    }

    #[tokio::test]
    async fn test_send_persists_and_publishes() {
        let (service, store, bus) = setup();
        let mut rx = bus.subscribe();

        let delivered = service
            .send(Notification::new(
                "u1",
                "Payment received",
                "Thanks!",
                NotificationKind::Payment,
            ))
            .await
            .unwrap();
        assert!(delivered);

        assert_eq!(store.collection_len(collections::NOTIFICATIONS), 1);
        match rx.recv().await.unwrap() {
            AppEvent::InAppNotification(n) => assert_eq!(n.user_id, "u1"),
            other => panic!("unexpected event: {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_muted_kind_is_dropped() {
        let (service, store, _bus) = setup();
        store
            .set_document(
                collections::NOTIFICATION_PREFERENCES,
                "u1",
                serde_json::json!({
                    "user_id": "u1",
                    "in_app": true,
                    "reminders": false,
                    "payment_alerts": true
                }),
            )
            .await
            .unwrap();

        let delivered = service
            .send(Notification::new(
                "u1",
                "Reminder",
                "Due soon",
                NotificationKind::Reminder,
            ))
            .await
            .unwrap();
        assert!(!delivered);
        assert_eq!(store.collection_len(collections::NOTIFICATIONS), 0);
    }

    #[tokio::test]
    async fn test_stored_notification_is_sanitized() {
        let (service, store, _bus) = setup();
        service
            .send(Notification::new(
                "u1",
                "<script>alert(1)</script>",
                "ok",
                NotificationKind::System,
            ))
            .await
            .unwrap();

        let docs = store
            .query(collections::NOTIFICATIONS, &[])
            .await
            .unwrap();
        let title = docs[0].str_field("title").unwrap();
        assert!(!title.contains('<'));
        assert!(title.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_remind_uses_placeholder_composer() {
        let (service, store, _bus) = setup();
        let customer = Customer::new("Ada");
        let due = DueItem::new(
            CustomerId::new(customer.id.as_str()),
            "Invoice 7",
            120.0,
            Utc::now(),
        );

        let delivered = service
            .remind(
                &crate::assist::NullComposer,
                &customer,
                &due,
                ReminderTone::Friendly,
            )
            .await
            .unwrap();
        assert!(delivered);
        assert_eq!(store.collection_len(collections::NOTIFICATIONS), 1);
    }
}
