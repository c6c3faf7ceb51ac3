//! Typed in-process event bus.
//!
//! The only process-wide pub/sub mechanism: the notification service
//! publishes here and UI shells subscribe, with no global event target in
//! between. The bus is owned by the composition root and cloned into
//! publishers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::Notification;

/// Events carried on the application bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppEvent {
    /// An in-app notification for the current user.
    InAppNotification(Notification),
    /// Dashboards should re-fetch their data.
    DashboardRefresh,
}

impl AppEvent {
    /// Short name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InAppNotification(_) => "in_app_notification",
            Self::DashboardRefresh => "dashboard_refresh",
        }
    }
}

/// Broadcast bus for [`AppEvent`]s.
///
/// Publishing with no subscribers attached is a silent no-op. Slow
/// subscribers that fall more than the buffer behind observe a `Lagged`
/// error from their receiver and should re-sync.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to every current subscriber. Returns the number of
    /// subscribers that will observe it.
    pub fn publish(&self, event: AppEvent) -> usize {
        debug!(event = event.kind(), "Publishing event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Attach a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}
