//! Composition root.
//!
//! Builds the one logical instance of each service per process and owns
//! their lifecycle. Services are plain values passed to consumers by `Arc`;
//! there is no global registry or lazy singleton.

use std::sync::Arc;
use tracing::info;

use crate::config::{Config, ObservabilityConfig, StoreBackend};
use crate::error::Result;
use crate::events::EventBus;
use crate::notify::NotificationService;
use crate::repo::DueRepository;
use crate::security::AccessControlService;
use crate::store::{MemoryStore, StoreHandle};
use crate::sync::ContentSyncService;

/// The wired application services.
pub struct AppContext {
    pub config: Config,
    pub store: StoreHandle,
    pub sync: Arc<ContentSyncService>,
    pub access: Arc<AccessControlService>,
    pub events: EventBus,
    pub notifications: Arc<NotificationService>,
    pub dues: Arc<DueRepository>,
}

impl AppContext {
    /// Wire every service from configuration.
    pub fn init(config: Config) -> Result<Self> {
        let store = match config.store.backend {
            StoreBackend::Memory => StoreHandle::configured(Arc::new(
                MemoryStore::with_change_buffer(config.store.change_buffer),
            )),
            StoreBackend::Unconfigured => StoreHandle::unconfigured(),
        };
        Ok(Self::init_with_store(config, store))
    }

    /// Wire every service over an explicit store, e.g. a managed backend
    /// adapter provided by the host application.
    pub fn init_with_store(config: Config, store: StoreHandle) -> Self {
        let sync = Arc::new(ContentSyncService::new(store.clone(), &config.cache));
        let access = Arc::new(AccessControlService::new(&config.security));
        let events = EventBus::default();
        let notifications = Arc::new(NotificationService::new(sync.clone(), events.clone()));
        let dues = Arc::new(DueRepository::new(sync.clone()));

        info!(
            store = ?store,
            configured = store.is_configured(),
            "Application context initialized"
        );

        Self {
            config,
            store,
            sync,
            access,
            events,
            notifications,
            dues,
        }
    }

    /// Tear down: detach listeners and clear caches. Idempotent; the context
    /// remains usable for reads afterwards.
    pub fn cleanup(&self) {
        self.sync.cleanup();
        info!("Application context cleaned up");
    }
}

/// Install the global tracing subscriber from configuration. Safe to call
/// more than once; later calls are no-ops.
pub fn init_tracing(config: &ObservabilityConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let builder = fmt().with_env_filter(filter);
    let result = if config.json_logging {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // Already initialized: keep the existing subscriber.
    let _ = result;
}
