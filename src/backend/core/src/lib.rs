//! # DueTrack Core
//!
//! Core services for the DueTrack due-payment tracker.
//!
//! ## Architecture
//!
//! - **Store**: document store seam with an in-process implementation
//! - **Sync**: TTL-cached collection access, live subscriptions, cursor
//!   pagination, atomic batches, query latency measurement
//! - **Security**: role/rule authorization with a predicate registry,
//!   sliding-window rate limiting, access log ring, input sanitization, and
//!   field-schema validation
//! - **Events**: typed in-process event bus for notification fan-out
//! - **Repo**: typed due/payment/promise access over the sync service
//! - **Context**: composition root owning service lifecycle
//!
//! The UI, mobile packaging, and the generative-text backend are external
//! collaborators; [`assist`] defines the contract for the latter.

pub mod assist;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod model;
pub mod notify;
pub mod repo;
pub mod security;
pub mod store;
pub mod sync;

pub use error::{CoreError, ErrorCode, ErrorContext, ErrorSeverity, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{CacheSettings, Config, SecuritySettings, StoreBackend};
    pub use crate::context::{init_tracing, AppContext};
    pub use crate::error::{CoreError, ErrorCode, ErrorSeverity, Result};
    pub use crate::events::{AppEvent, EventBus};
    pub use crate::model::{
        Customer, CustomerId, DueId, DueItem, DueStatus, Notification, NotificationKind,
        NotificationPreference, PaymentRecord, PaymentTransaction, PromiseRecord, PromiseStatus,
    };
    pub use crate::security::{
        AccessControlService, AccessLog, Action, ActionSet, DefaultRole, Permission, Role, RoleId,
        RuleConditions, SecurityAudit, SecurityRule, Session,
    };
    pub use crate::store::{
        BatchOp, Document, DocumentStore, FilterOp, MemoryStore, OrderDirection, QueryConstraint,
        StoreHandle,
    };
    pub use crate::sync::{
        ContentSyncService, DynamicContent, Measured, Page, PageCursor, PageRequest,
        SubscriptionHandle,
    };
}
