//! Access control service.
//!
//! Answers "may the current session perform ACTION on RESOURCE against
//! DATA?" and records every decision. Two independent grant paths exist:
//!
//! 1. The session role's permissions (checked first; a grant short-circuits)
//! 2. Enabled security rules, in descending priority order
//!
//! The decision is a permissive union — a rule can grant what role
//! permissions do not — and there is no deny-override. An authorization miss
//! is never an error: `has_permission` returns `false` and logs.
//!
//! Custom conditions are named predicates registered ahead of time; no
//! caller-supplied string is ever compiled into code.

pub mod audit;
pub mod models;
pub mod predicate;
pub mod rate_limit;
pub mod roles;
pub mod sanitize;
pub mod validate;

pub use audit::{AccessLogRing, SecurityAudit, ACCESS_LOG_CAPACITY};
pub use models::{
    AccessLog, Action, ActionSet, Permission, Role, RoleId, RuleConditions, SecurityRule, Session,
    RESOURCE_WILDCARD,
};
pub use predicate::{check_own_data, PredicateRegistry, OWN_DATA};
pub use rate_limit::{RateLimiter, DEFAULT_LIMIT, DEFAULT_WINDOW};
pub use roles::DefaultRole;
pub use sanitize::{escape_str, sanitize_input};
pub use validate::{validate_data, FieldSchema, FieldType, ValidationSchema};

use dashmap::DashMap;
use metrics::counter;
use parking_lot::RwLock;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SecuritySettings;
use crate::error::{CoreError, Result};

/// Role/rule authorization over a single process-wide session.
///
/// Construct once at the composition root and share via `Arc`. The role
/// table is seeded with the fixed default set; roles can be added at runtime
/// but never removed.
pub struct AccessControlService {
    roles: DashMap<RoleId, Role>,
    rules: RwLock<Vec<SecurityRule>>,
    predicates: PredicateRegistry,
    session: RwLock<Option<Session>>,
    log: AccessLogRing,
    limiter: RateLimiter,
    default_limit: usize,
    default_window: Duration,
}

impl AccessControlService {
    /// Create a service with the default role set and settings.
    pub fn new(settings: &SecuritySettings) -> Self {
        let service = Self {
            roles: DashMap::new(),
            rules: RwLock::new(Vec::new()),
            predicates: PredicateRegistry::new(),
            session: RwLock::new(None),
            log: AccessLogRing::new(settings.access_log_capacity),
            limiter: RateLimiter::new(),
            default_limit: settings.rate_limit,
            default_window: Duration::from_millis(settings.rate_window_ms),
        };
        for role in DefaultRole::all_defaults() {
            service.roles.insert(role.id.clone(), role);
        }
        service
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────

    /// Authenticate: set the process-wide session.
    pub fn set_current_user(&self, session: Session) {
        info!(user_id = %session.id, role = %session.role, "Session set");
        *self.session.write() = Some(session);
    }

    /// Log out: back to anonymous.
    pub fn clear_current_user(&self) {
        info!("Session cleared");
        *self.session.write() = None;
    }

    /// The current session, if authenticated.
    pub fn current_user(&self) -> Option<Session> {
        self.session.read().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role & rule management
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a role. Roles are never removed.
    pub fn add_role(&self, role: Role) {
        debug!(role_id = %role.id, "Adding role");
        self.roles.insert(role.id.clone(), role);
    }

    /// Get a role by id.
    pub fn get_role(&self, id: &RoleId) -> Option<Role> {
        self.roles.get(id).map(|r| r.clone())
    }

    /// Register a security rule.
    pub fn add_rule(&self, rule: SecurityRule) {
        debug!(rule = %rule.name, priority = rule.priority, "Adding security rule");
        self.rules.write().push(rule);
    }

    /// Register a named condition predicate.
    pub fn register_predicate<F>(&self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Session, &Value) -> bool + Send + Sync + 'static,
    {
        self.predicates.register(name, predicate);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether the current session may perform `action` on `resource`,
    /// optionally judged against a candidate record.
    ///
    /// Fails closed on an anonymous session and on an unknown role. Role
    /// permissions are consulted first; on a grant, rules are not evaluated.
    /// Every decision is appended to the access log.
    pub fn has_permission(&self, resource: &str, action: Action, data: Option<&Value>) -> bool {
        let session = match self.current_user() {
            Some(s) => s,
            None => {
                return self.record(None, resource, action, data, false, Some("anonymous".into()));
            }
        };

        let role = match self.get_role(&session.role) {
            Some(r) => r,
            None => {
                warn!(role = %session.role, "Session role unknown to the role table");
                return self.record(
                    Some(&session.id),
                    resource,
                    action,
                    data,
                    false,
                    Some(format!("unknown role {}", session.role)),
                );
            }
        };

        // Path 1: role permissions. A grant short-circuits rule evaluation.
        for permission in &role.permissions {
            if permission.covers(resource, action)
                && self.conditions_hold(&permission.conditions, &session, data)
            {
                debug!(
                    user_id = %session.id,
                    resource,
                    action = %action,
                    "Granted by role permission"
                );
                return self.record(Some(&session.id), resource, action, data, true, None);
            }
        }

        // Path 2: enabled rules, descending priority.
        let mut matching: Vec<SecurityRule> = self
            .rules
            .read()
            .iter()
            .filter(|r| r.enabled && r.covers(resource, action))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.priority.cmp(&a.priority));

        for rule in &matching {
            if self.rule_conditions_hold(rule, &session, data) {
                debug!(
                    user_id = %session.id,
                    resource,
                    action = %action,
                    rule = %rule.name,
                    "Granted by security rule"
                );
                return self.record(Some(&session.id), resource, action, data, true, None);
            }
        }

        self.record(
            Some(&session.id),
            resource,
            action,
            data,
            false,
            Some("no matching permission or rule".into()),
        )
    }

    /// Like [`Self::has_permission`], but failing with `PermissionDenied`.
    pub fn enforce(&self, resource: &str, action: Action, data: Option<&Value>) -> Result<()> {
        if self.has_permission(resource, action, data) {
            Ok(())
        } else {
            Err(CoreError::permission_denied(resource, action.as_str()))
        }
    }

    /// Whether the candidate record belongs to the current session.
    pub fn check_own_data(&self, data: &Value) -> bool {
        match self.current_user() {
            Some(session) => check_own_data(&session, data),
            None => false,
        }
    }

    fn conditions_hold(&self, conditions: &[String], session: &Session, data: Option<&Value>) -> bool {
        if conditions.is_empty() {
            return true;
        }
        let null = Value::Null;
        let data = data.unwrap_or(&null);
        conditions.iter().all(|name| {
            // An unknown predicate name is a denial, never an error.
            self.predicates.evaluate(name, session, data).unwrap_or(false)
        })
    }

    fn rule_conditions_hold(
        &self,
        rule: &SecurityRule,
        session: &Session,
        data: Option<&Value>,
    ) -> bool {
        if let Some(roles) = &rule.conditions.roles {
            if !roles.contains(&session.role) {
                return false;
            }
        }
        if rule.conditions.require_ownership {
            let owned = data.map(|d| check_own_data(session, d)).unwrap_or(false);
            if !owned {
                return false;
            }
        }
        if let Some(custom) = &rule.conditions.custom {
            let null = Value::Null;
            let data = data.unwrap_or(&null);
            if !self.predicates.evaluate(custom, session, data).unwrap_or(false) {
                return false;
            }
        }
        true
    }

    fn record(
        &self,
        user_id: Option<&str>,
        resource: &str,
        action: Action,
        data: Option<&Value>,
        success: bool,
        error: Option<String>,
    ) -> bool {
        counter!(
            "authorization_decisions_total",
            "allowed" => if success { "true" } else { "false" }
        )
        .increment(1);
        self.log
            .push(AccessLog::decision(user_id, resource, action, data, success, error));
        success
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rate limiting, sanitization, validation
    // ─────────────────────────────────────────────────────────────────────────

    /// Sliding-window rate limit check under the configured defaults.
    pub fn check_rate_limit(&self, user_id: &str, action: &str) -> bool {
        self.limiter
            .check_with(user_id, action, self.default_limit, self.default_window)
    }

    /// Sliding-window rate limit check with explicit limit and window.
    pub fn check_rate_limit_with(
        &self,
        user_id: &str,
        action: &str,
        limit: usize,
        window: Duration,
    ) -> bool {
        self.limiter.check_with(user_id, action, limit, window)
    }

    /// Sanitize a JSON-like value before writing it. See [`sanitize`].
    pub fn sanitize_input(&self, data: &Value) -> Value {
        sanitize::sanitize_input(data)
    }

    /// Validate a payload against a field schema. See [`validate`].
    pub fn validate_data(&self, data: &Value, schema: Option<&ValidationSchema>) -> Vec<String> {
        validate::validate_data(data, schema)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Audit
    // ─────────────────────────────────────────────────────────────────────────

    /// The most recent `n` access log entries, oldest first.
    pub fn access_log(&self, n: usize) -> Vec<AccessLog> {
        self.log.recent(n)
    }

    /// Derive the security audit snapshot.
    pub fn security_audit(&self) -> SecurityAudit {
        self.log.audit()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
