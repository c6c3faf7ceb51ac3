//! Access control data models: sessions, roles, permissions, rules, and
//! access log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers & Session
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed role identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The single process-wide identity: anonymous when absent, authenticated
/// when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// User identifier.
    pub id: String,
    /// Role assigned to this session.
    pub role: RoleId,
}

impl Session {
    pub fn new(id: impl Into<String>, role: impl Into<RoleId>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }
}

impl From<String> for RoleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Actions
// ═══════════════════════════════════════════════════════════════════════════════

/// The actions a permission or rule can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Admin,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Set of actions covered by a permission or rule; `Any` is the `*`
/// wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSet {
    Any,
    Only(Vec<Action>),
}

impl ActionSet {
    /// Build from an explicit action list.
    pub fn of(actions: impl IntoIterator<Item = Action>) -> Self {
        Self::Only(actions.into_iter().collect())
    }

    pub fn allows(&self, action: Action) -> bool {
        match self {
            Self::Any => true,
            Self::Only(actions) => actions.contains(&action),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Permissions & Roles
// ═══════════════════════════════════════════════════════════════════════════════

/// The wildcard resource.
pub const RESOURCE_WILDCARD: &str = "*";

/// A `(resource, actions, conditions)` triple.
///
/// `conditions` is a list of predicate names that must all evaluate true
/// against the candidate record (see the predicate registry); an empty list
/// is unconditional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Literal collection name or `"*"`.
    pub resource: String,
    pub actions: ActionSet,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl Permission {
    /// Unconditional permission.
    pub fn new(resource: impl Into<String>, actions: ActionSet) -> Self {
        Self {
            resource: resource.into(),
            actions,
            conditions: Vec::new(),
        }
    }

    /// Add a named condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Resource and action match, ignoring conditions.
    pub fn covers(&self, resource: &str, action: Action) -> bool {
        (self.resource == RESOURCE_WILDCARD || self.resource == resource)
            && self.actions.allows(action)
    }
}

/// A named bundle of permissions.
///
/// `level` is informational (higher means more privileged); it does not
/// impose an ordering on authorization decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub level: i32,
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>, level: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level,
            permissions: Vec::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Security Rules
// ═══════════════════════════════════════════════════════════════════════════════

/// Conditions attached to a security rule. All present conditions must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConditions {
    /// The session's role must be one of these.
    pub roles: Option<Vec<RoleId>>,

    /// The candidate record must belong to the current session, matched
    /// through the same owner fields as the `own_data` permission condition.
    #[serde(default)]
    pub require_ownership: bool,

    /// Name of a registered predicate that must evaluate true.
    pub custom: Option<String>,
}

/// An authorization rule evaluated independently of role permissions.
///
/// Rules form a second, any-of grant path: the decision is "permit if any
/// matching role permission OR any matching enabled rule approves". There is
/// no deny rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRule {
    pub id: String,
    pub name: String,
    /// Literal collection name or `"*"`.
    pub resource: String,
    pub conditions: RuleConditions,
    pub actions: ActionSet,
    pub enabled: bool,
    /// Rules are evaluated in descending priority order.
    pub priority: i32,
}

impl SecurityRule {
    pub fn new(name: impl Into<String>, resource: impl Into<String>, actions: ActionSet) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            resource: resource.into(),
            conditions: RuleConditions::default(),
            actions,
            enabled: true,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_conditions(mut self, conditions: RuleConditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Resource and action match, ignoring conditions and `enabled`.
    pub fn covers(&self, resource: &str, action: Action) -> bool {
        (self.resource == RESOURCE_WILDCARD || self.resource == resource)
            && self.actions.allows(action)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access Log
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable record of one authorization decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLog {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
}

impl AccessLog {
    /// Build a decision record, pulling `resource_id` from the candidate
    /// record's `id` field when present.
    pub fn decision(
        user_id: Option<&str>,
        resource: &str,
        action: Action,
        data: Option<&Value>,
        success: bool,
        error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.map(str::to_string),
            action: action.as_str().to_string(),
            resource: resource.to_string(),
            resource_id: data
                .and_then(|d| d.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            timestamp: Utc::now(),
            success,
            error,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_set_wildcard() {
        assert!(ActionSet::Any.allows(Action::Delete));
        let set = ActionSet::of([Action::Read, Action::Create]);
        assert!(set.allows(Action::Read));
        assert!(!set.allows(Action::Delete));
    }

    #[test]
    fn test_permission_covers() {
        let p = Permission::new("dues", ActionSet::of([Action::Read]));
        assert!(p.covers("dues", Action::Read));
        assert!(!p.covers("dues", Action::Delete));
        assert!(!p.covers("payments", Action::Read));

        let wild = Permission::new(RESOURCE_WILDCARD, ActionSet::Any);
        assert!(wild.covers("anything", Action::Admin));
    }

    #[test]
    fn test_rule_covers_ignores_enabled() {
        let rule = SecurityRule::new("r", "dues", ActionSet::Any).disabled();
        assert!(rule.covers("dues", Action::Read));
        assert!(!rule.enabled);
    }

    #[test]
    fn test_access_log_resource_id_extraction() {
        let data = json!({"id": "due-7", "amount": 5.0});
        let entry = AccessLog::decision(
            Some("u1"),
            "dues",
            Action::Read,
            Some(&data),
            true,
            None,
        );
        assert_eq!(entry.resource_id.as_deref(), Some("due-7"));
        assert_eq!(entry.action, "read");
        assert!(entry.success);

        let no_data = AccessLog::decision(None, "dues", Action::Read, None, false, None);
        assert!(no_data.resource_id.is_none());
        assert!(no_data.user_id.is_none());
    }

    #[test]
    fn test_action_serde_form() {
        assert_eq!(serde_json::to_value(Action::Create).unwrap(), json!("create"));
        let set: ActionSet = serde_json::from_value(json!("any")).unwrap();
        assert_eq!(set, ActionSet::Any);
    }
}
