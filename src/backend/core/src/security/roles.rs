//! Default roles seeded at service initialization.
//!
//! | Role    | Level | Description                                            |
//! |---------|-------|--------------------------------------------------------|
//! | Admin   | 100   | Full access to every resource                          |
//! | Manager | 50    | Manage customers, dues, payments, and notifications    |
//! | User    | 10    | Work with own records only                             |
//! | Viewer  | 1     | Read-only access                                       |

use super::models::{Action, ActionSet, Permission, Role, RESOURCE_WILDCARD};
use super::predicate::OWN_DATA;
use crate::store::collections;

/// The fixed default role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultRole {
    Admin,
    Manager,
    User,
    Viewer,
}

impl DefaultRole {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::User => "user",
            Self::Viewer => "viewer",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Manager => "Manager",
            Self::User => "User",
            Self::Viewer => "Viewer",
        }
    }

    /// Informational privilege level; higher means more privileged.
    pub fn level(&self) -> i32 {
        match self {
            Self::Admin => 100,
            Self::Manager => 50,
            Self::User => 10,
            Self::Viewer => 1,
        }
    }

    /// Build the full `Role` for this default.
    pub fn to_role(&self) -> Role {
        let role = Role::new(self.id(), self.name(), self.level());
        match self {
            Self::Admin => role.with_permission(Permission::new(RESOURCE_WILDCARD, ActionSet::Any)),
            Self::Manager => {
                let crud = || {
                    ActionSet::of([Action::Create, Action::Read, Action::Update, Action::Delete])
                };
                role.with_permission(Permission::new(collections::CUSTOMERS, crud()))
                    .with_permission(Permission::new(collections::DUES, crud()))
                    .with_permission(Permission::new(collections::PAYMENTS, crud()))
                    .with_permission(Permission::new(collections::NOTIFICATIONS, crud()))
                    .with_permission(Permission::new(
                        collections::DYNAMIC_CONTENT,
                        ActionSet::of([Action::Read, Action::Update]),
                    ))
            }
            Self::User => {
                let own_crud = |resource: &str| {
                    Permission::new(
                        resource,
                        ActionSet::of([Action::Create, Action::Read, Action::Update]),
                    )
                    .with_condition(OWN_DATA)
                };
                role.with_permission(own_crud(collections::DUES))
                    .with_permission(own_crud(collections::PAYMENTS))
                    .with_permission(own_crud(collections::NOTIFICATIONS))
                    .with_permission(own_crud(collections::NOTIFICATION_PREFERENCES))
                    .with_permission(Permission::new(
                        collections::DYNAMIC_CONTENT,
                        ActionSet::of([Action::Read]),
                    ))
            }
            Self::Viewer => role.with_permission(Permission::new(
                RESOURCE_WILDCARD,
                ActionSet::of([Action::Read]),
            )),
        }
    }

    pub fn all() -> Vec<DefaultRole> {
        vec![Self::Admin, Self::Manager, Self::User, Self::Viewer]
    }

    /// Every default role as a full `Role`.
    pub fn all_defaults() -> Vec<Role> {
        Self::all().into_iter().map(|r| r.to_role()).collect()
    }
}
