//! Domain documents stored in the document store.
//!
//! Shapes mirror the store collections: `customers`, `dues`, `payments`,
//! `notifications`, `notification_preferences`. All optional fields are
//! serialized as `null` rather than omitted so documents stay shape-stable
//! across partial writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed customer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed due identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DueId(pub String);

impl DueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DueId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Dues
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of a due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    Pending,
    Partial,
    Overdue,
    Paid,
}

impl DueStatus {
    /// Whether money is still owed.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Paid)
    }
}

/// One payment applied to a due, kept as embedded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: f64,
    pub paid_at: DateTime<Utc>,
    pub method: Option<String>,
    pub note: Option<String>,
}

/// An amount owed by a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueItem {
    pub id: DueId,
    pub customer_id: CustomerId,
    pub title: String,
    pub amount: f64,
    pub amount_paid: f64,
    pub due_date: DateTime<Utc>,
    pub status: DueStatus,
    pub short_note: Option<String>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DueItem {
    /// Create a new pending due.
    pub fn new(
        customer_id: CustomerId,
        title: impl Into<String>,
        amount: f64,
        due_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DueId::generate(),
            customer_id,
            title: title.into(),
            amount,
            amount_paid: 0.0,
            due_date,
            status: DueStatus::Pending,
            short_note: None,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a short note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.short_note = Some(note.into());
        self
    }

    /// Amount still owed.
    pub fn outstanding(&self) -> f64 {
        (self.amount - self.amount_paid).max(0.0)
    }

    /// Apply a payment, appending to the history and moving the status to
    /// partial or paid. Amounts beyond the outstanding balance still settle
    /// the due; the surplus stays visible in `amount_paid`.
    pub fn apply_payment(&mut self, record: PaymentRecord) {
        self.amount_paid += record.amount;
        self.updated_at = record.paid_at;
        self.payments.push(record);
        self.status = if self.amount_paid >= self.amount {
            DueStatus::Paid
        } else {
            DueStatus::Partial
        };
    }

    /// Mark overdue if still open past its due date.
    pub fn mark_overdue_if_past(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_open() && self.due_date < now && self.status != DueStatus::Overdue {
            self.status = DueStatus::Overdue;
            self.updated_at = now;
            true
        } else {
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Customers & Payments
// ═══════════════════════════════════════════════════════════════════════════════

/// A customer who can owe dues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new(Uuid::new_v4().to_string()),
            name: name.into(),
            phone_number: None,
            address: None,
            created_at: Utc::now(),
        }
    }
}

/// A standalone payment transaction, stored in the `payments` collection in
/// addition to the due's embedded history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: String,
    pub due_id: DueId,
    pub customer_id: CustomerId,
    pub amount: f64,
    pub paid_at: DateTime<Utc>,
    pub method: Option<String>,
}

impl PaymentTransaction {
    pub fn new(due_id: DueId, customer_id: CustomerId, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            due_id,
            customer_id,
            amount,
            paid_at: Utc::now(),
            method: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Promises
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a customer's stated intention to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromiseStatus {
    Open,
    Kept,
    Broken,
}

/// A customer's stated intention to pay by a specific date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromiseRecord {
    pub id: String,
    pub due_id: DueId,
    pub customer_id: CustomerId,
    pub promised_date: DateTime<Utc>,
    pub amount: Option<f64>,
    pub status: PromiseStatus,
    pub created_at: DateTime<Utc>,
}

impl PromiseRecord {
    pub fn new(due_id: DueId, customer_id: CustomerId, promised_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            due_id,
            customer_id,
            promised_date,
            amount: None,
            status: PromiseStatus::Open,
            created_at: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Notifications
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reminder,
    Payment,
    System,
}

/// An in-app notification addressed to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            body: body.into(),
            kind,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Per-user notification delivery preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub user_id: String,
    pub in_app: bool,
    pub reminders: bool,
    pub payment_alerts: bool,
}

impl Default for NotificationPreference {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            in_app: true,
            reminders: true,
            payment_alerts: true,
        }
    }
}

impl NotificationPreference {
    /// Whether a notification of the given kind should be delivered in-app.
    pub fn allows(&self, kind: NotificationKind) -> bool {
        if !self.in_app {
            return false;
        }
        match kind {
            NotificationKind::Reminder => self.reminders,
            NotificationKind::Payment => self.payment_alerts,
            NotificationKind::System => true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn due(amount: f64) -> DueItem {
        DueItem::new(
            CustomerId::new("c1"),
            "Invoice 7",
            amount,
            Utc::now() + Duration::days(7),
        )
    }

    #[test]
    fn test_partial_then_paid() {
        let mut d = due(100.0);
        assert_eq!(d.status, DueStatus::Pending);

        d.apply_payment(PaymentRecord {
            amount: 40.0,
            paid_at: Utc::now(),
            method: None,
            note: None,
        });
        assert_eq!(d.status, DueStatus::Partial);
        assert!((d.outstanding() - 60.0).abs() < f64::EPSILON);

        d.apply_payment(PaymentRecord {
            amount: 60.0,
            paid_at: Utc::now(),
            method: Some("cash".into()),
            note: None,
        });
        assert_eq!(d.status, DueStatus::Paid);
        assert_eq!(d.outstanding(), 0.0);
        assert_eq!(d.payments.len(), 2);
    }

    #[test]
    fn test_overpayment_settles() {
        let mut d = due(50.0);
        d.apply_payment(PaymentRecord {
            amount: 80.0,
            paid_at: Utc::now(),
            method: None,
            note: None,
        });
        assert_eq!(d.status, DueStatus::Paid);
        assert_eq!(d.outstanding(), 0.0);
        assert!((d.amount_paid - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mark_overdue_only_when_open_and_past() {
        let now = Utc::now();
        let mut past = DueItem::new(CustomerId::new("c1"), "old", 10.0, now - Duration::days(1));
        assert!(past.mark_overdue_if_past(now));
        assert_eq!(past.status, DueStatus::Overdue);
        // Already overdue: no further transition.
        assert!(!past.mark_overdue_if_past(now));

        let mut future = due(10.0);
        assert!(!future.mark_overdue_if_past(now));
        assert_eq!(future.status, DueStatus::Pending);

        let mut paid = DueItem::new(CustomerId::new("c1"), "settled", 10.0, now - Duration::days(1));
        paid.apply_payment(PaymentRecord {
            amount: 10.0,
            paid_at: now,
            method: None,
            note: None,
        });
        assert!(!paid.mark_overdue_if_past(now));
        assert_eq!(paid.status, DueStatus::Paid);
    }

    #[test]
    fn test_preference_gating() {
        let prefs = NotificationPreference {
            user_id: "u1".into(),
            in_app: true,
            reminders: false,
            payment_alerts: true,
        };
        assert!(!prefs.allows(NotificationKind::Reminder));
        assert!(prefs.allows(NotificationKind::Payment));
        assert!(prefs.allows(NotificationKind::System));

        let muted = NotificationPreference {
            in_app: false,
            ..NotificationPreference::default()
        };
        assert!(!muted.allows(NotificationKind::System));
    }

    #[test]
    fn test_due_serializes_optionals_as_null() {
        let d = due(25.0);
        let value = serde_json::to_value(&d).unwrap();
        assert!(value.get("short_note").unwrap().is_null());
        assert_eq!(value.get("status").unwrap(), "pending");
    }
}
