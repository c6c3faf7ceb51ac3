//! Contract for the external generative-text collaborator.
//!
//! The collaborator turns free text into a structured due-entry guess and
//! composes reminder messages. It is request/response only: a failure on the
//! remote side surfaces as `None` or placeholder text, never as an error in
//! the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback reminder text when composition is unavailable.
pub const REMINDER_PLACEHOLDER: &str =
    "This is a friendly reminder that a payment is due. Please get in touch to settle it.";

/// Structured guess extracted from free text describing a due.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DueEntryGuess {
    pub customer_name: Option<String>,
    pub amount: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub short_note: Option<String>,
    pub last_payment_agreed_date: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Tone of a composed reminder message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderTone {
    Friendly,
    Firm,
    Urgent,
}

/// The external text collaborator.
#[async_trait]
pub trait ReminderComposer: Send + Sync {
    /// Parse free text into a due-entry guess. `None` when nothing useful
    /// could be extracted or the collaborator is unavailable.
    async fn extract_due_entry(&self, text: &str) -> Option<DueEntryGuess>;

    /// Compose a reminder message. Implementations return placeholder text
    /// on failure rather than erroring.
    async fn compose_reminder(
        &self,
        customer_name: &str,
        amount: f64,
        due_date: DateTime<Utc>,
        tone: ReminderTone,
    ) -> String;
}

/// Collaborator used when no generative backend is wired.
pub struct NullComposer;

#[async_trait]
impl ReminderComposer for NullComposer {
    async fn extract_due_entry(&self, _text: &str) -> Option<DueEntryGuess> {
        None
    }

    async fn compose_reminder(
        &self,
        _customer_name: &str,
        _amount: f64,
        _due_date: DateTime<Utc>,
        _tone: ReminderTone,
    ) -> String {
        REMINDER_PLACEHOLDER.to_string()
    }
}
