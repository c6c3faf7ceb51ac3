//! Typed data access over the sync service.
//!
//! The UI works with `DueItem`/`Customer`/`PaymentTransaction` shapes; this
//! layer maps them onto documents and keeps the due lifecycle consistent:
//! recording a payment writes the transaction and the updated due in one
//! atomic batch.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{CoreError, Result};
use crate::model::{
    Customer, CustomerId, DueItem, PaymentRecord, PaymentTransaction, PromiseRecord, PromiseStatus,
};
use crate::store::{collections, BatchOp, DocumentStore, QueryConstraint};
use crate::sync::ContentSyncService;

/// Collection holding promise records; lives alongside the collections the
/// store names, populated only by this layer.
const PROMISES: &str = "promises";

/// Repository for dues, payments, and promises.
pub struct DueRepository {
    sync: Arc<ContentSyncService>,
}

impl DueRepository {
    pub fn new(sync: Arc<ContentSyncService>) -> Self {
        Self { sync }
    }

    /// Persist a customer.
    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        self.sync
            .batch_operation(vec![BatchOp::set(
                collections::CUSTOMERS,
                customer.id.as_str(),
                serde_json::to_value(customer)?,
            )])
            .await
    }

    /// Persist a due.
    pub async fn save_due(&self, due: &DueItem) -> Result<()> {
        self.sync
            .batch_operation(vec![BatchOp::set(
                collections::DUES,
                due.id.as_str(),
                serde_json::to_value(due)?,
            )])
            .await
    }

    /// All dues of a customer, soonest due date first.
    #[instrument(skip(self))]
    pub async fn dues_for_customer(&self, customer_id: &CustomerId) -> Result<Vec<DueItem>> {
        let docs = self
            .sync
            .fetch_collection(
                collections::DUES,
                &[
                    QueryConstraint::where_eq("customer_id", customer_id.as_str()),
                    QueryConstraint::order_by_asc("due_date"),
                ],
            )
            .await?;
        Ok(docs
            .iter()
            .filter_map(|doc| doc.deserialize::<DueItem>().ok())
            .collect())
    }

    /// Load one due, failing with `DocumentNotFound` when absent.
    pub async fn get_due(&self, due_id: &str) -> Result<DueItem> {
        let store = self.sync_store()?;
        store
            .get_document(collections::DUES, due_id)
            .await?
            .ok_or_else(|| CoreError::not_found(collections::DUES, due_id))?
            .deserialize()
    }

    /// Record a payment against a due.
    ///
    /// Writes the payment transaction and the updated due in one atomic
    /// batch; the due moves to partial or paid and its embedded history
    /// grows by one record. Returns the updated due.
    #[instrument(skip(self, transaction), fields(due_id = %transaction.due_id))]
    pub async fn record_payment(&self, transaction: PaymentTransaction) -> Result<DueItem> {
        let mut due = self.get_due(transaction.due_id.as_str()).await?;
        due.apply_payment(PaymentRecord {
            amount: transaction.amount,
            paid_at: transaction.paid_at,
            method: transaction.method.clone(),
            note: None,
        });

        self.sync
            .batch_operation(vec![
                BatchOp::set(
                    collections::PAYMENTS,
                    transaction.id.as_str(),
                    serde_json::to_value(&transaction)?,
                ),
                BatchOp::set(
                    collections::DUES,
                    due.id.as_str(),
                    serde_json::to_value(&due)?,
                ),
            ])
            .await?;

        debug!(status = ?due.status, outstanding = due.outstanding(), "Payment recorded");
        Ok(due)
    }

    /// Mark every open due with a past due date as overdue. Returns the
    /// updated dues.
    #[instrument(skip(self))]
    pub async fn overdue_sweep(&self, now: DateTime<Utc>) -> Result<Vec<DueItem>> {
        let store = self.sync_store()?;
        let docs = store.query(collections::DUES, &[]).await?;

        let mut flipped = Vec::new();
        let mut ops = Vec::new();
        for doc in &docs {
            let Ok(mut due) = doc.deserialize::<DueItem>() else {
                continue;
            };
            if due.mark_overdue_if_past(now) {
                ops.push(BatchOp::set(
                    collections::DUES,
                    due.id.as_str(),
                    serde_json::to_value(&due)?,
                ));
                flipped.push(due);
            }
        }

        if !ops.is_empty() {
            self.sync.batch_operation(ops).await?;
        }
        Ok(flipped)
    }

    /// Record a customer's promise to pay.
    pub async fn save_promise(&self, promise: &PromiseRecord) -> Result<()> {
        self.sync
            .batch_operation(vec![BatchOp::set(
                PROMISES,
                promise.id.as_str(),
                serde_json::to_value(promise)?,
            )])
            .await
    }

    /// Resolve a promise as kept or broken.
    pub async fn resolve_promise(&self, promise: &mut PromiseRecord, kept: bool) -> Result<()> {
        promise.status = if kept {
            PromiseStatus::Kept
        } else {
            PromiseStatus::Broken
        };
        self.save_promise(promise).await
    }

    fn sync_store(&self) -> Result<&Arc<dyn DocumentStore>> {
        self.sync.store_handle().get()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
