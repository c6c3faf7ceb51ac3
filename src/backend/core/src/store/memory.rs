//! In-process document store.
//!
//! Backs tests and development runs. Writes take a single table lock so a
//! batch commits all-or-nothing; change notices go out only after the lock is
//! released.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::broadcast;
use tracing::debug;

use async_trait::async_trait;

use super::constraint::{apply_constraints, QueryConstraint};
use super::document::Document;
use super::{BatchOp, ChangeNotice, DocumentStore};
use crate::error::{CoreError, ErrorCode, Result};

type Table = BTreeMap<String, Document>;

/// In-memory [`DocumentStore`] implementation.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    channels: DashMap<String, broadcast::Sender<ChangeNotice>>,
    change_buffer: usize,
}

impl MemoryStore {
    /// Create an empty store with the default change-signal buffer.
    pub fn new() -> Self {
        Self::with_change_buffer(64)
    }

    /// Create an empty store with an explicit change-signal buffer size.
    pub fn with_change_buffer(change_buffer: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            channels: DashMap::new(),
            change_buffer: change_buffer.max(1),
        }
    }

    /// Number of documents currently held in a collection.
    pub fn collection_len(&self, collection: &str) -> usize {
        self.tables
            .read()
            .get(collection)
            .map(|t| t.len())
            .unwrap_or(0)
    }

    fn sender(&self, collection: &str) -> broadcast::Sender<ChangeNotice> {
        self.channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(self.change_buffer).0)
            .clone()
    }

    fn notify(&self, collection: &str) {
        if let Some(sender) = self.channels.get(collection) {
            // Send only fails when no receiver is attached, which is fine.
            let _ = sender.send(ChangeNotice {
                collection: collection.to_string(),
            });
        }
    }

    fn notify_all<'a>(&self, collections: impl IntoIterator<Item = &'a str>) {
        for c in collections {
            self.notify(c);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let tables = self.tables.read();
        Ok(tables
            .get(collection)
            .and_then(|t| t.get(id))
            .cloned())
    }

    async fn query(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> Result<Vec<Document>> {
        let docs: Vec<Document> = {
            let tables = self.tables.read();
            tables
                .get(collection)
                .map(|t| t.values().cloned().collect())
                .unwrap_or_default()
        };
        Ok(apply_constraints(docs, constraints))
    }

    async fn set_document(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let doc = Document::from_value(collection, id, data)?;
        {
            let mut tables = self.tables.write();
            tables
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), doc);
        }
        self.notify(collection);
        Ok(())
    }

    async fn update_document(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let patch = match data {
            Value::Object(m) => m,
            _ => {
                return Err(CoreError::new(
                    ErrorCode::InvalidInput,
                    "Update data must be a JSON object",
                ))
            }
        };
        {
            let mut tables = self.tables.write();
            let doc = tables
                .get_mut(collection)
                .and_then(|t| t.get_mut(id))
                .ok_or_else(|| CoreError::not_found(collection, id))?;
            doc.merge(patch);
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        let existed = {
            let mut tables = self.tables.write();
            tables
                .get_mut(collection)
                .map(|t| t.remove(id).is_some())
                .unwrap_or(false)
        };
        if existed {
            self.notify(collection);
        }
        Ok(existed)
    }

    async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let touched: HashSet<String> = ops.iter().map(|op| op.collection().to_string()).collect();

        {
            let mut tables = self.tables.write();

            // Validate every op against current state before mutating anything.
            for op in &ops {
                match op {
                    BatchOp::Set { data, .. } => {
                        if !data.is_object() {
                            return Err(CoreError::with_internal(
                                ErrorCode::BatchRejected,
                                "Batch rejected: set data must be a JSON object",
                                format!("{}/{}", op.collection(), op.doc_id()),
                            ));
                        }
                    }
                    BatchOp::Update {
                        collection,
                        id,
                        data,
                    } => {
                        if !data.is_object() {
                            return Err(CoreError::with_internal(
                                ErrorCode::BatchRejected,
                                "Batch rejected: update data must be a JSON object",
                                format!("{collection}/{id}"),
                            ));
                        }
                        let exists = tables
                            .get(collection.as_str())
                            .map(|t| t.contains_key(id))
                            .unwrap_or(false);
                        if !exists {
                            return Err(CoreError::with_internal(
                                ErrorCode::BatchRejected,
                                "Batch rejected: update target does not exist",
                                format!("{collection}/{id}"),
                            ));
                        }
                    }
                    BatchOp::Delete { .. } => {}
                }
            }

            // Commit.
            for op in ops {
                match op {
                    BatchOp::Set {
                        collection,
                        id,
                        data,
                    } => {
                        let doc = Document::from_value(&collection, &id, data)?;
                        tables.entry(collection).or_default().insert(id, doc);
                    }
                    BatchOp::Update {
                        collection,
                        id,
                        data,
                    } => {
                        let patch = match data {
                            Value::Object(m) => m,
                            _ => unreachable!("validated above"),
                        };
                        if let Some(doc) =
                            tables.get_mut(collection.as_str()).and_then(|t| t.get_mut(&id))
                        {
                            doc.merge(patch);
                        }
                    }
                    BatchOp::Delete { collection, id } => {
                        if let Some(t) = tables.get_mut(collection.as_str()) {
                            t.remove(&id);
                        }
                    }
                }
            }
        }

        debug!(collections = ?touched, "Batch committed");
        self.notify_all(touched.iter().map(String::as_str));
        Ok(())
    }

    fn changes(&self, collection: &str) -> broadcast::Receiver<ChangeNotice> {
        self.sender(collection).subscribe()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
