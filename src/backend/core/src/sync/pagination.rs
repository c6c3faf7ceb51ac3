//! Cursor-based forward pagination.
//!
//! Cursors are opaque URL-safe base64 tokens wrapping the ordering value and
//! document id of the last row on a page. `has_more` is computed by fetching
//! `page_size + 1` rows and trimming the extra, so no count query is needed.
//! There is no backward pagination.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::error::{CoreError, ErrorCode, Result};
use crate::store::{compare_values, Document, OrderDirection};

/// Opaque position of the last document on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Id of the document the cursor points at.
    pub doc_id: String,
    /// Value of the ordering field for that document.
    pub order_value: Value,
}

impl PageCursor {
    /// Cursor for a document under the given ordering field.
    pub fn for_document(doc: &Document, order_by: &str) -> Self {
        Self {
            doc_id: doc.id.clone(),
            order_value: doc.field(order_by).cloned().unwrap_or(Value::Null),
        }
    }

    /// Encode to the opaque token form.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode from the opaque token form.
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|e| {
            CoreError::with_internal(ErrorCode::InvalidInput, "Invalid page cursor", e.to_string())
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::with_internal(ErrorCode::InvalidInput, "Invalid page cursor", e.to_string())
        })
    }
}

/// A forward page request.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// Maximum number of items to return.
    pub page_size: usize,
    /// Resume after this position; `None` starts from the beginning.
    pub cursor: Option<PageCursor>,
    /// Field the result set is ordered by.
    pub order_by: String,
    /// Ordering direction.
    pub direction: OrderDirection,
}

impl PageRequest {
    pub fn new(page_size: usize, order_by: impl Into<String>) -> Self {
        Self {
            page_size,
            cursor: None,
            order_by: order_by.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn descending(mut self) -> Self {
        self.direction = OrderDirection::Desc;
        self
    }

    pub fn after(mut self, cursor: PageCursor) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

/// One page of results.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Document>,
    /// True iff the underlying fetch produced `page_size + 1` rows.
    pub has_more: bool,
    /// Cursor for the next page; present only when `has_more`.
    pub next_cursor: Option<PageCursor>,
}

/// Slice one page out of an ordered document list.
///
/// `docs` must already be ordered by `order_by`/`direction` (with id as the
/// tiebreak, as `apply_constraints` produces). Returns at most `page_size`
/// items.
pub fn paginate(docs: Vec<Document>, request: &PageRequest) -> Page {
    let start = match &request.cursor {
        Some(cursor) => docs
            .iter()
            .position(|d| is_after_cursor(d, cursor, request))
            .unwrap_or(docs.len()),
        None => 0,
    };

    // Fetch one extra row to learn whether another page exists.
    let mut items: Vec<Document> = docs
        .into_iter()
        .skip(start)
        .take(request.page_size + 1)
        .collect();
    let has_more = items.len() > request.page_size;
    if has_more {
        items.truncate(request.page_size);
    }

    let next_cursor = if has_more {
        items
            .last()
            .map(|d| PageCursor::for_document(d, &request.order_by))
    } else {
        None
    };

    Page {
        items,
        has_more,
        next_cursor,
    }
}

/// Whether `doc` sorts strictly after the cursor position.
fn is_after_cursor(doc: &Document, cursor: &PageCursor, request: &PageRequest) -> bool {
    let value = doc.field(&request.order_by).cloned().unwrap_or(Value::Null);
    let ord = compare_values(&value, &cursor.order_value);
    let ord = match request.direction {
        OrderDirection::Asc => ord,
        OrderDirection::Desc => ord.reverse(),
    };
    match ord {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => doc.id > cursor.doc_id,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
