//! Access log ring buffer and the derived security audit.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

use super::models::AccessLog;

/// Default number of retained access log entries.
pub const ACCESS_LOG_CAPACITY: usize = 1000;

/// How many recent entries feed the audit score.
const AUDIT_WINDOW: usize = 100;

/// Bounded FIFO ring of access log entries; the oldest entry is dropped once
/// the capacity is reached. A memory bound, not a persistence guarantee.
pub struct AccessLogRing {
    entries: Mutex<VecDeque<AccessLog>>,
    capacity: usize,
}

impl AccessLogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(ACCESS_LOG_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest at capacity.
    pub fn push(&self, entry: AccessLog) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AccessLog> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Derive the audit snapshot.
    ///
    /// The score is `max(0, 100 - 2 * failures_in_last_100)` — a heuristic
    /// kept for compatibility with the existing audit surface.
    pub fn audit(&self) -> SecurityAudit {
        let recent = self.recent(AUDIT_WINDOW);
        let recent_failures = recent.iter().filter(|e| !e.success).count();
        let score = 100_i64.saturating_sub(2 * recent_failures as i64).max(0) as u8;
        SecurityAudit {
            score,
            total_entries: self.len(),
            recent_failures,
            generated_at: Utc::now(),
        }
    }
}

impl Default for AccessLogRing {
    fn default() -> Self {
        Self::new(ACCESS_LOG_CAPACITY)
    }
}

/// Snapshot produced by [`AccessLogRing::audit`].
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAudit {
    /// 0-100; lower means more recent failures.
    pub score: u8,
    pub total_entries: usize,
    pub recent_failures: usize,
    pub generated_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
