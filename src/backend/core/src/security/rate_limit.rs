//! Sliding-window rate limiting per (user, action).
//!
//! State is purely in-memory and resets on process restart. Acceptable only
//! because the target deployment is one process per user session, not a
//! shared server.

use dashmap::DashMap;
use metrics::counter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default request limit per window.
pub const DEFAULT_LIMIT: usize = 100;

/// Default window size.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(60_000);

/// Sliding-window counter keyed by `user:action`.
#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<String, Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call attempt under the default limit and window.
    pub fn check(&self, user_id: &str, action: &str) -> bool {
        self.check_with(user_id, action, DEFAULT_LIMIT, DEFAULT_WINDOW)
    }

    /// Record one call attempt. Timestamps older than `window` are pruned
    /// first; the call is denied once the window already holds `limit`
    /// entries. Denied calls are not recorded.
    pub fn check_with(&self, user_id: &str, action: &str, limit: usize, window: Duration) -> bool {
        let key = format!("{user_id}:{action}");
        let entry = self.windows.entry(key).or_default();
        let mut timestamps = entry.lock();

        let now = Instant::now();
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        let allowed = timestamps.len() < limit;
        if allowed {
            timestamps.push_back(now);
        } else {
            debug!(user_id, action, limit, "Rate limit exceeded");
        }
        counter!("rate_limit_checks_total", "allowed" => if allowed { "true" } else { "false" })
            .increment(1);
        allowed
    }

    /// Number of tracked (user, action) keys.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop keys whose newest timestamp is older than `max_age`.
    pub fn purge_idle(&self, max_age: Duration) {
        let now = Instant::now();
        self.windows.retain(|_, entry| {
            let timestamps = entry.lock();
            timestamps
                .back()
                .map(|last| now.duration_since(*last) < max_age)
                .unwrap_or(false)
        });
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
