//! Bounded, queryable security event trail.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{info, warn};

/// Default ring capacity.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// A single audit event. Never mutated after append.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Action tag, e.g. "webhook_request", "rate_limit", "auth".
    pub action: String,
    /// Request identifier, typically the client address.
    pub identifier: String,
    pub success: bool,
    /// Free-form structured details.
    pub details: serde_json::Value,
    pub error: Option<String>,
}

/// Append-only fixed-capacity ring of audit entries.
///
/// `log` always succeeds; auditing must never fail the request path. Oldest
/// entries are evicted once capacity is exceeded.
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLog {
    /// Create a ring with the given capacity.
    ///
    /// # Panics
    /// Panics when `capacity` is zero; that is a programming invariant
    /// violation and must fail at construction, not at request time.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "audit ring capacity must be positive");
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Append an event, evicting the oldest entry when full.
    pub fn log(
        &self,
        action: &str,
        identifier: &str,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            action: action.to_string(),
            identifier: identifier.to_string(),
            success,
            details,
            error,
        };

        if success {
            info!(action, identifier, "AUDIT: success");
        } else {
            warn!(action, identifier, error = ?entry.error, "AUDIT: failure");
        }

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent `count` entries, most-recent-first.
    pub fn recent(&self, count: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock();
        entries.iter().rev().take(count).cloned().collect()
    }

    /// Most recent `count` entries for one identifier, most-recent-first.
    pub fn by_identifier(&self, identifier: &str, count: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock();
        entries
            .iter()
            .rev()
            .filter(|e| e.identifier == identifier)
            .take(count)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_and_recent_most_recent_first() {
        let log = AuditLog::new(10);
        log.log("auth", "1.2.3.4", true, json!({}), None);
        log.log("webhook_request", "1.2.3.4", false, json!({"n": 2}), Some("boom".to_string()));

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "webhook_request");
        assert!(!recent[0].success);
        assert_eq!(recent[0].error.as_deref(), Some("boom"));
        assert_eq!(recent[1].action, "auth");
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let log = AuditLog::new(3);
        for i in 0..5 {
            log.log("tick", "id", true, json!({ "i": i }), None);
        }

        assert_eq!(log.len(), 3);
        let recent = log.recent(10);
        assert_eq!(recent[0].details["i"], 4);
        assert_eq!(recent[2].details["i"], 2);
    }

    #[test]
    fn test_filter_by_identifier() {
        let log = AuditLog::new(10);
        log.log("a", "alice", true, json!({}), None);
        log.log("b", "bob", true, json!({}), None);
        log.log("c", "alice", false, json!({}), None);

        let alice = log.by_identifier("alice", 10);
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].action, "c");
        assert_eq!(alice[1].action, "a");
        assert!(log.by_identifier("carol", 10).is_empty());
    }

    #[test]
    fn test_recent_respects_count() {
        let log = AuditLog::new(100);
        for _ in 0..50 {
            log.log("tick", "id", true, json!({}), None);
        }
        assert_eq!(log.recent(7).len(), 7);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_fails_fast() {
        let _ = AuditLog::new(0);
    }
}
