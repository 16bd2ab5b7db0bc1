//! Per-identifier request rate limiting.
//!
//! Token-bucket variant over a sliding window: each identifier keeps the
//! timestamps of its admitted requests within the window, and a request is
//! admitted while the count stays under `max_requests + burst_allowance`.
//! Buckets are created lazily and never destroyed except by explicit reset.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::warn;

/// Rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Max requests per window.
    pub max_requests: usize,
    /// Sliding window length.
    pub window: Duration,
    /// Extra requests allowed in a burst.
    pub burst_allowance: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            burst_allowance: 10,
        }
    }
}

/// Snapshot of one identifier's bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStats {
    /// Requests currently inside the window.
    pub requests: usize,
    /// Configured limit excluding burst.
    pub limit: usize,
    /// Admissions left before rejection.
    pub remaining: usize,
    /// Time until the oldest in-window request expires.
    pub reset_after: Duration,
}

/// Sliding-window token bucket keyed by caller identifier.
///
/// Safe under concurrent checks: the map shard lock serializes the
/// read-modify-write on a bucket, so admission is exact — never more than
/// `max_requests + burst_allowance` admissions per window per identifier.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check whether a request from `identifier` is admitted, recording it
    /// when it is. Rejection does not record the attempt.
    pub fn check(&self, identifier: &str) -> bool {
        self.check_at(identifier, Instant::now())
    }

    fn check_at(&self, identifier: &str, now: Instant) -> bool {
        let capacity = self.config.max_requests + self.config.burst_allowance;
        let mut bucket = self.buckets.entry(identifier.to_string()).or_default();

        // Evict timestamps older than the window.
        while let Some(&front) = bucket.front() {
            if now.duration_since(front) >= self.config.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() < capacity {
            bucket.push_back(now);
            true
        } else {
            warn!(
                identifier,
                requests = bucket.len(),
                window_secs = self.config.window.as_secs(),
                max = self.config.max_requests,
                burst = self.config.burst_allowance,
                "Rate limit exceeded"
            );
            false
        }
    }

    /// Current bucket statistics for `identifier`. Read-only.
    pub fn stats(&self, identifier: &str) -> RateLimitStats {
        self.stats_at(identifier, Instant::now())
    }

    fn stats_at(&self, identifier: &str, now: Instant) -> RateLimitStats {
        let capacity = self.config.max_requests + self.config.burst_allowance;
        let (requests, reset_after) = match self.buckets.get(identifier) {
            Some(bucket) => {
                let in_window: Vec<Instant> = bucket
                    .iter()
                    .copied()
                    .filter(|t| now.duration_since(*t) < self.config.window)
                    .collect();
                let reset_after = in_window
                    .first()
                    .map(|oldest| self.config.window - now.duration_since(*oldest))
                    .unwrap_or(Duration::ZERO);
                (in_window.len(), reset_after)
            }
            None => (0, Duration::ZERO),
        };

        RateLimitStats {
            requests,
            limit: self.config.max_requests,
            remaining: capacity.saturating_sub(requests),
            reset_after,
        }
    }

    /// Reset one identifier's bucket, or all buckets when `None`.
    pub fn reset(&self, identifier: Option<&str>) {
        match identifier {
            Some(id) => {
                self.buckets.remove(id);
            }
            None => self.buckets.clear(),
        }
    }
}
