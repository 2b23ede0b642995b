//! src/services/rate_limit.rs
//!
//! Fixed-window request counter keyed by client identifier. One mutex
//! guards the whole map; contention on the upload endpoint is expected to
//! be low, so no finer-grained locking is warranted. Records for stale
//! identifiers are replaced on their next request but never evicted, which
//! is an accepted limitation of this limiter.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct RateLimitRecord {
    count: u32,
    /// Epoch millis at which the current window expires.
    reset_at: i64,
}

/// Snapshot of an identifier's remaining quota, suitable for response
/// headers and retry hints.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub reset_at: i64,
}

impl RateLimitInfo {
    /// Whole seconds until the window resets, rounded up, never negative.
    pub fn retry_after_secs(&self) -> i64 {
        let delta = self.reset_at - Utc::now().timestamp_millis();
        if delta <= 0 { 0 } else { (delta + 999) / 1000 }
    }
}

/// Shared fixed-window rate limiter. Cloning is cheap and every clone
/// observes the same counters, so a single instance built at startup is
/// handed to all in-flight requests.
#[derive(Clone)]
pub struct RateLimiter {
    records: Arc<Mutex<HashMap<String, RateLimitRecord>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Record a request from `identifier` and report whether it is allowed.
    /// Requests past the window maximum are rejected without incrementing,
    /// so the stored count never exceeds the configured maximum.
    pub async fn allow(&self, identifier: &str) -> bool {
        self.allow_at(identifier, Utc::now().timestamp_millis()).await
    }

    async fn allow_at(&self, identifier: &str, now: i64) -> bool {
        let mut records = self.records.lock().await;
        match records.get_mut(identifier) {
            Some(record) if now <= record.reset_at => {
                if record.count >= self.max_requests {
                    return false;
                }
                record.count += 1;
                true
            }
            _ => {
                records.insert(
                    identifier.to_string(),
                    RateLimitRecord {
                        count: 1,
                        reset_at: now + self.window.as_millis() as i64,
                    },
                );
                true
            }
        }
    }

    /// Quota snapshot for `identifier`. Unknown identifiers report the full
    /// quota with a fresh window starting now; existing records are reported
    /// as-is without checking expiry.
    pub async fn info(&self, identifier: &str) -> RateLimitInfo {
        let records = self.records.lock().await;
        match records.get(identifier) {
            Some(record) => RateLimitInfo {
                remaining: self.max_requests.saturating_sub(record.count),
                reset_at: record.reset_at,
            },
            None => RateLimitInfo {
                remaining: self.max_requests,
                reset_at: Utc::now().timestamp_millis() + self.window.as_millis() as i64,
            },
        }
    }
}
