// Rate limiting for transaction submission.
//
// Token bucket per sender address, shared across requests. Keyed by the
// transaction's `from` rather than the socket address so one account cannot
// flood the pending pool from many connections.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chain::Address;

struct SenderBucket {
    tokens: f64,
    refilled_at: Instant,
}

impl SenderBucket {
    fn full(burst: f64, now: Instant) -> Self {
        Self {
            tokens: burst,
            refilled_at: now,
        }
    }

    fn take(&mut self, now: Instant, per_sec: f64, burst: f64) -> bool {
        let idle = now.duration_since(self.refilled_at).as_secs_f64();
        self.tokens = burst.min(self.tokens + idle * per_sec);
        self.refilled_at = now;
        if self.tokens < 1.0 {
            return false;
        }
        self.tokens -= 1.0;
        true
    }
}

/// Per-sender limiter. Clones share the same buckets.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<Address, SenderBucket>>,
    per_sec: f64,
    burst: f64,
}

impl RateLimiter {
    /// `per_sec` submissions sustained, up to `burst` at once.
    pub fn new(per_sec: f64, burst: f64) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            per_sec,
            burst,
        }
    }

    /// Spend one token for `sender`. False means the submission is refused.
    pub fn check(&self, sender: Address) -> bool {
        let now = Instant::now();
        self.buckets
            .entry(sender)
            .or_insert_with(|| SenderBucket::full(self.burst, now))
            .take(now, self.per_sec, self.burst)
    }

    /// Forget senders that have not submitted for `idle_secs`.
    pub fn purge_idle(&self, idle_secs: u64) {
        let max_idle = Duration::from_secs(idle_secs);
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.refilled_at) < max_idle);
    }

    pub fn tracked_senders(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_refuse() {
        let limiter = RateLimiter::new(0.001, 3.0);
        let sender = Address::from_seed("alice");
        assert!(limiter.check(sender));
        assert!(limiter.check(sender));
        assert!(limiter.check(sender));
        assert!(!limiter.check(sender));
    }

    #[test]
    fn test_senders_have_separate_buckets() {
        let limiter = RateLimiter::new(0.001, 1.0);
        assert!(limiter.check(Address::from_seed("alice")));
        assert!(!limiter.check(Address::from_seed("alice")));
        assert!(limiter.check(Address::from_seed("bob")));
        assert_eq!(limiter.tracked_senders(), 2);
    }

    #[test]
    fn test_purge_idle_keeps_recent() {
        let limiter = RateLimiter::new(1.0, 1.0);
        limiter.check(Address::from_seed("alice"));
        limiter.purge_idle(3600);
        assert_eq!(limiter.tracked_senders(), 1);
        limiter.purge_idle(0);
        assert_eq!(limiter.tracked_senders(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let limiter = RateLimiter::new(0.001, 1.0);
        let clone = limiter.clone();
        assert!(limiter.check(Address::from_seed("alice")));
        assert!(!clone.check(Address::from_seed("alice")));
    }
}
