//! Fixed-window per-IP rate limiting
//!
//! One counter per client IP under `ratelimit:<ip>`. The INCR that creates
//! the counter also starts the window by setting its TTL; later INCRs in the
//! same window leave the TTL alone, so the window resets by expiry. Store
//! failures let the request through: the limiter failing must not black-hole
//! all traffic.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::warn;

use crate::store::{self, KvStore};

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Under the ceiling; proceed
    Allowed,
    /// Over the ceiling; answer with an empty result
    Throttled,
}

/// Fixed-window counter keyed by client IP
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    limit: u32,
    window_secs: u64,
}

impl RateLimiter {
    /// Limiter allowing `limit` requests per `window_secs` window; a limit
    /// of 0 disables limiting
    pub fn new(store: Arc<dyn KvStore>, limit: u32, window_secs: u64) -> Self {
        Self {
            store,
            limit,
            window_secs,
        }
    }

    /// Count this request against `ip`'s window
    pub async fn check(&self, ip: IpAddr) -> Decision {
        if self.limit == 0 {
            return Decision::Allowed;
        }

        let key = format!("ratelimit:{ip}");
        let count = match self.store.incr(&key).await {
            Ok(count) => count,
            Err(e) => {
                store::log_error("incr", &e);
                return Decision::Allowed;
            }
        };

        if count == 1 {
            // first hit of the window starts its TTL; a racing duplicate
            // EXPIRE is harmless
            if let Err(e) = self.store.expire(&key, self.window_secs).await {
                store::log_error("expire", &e);
            }
        }

        if count > i64::from(self.limit) {
            warn!(ip = %ip, count = count, limit = self.limit, "rate_limit_exceeded");
            Decision::Throttled
        } else {
            Decision::Allowed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn ip() -> IpAddr {
        "192.0.2.7".parse().unwrap()
    }

    #[tokio::test]
    async fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), 2, 60);
        assert_eq!(limiter.check(ip()).await, Decision::Allowed);
        assert_eq!(limiter.check(ip()).await, Decision::Allowed);
        assert_eq!(limiter.check(ip()).await, Decision::Throttled);
    }

    #[tokio::test]
    async fn counters_are_per_ip() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), 1, 60);
        assert_eq!(limiter.check(ip()).await, Decision::Allowed);
        assert_eq!(limiter.check(ip()).await, Decision::Throttled);
        let other: IpAddr = "198.51.100.9".parse().unwrap();
        assert_eq!(limiter.check(other).await, Decision::Allowed);
    }

    #[tokio::test]
    async fn zero_limit_disables_the_limiter() {
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::new(store.clone(), 0, 60);
        for _ in 0..50 {
            assert_eq!(limiter.check(ip()).await, Decision::Allowed);
        }
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::new(store.clone(), 1, 1);
        assert_eq!(limiter.check(ip()).await, Decision::Allowed);
        assert_eq!(limiter.check(ip()).await, Decision::Throttled);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(limiter.check(ip()).await, Decision::Allowed);
    }

    #[tokio::test]
    async fn ipv6_keys_are_well_formed() {
        let v6: IpAddr = "::1".parse().unwrap();
        let store = Arc::new(MemoryStore::new());
        let limiter = RateLimiter::new(store.clone(), 5, 60);
        limiter.check(v6).await;
        assert!(store.contains("ratelimit:::1"));
    }
}
