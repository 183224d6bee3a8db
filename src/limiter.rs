use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fixed-window request budget per client address.
///
/// Constructed once at startup and shared through the router state. A key's
/// window starts when it consumes its first point and refills once the
/// window elapses; a denied request never touches the budget.
#[derive(Debug)]
pub struct RateLimiter {
    points: u32,
    window: Duration,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    remaining: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(points: u32, window: Duration) -> Self {
        Self {
            points,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Consume one point for `key` if any remain in the current window.
    pub fn admit(&self, key: IpAddr) -> bool {
        self.admit_at(key, Instant::now())
    }

    fn admit_at(&self, key: IpAddr, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(key).or_insert(Bucket {
            remaining: self.points,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) >= self.window {
            bucket.remaining = self.points;
            bucket.window_start = now;
        }

        if bucket.remaining > 0 {
            bucket.remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(2, Duration::from_secs(60))
    }

    fn key(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_third_request_in_window_denied() {
        let rl = limiter();
        let now = Instant::now();
        let k = key("10.0.0.1");

        assert!(rl.admit_at(k, now));
        assert!(rl.admit_at(k, now + Duration::from_secs(5)));
        assert!(!rl.admit_at(k, now + Duration::from_secs(10)));
    }

    #[test]
    fn test_window_elapse_readmits() {
        let rl = limiter();
        let now = Instant::now();
        let k = key("10.0.0.2");

        assert!(rl.admit_at(k, now));
        assert!(rl.admit_at(k, now));
        assert!(!rl.admit_at(k, now + Duration::from_secs(59)));
        assert!(rl.admit_at(k, now + Duration::from_secs(60)));
    }

    #[test]
    fn test_denial_does_not_consume() {
        let rl = limiter();
        let now = Instant::now();
        let k = key("10.0.0.3");

        assert!(rl.admit_at(k, now));
        assert!(rl.admit_at(k, now));
        assert!(!rl.admit_at(k, now));
        assert!(!rl.admit_at(k, now));

        // a fresh window grants the full budget again
        let later = now + Duration::from_secs(61);
        assert!(rl.admit_at(k, later));
        assert!(rl.admit_at(k, later));
        assert!(!rl.admit_at(k, later));
    }

    #[test]
    fn test_keys_are_independent() {
        let rl = limiter();
        let now = Instant::now();

        assert!(rl.admit_at(key("10.0.0.4"), now));
        assert!(rl.admit_at(key("10.0.0.4"), now));
        assert!(!rl.admit_at(key("10.0.0.4"), now));
        assert!(rl.admit_at(key("10.0.0.5"), now));
    }
}
