use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Keyed admission control, injected wherever a component must throttle
/// itself (outgoing notifications, future API surfaces).
pub trait RateLimiter: Send + Sync {
    /// Record an attempt for `key`. Returns `(true, retry_after)` when the
    /// attempt must be refused.
    fn is_limited(&self, key: &str) -> (bool, Option<Duration>);
}

/// Sliding-window limiter: at most `max_attempts` per `window` per key.
pub struct SlidingWindowLimiter {
    max_attempts: usize,
    window: Duration,
    entries: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn check_at(&self, key: &str, now: Instant) -> (bool, Option<Duration>) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let attempts = entries.entry(key.to_string()).or_default();
        let allowed = check_rate_limit(attempts, now, self.window, self.max_attempts);
        if allowed {
            return (false, None);
        }
        let retry_after = attempts
            .first()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now));
        (true, retry_after)
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn is_limited(&self, key: &str) -> (bool, Option<Duration>) {
        self.check_at(key, Instant::now())
    }
}

/// Returns true if the attempt is allowed. Prunes expired entries and
/// records the attempt if allowed.
pub fn check_rate_limit(
    entries: &mut Vec<Instant>,
    now: Instant,
    window: Duration,
    max_attempts: usize,
) -> bool {
    entries.retain(|t| now.saturating_duration_since(*t) < window);
    if entries.len() >= max_attempts {
        return false;
    }
    entries.push(now);
    true
}
