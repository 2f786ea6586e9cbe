use super::Clock;
use std::time::{Duration, Instant};

/// Spaces successive outbound requests at least `min_interval` apart.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Block until the next request may go out, then mark it as sent.
    /// The first request never waits.
    pub fn acquire(&mut self, clock: &dyn Clock) {
        if let Some(last) = self.last {
            let elapsed = clock.now().saturating_duration_since(last);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(?wait, "rate limiting outbound request");
                clock.sleep(wait);
            }
        }
        self.last = Some(clock.now());
    }
}
