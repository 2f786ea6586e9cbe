use super::Clock;
use crate::error::FetchError;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Bounded exponential backoff for a single source fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// Only [`FetchError::Transient`] failures are retried. The last error is
/// returned when every attempt fails.
pub fn with_retry<T, F>(policy: &RetryPolicy, clock: &dyn Clock, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, ?delay, "retrying after transient failure: {e}");
                clock.sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
