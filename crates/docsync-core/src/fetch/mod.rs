//! Remote source retrieval.
//!
//! Provides the `Fetcher` boundary, the blocking `HttpFetcher`, a `Clock`
//! abstraction, the politeness `RateLimiter`, and bounded retry with
//! exponential backoff. Everything here blocks the calling thread; the sync
//! pass issues one request at a time.

pub mod rate_limit;
pub mod retry;

pub use rate_limit::RateLimiter;
pub use retry::{with_retry, RetryPolicy};

use crate::error::{FetchError, Result};
use reqwest::StatusCode;
use std::time::{Duration, Instant};

pub trait Fetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Time source for rate limiting and backoff.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| classify_request_error(url, &e))?;

        let status = resp.status();
        if !status.is_success() {
            let message = format!("HTTP {status}");
            return Err(if is_transient_status(status) {
                FetchError::Transient {
                    url: url.to_string(),
                    message,
                }
            } else {
                FetchError::Permanent {
                    url: url.to_string(),
                    message,
                }
            });
        }

        let body = resp.bytes().map_err(|e| FetchError::Transient {
            url: url.to_string(),
            message: format!("reading body: {e}"),
        })?;
        Ok(body.to_vec())
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn classify_request_error(url: &str, e: &reqwest::Error) -> FetchError {
    let message = e.to_string();
    if e.is_builder() {
        FetchError::Permanent {
            url: url.to_string(),
            message,
        }
    } else {
        // Timeouts, refused connections and resets all deserve another try.
        FetchError::Transient {
            url: url.to_string(),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------
