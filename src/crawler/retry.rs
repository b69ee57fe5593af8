//! Retry policy shared by listing and detail fetches
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 429 | Retry, sleep `base + base * 2^attempt * rand[0,1)` |
//! | Request timeout | Retry, sleep `base + base * rand[0,1)` |
//! | Any other HTTP error | Fail immediately |
//! | Any other transport error | Fail immediately |
//!
//! With the default one second base this is `1 + 2^attempt * rand` and
//! `1 + rand` seconds respectively.

use std::fmt;
use std::time::Duration;

/// Why a failed attempt is worth repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Server answered 429 Too Many Requests
    RateLimited,
    /// The request did not complete within the timeout
    Timeout,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

/// Bounded retry with randomized backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first one
    pub max_attempts: u32,
    /// Unit of the backoff formula
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Classifies an HTTP status; None means the status is not retryable
    pub fn classify_status(status: u16) -> Option<RetryReason> {
        if status == 429 {
            Some(RetryReason::RateLimited)
        } else {
            None
        }
    }

    /// Whether another attempt is allowed after the 0-based `attempt` failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Backoff for the 0-based `attempt` with an explicit jitter in `[0, 1)`
    pub fn delay_with_jitter(&self, reason: RetryReason, attempt: u32, jitter: f64) -> Duration {
        let jitter = jitter.clamp(0.0, 1.0);
        let base = self.base_delay.as_secs_f64();
        let extra = match reason {
            RetryReason::RateLimited => base * 2f64.powi(attempt.min(30) as i32) * jitter,
            RetryReason::Timeout => base * jitter,
        };
        Duration::from_secs_f64(base + extra)
    }

    /// Backoff for the 0-based `attempt` with a fresh random jitter
    pub fn delay(&self, reason: RetryReason, attempt: u32) -> Duration {
        let jitter: f64 = rand::random();
        self.delay_with_jitter(reason, attempt, jitter)
    }
}
