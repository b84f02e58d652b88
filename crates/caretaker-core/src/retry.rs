//! Bounded retry with backoff for flaky external tools.
//!
//! A step that still fails after the last attempt is downgraded to a
//! [`Warning`](crate::outcome::Warning), never an error.

use crate::config::RetryConfig;
use crate::error::Result;
use crate::outcome::{Outcome, Warning};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay after the first failure; grows linearly with each attempt.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            attempts: cfg.attempts.max(1),
            backoff: Duration::from_millis(cfg.backoff_ms),
        }
    }
}

/// Run `op` up to `policy.attempts` times.
///
/// `op` receives the 1-based attempt number. Returns `Some(value)` on the
/// first success; after the final failure returns `None` with a warning
/// naming `step` and the last error.
pub fn with_backoff<T>(
    step: &str,
    policy: RetryPolicy,
    mut op: impl FnMut(u32) -> Result<T>,
) -> Outcome<Option<T>> {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match op(attempt) {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(step, attempt, "succeeded after retry");
                }
                return Outcome::clean(Some(value));
            }
            Err(e) => {
                tracing::debug!(step, attempt, error = %e, "attempt failed");
                last_error = e.to_string();
                if attempt < attempts {
                    std::thread::sleep(policy.backoff * attempt);
                }
            }
        }
    }

    Outcome::degraded(
        None,
        Warning::new(
            step,
            format!("gave up after {attempts} attempt(s): {last_error}"),
        ),
    )
}
