//! `poll_until` — the one bounded retry loop every gate uses.
//!
//! A check runs immediately, then once per `interval` until it succeeds or
//! `max_attempts` checks have failed. The loop sleeps between attempts only,
//! never after the last one.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

/// How often and how many times to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// A fixed number of attempts, `interval` apart.
    pub fn attempts(max_attempts: u32, interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Keep checking every `interval` until `ceiling` has elapsed.
    ///
    /// A 180s ceiling at 10s intervals checks at t=0, 10, ..., 180.
    pub fn ceiling(ceiling: Duration, interval: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let waits = ceiling.as_millis() / interval_ms;
        Self {
            interval,
            max_attempts: u32::try_from(waits).unwrap_or(u32::MAX - 1) + 1,
        }
    }

    /// Total time spent sleeping if every attempt fails.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// A successful check.
#[derive(Debug, Clone, PartialEq)]
pub struct Polled<T> {
    pub value: T,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// The retry budget ran out.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub elapsed: Duration,
    /// Error from the final attempt.
    pub last: E,
}

/// Run `check` until it returns `Ok` or the policy is exhausted.
///
/// `check` receives the 1-based attempt number.
pub async fn poll_until<T, E, F, Fut>(
    label: &str,
    policy: PollPolicy,
    mut check: F,
) -> Result<Polled<T>, Exhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let mut attempt = 1;

    loop {
        match check(attempt).await {
            Ok(value) => {
                debug!(check = label, attempt, "check passed");
                return Ok(Polled {
                    value,
                    attempts: attempt,
                    elapsed: started.elapsed(),
                });
            }
            Err(e) if attempt >= policy.max_attempts => {
                return Err(Exhausted {
                    attempts: attempt,
                    elapsed: started.elapsed(),
                    last: e,
                });
            }
            Err(e) => {
                info!(
                    check = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    retry_in = ?policy.interval,
                    error = %e,
                    "check not passing yet"
                );
                tokio::time::sleep(policy.interval).await;
                attempt += 1;
            }
        }
    }
}
