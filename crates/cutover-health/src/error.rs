//! Errors raised when a health gate gives up.

use std::time::Duration;

use thiserror::Error;

pub type HealthResult<T> = Result<T, HealthError>;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("{project} not healthy after {waited:?}: {last}")]
    TimedOut {
        project: String,
        waited: Duration,
        last: String,
    },

    #[error("smoke test against {target} failed after {attempts} attempt(s): {last}")]
    SmokeFailed {
        target: String,
        attempts: u32,
        last: String,
    },
}
