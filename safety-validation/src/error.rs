use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Guard rejections. Neither is worth retrying before its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyError {
    #[error("validation rate limit exceeded, resets at {reset_time}")]
    RateLimited { reset_time: DateTime<Utc> },

    #[error("circuit breaker open until {cooldown_until}")]
    CircuitOpen { cooldown_until: DateTime<Utc> },
}

impl SafetyError {
    /// Earliest time a new validation can succeed
    pub fn recovery_time(&self) -> DateTime<Utc> {
        match self {
            SafetyError::RateLimited { reset_time } => *reset_time,
            SafetyError::CircuitOpen { cooldown_until } => *cooldown_until,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("pipeline attempt timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("signal calculation failed: {0}")]
    Calculation(String),

    #[error("market data source failed: {0:#}")]
    Source(anyhow::Error),
}

impl PipelineError {
    /// Guard rejections are surfaced immediately, everything else may be retried
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PipelineError::Safety(_))
    }
}
