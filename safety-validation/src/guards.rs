//! Circuit breaker and rate limiter guarding comprehensive validation

use crate::config::{CircuitBreakerConfig, RateLimitConfig};
use crate::error::SafetyError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerStatus {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub opened_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

/// Opens after `failure_threshold` consecutive failed validations
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<DateTime<Utc>>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            failure_threshold: config.failure_threshold.max(1),
            cooldown: Duration::seconds(config.cooldown_seconds.max(0)),
        }
    }

    fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.opened_at.map(|t| t + self.cooldown)
    }

    /// Reject while open; close with a fresh failure count once the cooldown has passed
    pub fn check(&mut self, now: DateTime<Utc>) -> Result<(), SafetyError> {
        if self.state != BreakerState::Open {
            return Ok(());
        }

        match self.cooldown_until() {
            Some(until) if now < until => Err(SafetyError::CircuitOpen {
                cooldown_until: until,
            }),
            _ => {
                info!("Circuit breaker cooldown elapsed - validation resumed");
                self.reset();
                Ok(())
            }
        }
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.consecutive_failures += 1;

        if self.state == BreakerState::Closed && self.consecutive_failures >= self.failure_threshold {
            self.state = BreakerState::Open;
            self.opened_at = Some(now);
            error!(
                consecutive_failures = self.consecutive_failures,
                cooldown_until = ?self.cooldown_until(),
                "Circuit breaker OPEN - validation halted"
            );
        }
    }

    pub fn record_success(&mut self) {
        if self.state != BreakerState::Closed {
            info!("Circuit breaker closed - validation resumed");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        CircuitBreakerStatus {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            opened_at: self.opened_at,
            cooldown_until: self.cooldown_until(),
        }
    }
}

/// Fixed window anchored at the first call after the previous window ended
#[derive(Debug, Clone)]
struct Window {
    length: Duration,
    limit: u32,
    started: Option<DateTime<Utc>>,
    count: u32,
}

impl Window {
    fn new(length: Duration, limit: u32) -> Self {
        Self {
            length,
            limit,
            started: None,
            count: 0,
        }
    }

    fn roll(&mut self, now: DateTime<Utc>) {
        let expired = self.started.map_or(true, |start| now >= start + self.length);
        if expired {
            self.started = Some(now);
            self.count = 0;
        }
    }

    fn reset_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.started.unwrap_or(now) + self.length
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitStatus {
    pub minute_count: u32,
    pub minute_limit: u32,
    pub hour_count: u32,
    pub hour_limit: u32,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    minute: Window,
    hour: Window,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            minute: Window::new(Duration::minutes(1), config.max_per_minute),
            hour: Window::new(Duration::hours(1), config.max_per_hour),
        }
    }

    /// Count one call, or reject it without consuming budget
    pub fn check(&mut self, now: DateTime<Utc>) -> Result<(), SafetyError> {
        self.minute.roll(now);
        self.hour.roll(now);

        for window in [&self.minute, &self.hour] {
            if window.count >= window.limit {
                return Err(SafetyError::RateLimited {
                    reset_time: window.reset_time(now),
                });
            }
        }

        self.minute.count += 1;
        self.hour.count += 1;
        Ok(())
    }

    pub fn status(&self) -> RateLimitStatus {
        RateLimitStatus {
            minute_count: self.minute.count,
            minute_limit: self.minute.limit,
            hour_count: self.hour.count,
            hour_limit: self.hour.limit,
        }
    }
}
