//! Backoff strategies and a bounded retry policy
//!
//! A [`RetryPolicy`] is `max_retries` plus a [`BackoffStrategy`]. Retry `n`
//! (1-based) waits `strategy.calculate_delay(n - 1)`, so the default
//! exponential strategy yields 1s, 2s, 4s, ... capped at `max_delay`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid retry configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryPolicyError {
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: `initial_delay * base^attempt`, capped
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Base 1s, factor 2, capped at one minute.
    pub fn standard() -> Self {
        Self::Exponential {
            initial_delay: Duration::from_secs(1),
            base: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Calculate the delay for the given zero-based attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay = initial_delay.as_millis() as f64 * base.powi(exponent);
                let capped = delay.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }

    fn validate(&self) -> Result<(), RetryPolicyError> {
        match self {
            Self::Fixed(_) => Ok(()),
            Self::Exponential { initial_delay, base, max_delay } => {
                if *base < 1.0 || !base.is_finite() {
                    return Err(RetryPolicyError::InvalidConfiguration {
                        message: format!("exponential base must be >= 1.0, got {base}"),
                    });
                }
                if max_delay < initial_delay {
                    return Err(RetryPolicyError::InvalidConfiguration {
                        message: "max_delay must not be shorter than initial_delay".into(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Bounded retry budget with its backoff strategy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffStrategy) -> Result<Self, RetryPolicyError> {
        backoff.validate()?;
        Ok(Self { max_retries, backoff })
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self { max_retries: 0, backoff: BackoffStrategy::Fixed(Duration::ZERO) }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    /// Same backoff, different budget.
    pub fn with_max_retries(&self, max_retries: u32) -> Self {
        Self { max_retries, backoff: self.backoff.clone() }
    }

    /// Delay before 1-based retry `retry_number`.
    pub fn delay_for_retry(&self, retry_number: u32) -> Duration {
        self.backoff.calculate_delay(retry_number.saturating_sub(1))
    }

    /// Decide what to do after `retries_done` retries have already failed.
    pub fn decide(&self, retries_done: u32) -> RetryDecision {
        if retries_done >= self.max_retries {
            RetryDecision::Stop
        } else {
            RetryDecision::RetryAfter(self.delay_for_retry(retries_done + 1))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, backoff: BackoffStrategy::standard() }
    }
}
