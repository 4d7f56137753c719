//! Bounded retry with backoff.
//!
//! The policy retries every error the operation returns; callers decide what is
//! transient by choosing what to surface as `Err` (an absent geocoding result,
//! for instance, is an `Ok(None)` and ends the loop).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryBackoff;

use super::clock::Sleeper;

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub strategy: RetryBackoff,
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor for exponential backoff
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            strategy: RetryBackoff::Exponential,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// Delay to wait after the failed attempt with zero-based index `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let initial = self.initial_delay.as_secs_f64();
        let seconds = match self.strategy {
            RetryBackoff::Exponential => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                initial * self.multiplier.powi(exponent)
            }
            RetryBackoff::Linear => initial * (f64::from(attempt) + 1.0),
            RetryBackoff::Constant => initial,
        };

        if !seconds.is_finite() || seconds >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

/// How many times an operation is attempted and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

/// Every attempt failed
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("Failed after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        #[source]
        last_error: E,
    },
}

impl RetryPolicy {
    /// Attempts actually made; a zero budget still makes one attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    ///
    /// `operation` receives the zero-based attempt index. After a failed
    /// attempt `i` that is not the last, the policy sleeps `delay_for(i)`;
    /// the final failure returns immediately.
    pub async fn execute<F, Fut, T, E>(
        &self,
        sleeper: &dyn Sleeper,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.attempts();
        let mut attempt = 0;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 >= attempts => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %err,
                        "Retry budget exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        attempts,
                        last_error: err,
                    });
                }
                Err(err) => {
                    let delay = self.backoff.delay_for(attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, backing off"
                    );
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
