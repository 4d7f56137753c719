use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ConfigError, Validate};
use crate::resilience::{self as runtime, Backoff, RetryPolicy};

/// Resilience configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResilienceConfig {
    /// Circuit breaker configuration
    #[serde(default = "CircuitBreakerConfig::default")]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Retry configuration
    #[serde(default = "RetryConfig::default")]
    pub retry: RetryConfig,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failed resolutions before opening the circuit
    #[serde(default = "default_circuit_breaker_threshold")]
    pub threshold: u32,
    /// Cooldown in seconds before an open circuit lets a probe through
    #[serde(default = "default_circuit_breaker_timeout")]
    pub timeout: u64,
    /// Number of successful probes needed to close the circuit
    #[serde(default = "default_circuit_breaker_success_threshold")]
    pub success_threshold: u32,
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per resolution
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    /// Backoff strategy
    #[serde(default = "default_retry_backoff")]
    pub backoff: RetryBackoff,
    /// Initial delay in milliseconds
    #[serde(default = "default_retry_initial_delay")]
    pub initial_delay: u64,
    /// Maximum delay in milliseconds
    #[serde(default = "default_retry_max_delay")]
    pub max_delay: u64,
    /// Multiplier for exponential backoff
    #[serde(default = "default_retry_multiplier")]
    pub multiplier: f64,
}

/// Retry backoff strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryBackoff {
    /// Exponential backoff (delay *= multiplier)
    Exponential,
    /// Linear backoff (delay += initial_delay)
    Linear,
    /// Constant backoff (delay = initial_delay)
    Constant,
}

// Default functions for CircuitBreakerConfig
fn default_circuit_breaker_threshold() -> u32 {
    3
}

fn default_circuit_breaker_timeout() -> u64 {
    60 // 1 minute
}

fn default_circuit_breaker_success_threshold() -> u32 {
    2
}

// Default functions for RetryConfig
fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> RetryBackoff {
    RetryBackoff::Exponential
}

fn default_retry_initial_delay() -> u64 {
    1000 // milliseconds
}

fn default_retry_max_delay() -> u64 {
    30000 // milliseconds
}

fn default_retry_multiplier() -> f64 {
    2.0
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: default_circuit_breaker_threshold(),
            timeout: default_circuit_breaker_timeout(),
            success_threshold: default_circuit_breaker_success_threshold(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            backoff: default_retry_backoff(),
            initial_delay: default_retry_initial_delay(),
            max_delay: default_retry_max_delay(),
            multiplier: default_retry_multiplier(),
        }
    }
}

impl From<&CircuitBreakerConfig> for runtime::CircuitBreakerConfig {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.threshold,
            success_threshold: config.success_threshold,
            timeout: Duration::from_secs(config.timeout),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Backoff {
                strategy: config.backoff,
                initial_delay: Duration::from_millis(config.initial_delay),
                max_delay: Duration::from_millis(config.max_delay),
                multiplier: config.multiplier,
            },
        }
    }
}

impl Validate for ResilienceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.circuit_breaker.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

impl Validate for CircuitBreakerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::ValidationError("resilience.circuit_breaker.threshold must be > 0".to_string()));
        }
        if self.timeout == 0 {
            return Err(ConfigError::ValidationError("resilience.circuit_breaker.timeout must be > 0".to_string()));
        }
        if self.success_threshold == 0 {
            return Err(ConfigError::ValidationError("resilience.circuit_breaker.success_threshold must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Validate for RetryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationError("resilience.retry.max_attempts must be > 0".to_string()));
        }
        if self.initial_delay == 0 {
            return Err(ConfigError::ValidationError("resilience.retry.initial_delay must be > 0".to_string()));
        }
        if self.max_delay == 0 {
            return Err(ConfigError::ValidationError("resilience.retry.max_delay must be > 0".to_string()));
        }
        if self.initial_delay > self.max_delay {
            return Err(ConfigError::ValidationError("resilience.retry.initial_delay must be <= max_delay".to_string()));
        }
        if !(self.multiplier > 0.0) || !self.multiplier.is_finite() {
            return Err(ConfigError::ValidationError("resilience.retry.multiplier must be a finite value > 0.0".to_string()));
        }
        Ok(())
    }
}
