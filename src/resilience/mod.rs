//! Resilience patterns for calls to external services
//!
//! # Available Patterns
//!
//! - **Circuit Breaker**: stops calling a failing dependency for a cooldown
//!   period and probes recovery afterwards.
//! - **Retry**: bounded attempts with exponential (or linear/constant) backoff.
//!
//! Both read time through [`Clock`] / [`Sleeper`] so tests can run them on a
//! manual clock.
//!
//! # Example
//!
//! ```rust
//! use flyer_geocoder::resilience::{CircuitBreaker, RetryPolicy, TokioSleeper};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cb = CircuitBreaker::new("geocoder".to_string());
//! let retry = RetryPolicy::default();
//!
//! let result = cb
//!     .call(retry.execute(&TokioSleeper, |_attempt| async {
//!         Ok::<_, std::io::Error>(())
//!     }))
//!     .await;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

mod circuit_breaker;
mod clock;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitSnapshot, CircuitState,
};
pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};
pub use retry::{Backoff, RetryError, RetryPolicy};
