//! Circuit breaker guarding calls to an external dependency.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐
//! │ Closed  │ ◄──────────────────┐
//! │ (Normal)│                    │
//! └────┬────┘                    │
//!      │ failure_threshold       │ success_threshold
//!      │ consecutive failures    │ consecutive successes
//!      ▼                         │
//! ┌─────────┐    timeout    ┌────┴──────┐
//! │  Open   │───────────────► HalfOpen  │
//! │(Failing)│                │ (Testing) │
//! └─────────┘◄───────────────└───────────┘
//!                any failure
//! ```
//!
//! The Open → HalfOpen transition is lazy: it only happens when a call arrives
//! after the timeout has elapsed since the last recorded failure. There is no
//! background timer.
//!
//! # Example
//!
//! ```rust
//! use flyer_geocoder::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CircuitBreakerConfig {
//!     failure_threshold: 3,
//!     success_threshold: 2,
//!     timeout: Duration::from_secs(60),
//! };
//! let cb = CircuitBreaker::with_config("nominatim".to_string(), config);
//!
//! let result = cb.call(async {
//!     Ok::<_, std::io::Error>((47.3769, 8.5417))
//! }).await;
//!
//! match result {
//!     Ok(coordinates) => println!("Resolved: {:?}", coordinates),
//!     Err(e) => println!("Failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, allowing all requests through
    Closed,
    /// Failing state, rejecting all requests until timeout expires
    Open,
    /// Testing state, allowing requests through to check if the service recovered
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,
    /// Number of consecutive successes before closing circuit from half-open state
    pub success_threshold: u32,
    /// Cooldown before an open circuit lets a probe call through
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Circuit breaker error
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting requests
    #[error("Circuit breaker is open for {name}")]
    Open { name: String },
    /// The underlying operation failed
    #[error("Operation failed: {0}")]
    Inner(#[source] E),
}

/// Point-in-time view of the breaker's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    /// Only meaningful while HalfOpen
    pub consecutive_successes: u32,
    /// Calls that were let through and completed
    pub total_calls: u64,
    pub total_failures: u64,
    /// Calls rejected while Open
    pub total_rejections: u64,
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
    total_calls: u64,
    total_failures: u64,
    total_rejections: u64,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure: None,
            total_calls: 0,
            total_failures: 0,
            total_rejections: 0,
        }
    }

    fn elapsed_since_failure(&self, now: Instant) -> Duration {
        match self.last_failure {
            Some(at) => now.saturating_duration_since(at),
            None => Duration::MAX,
        }
    }
}

/// Circuit breaker protecting a single dependency
///
/// All state transitions happen under one mutex, which is never held while the
/// protected operation runs. Clones share the same circuit, so a breaker can be
/// handed to several tasks that talk to the same backend.
#[derive(Clone)]
pub struct CircuitBreaker {
    /// Name for logging and debugging
    name: String,
    circuit: Arc<Mutex<Circuit>>,
    clock: Arc<dyn Clock>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default configuration
    pub fn new(name: String) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom configuration
    pub fn with_config(name: String, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create a new circuit breaker reading time from `clock`
    pub fn with_clock(name: String, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            circuit: Arc::new(Mutex::new(Circuit::new())),
            clock,
            config,
        }
    }

    /// Get the current state of the circuit breaker
    ///
    /// This does not apply the lazy Open → HalfOpen transition; an open
    /// circuit whose timeout has elapsed still reports `Open` until a call
    /// arrives.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Get the circuit breaker name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let circuit = self.lock();
        CircuitSnapshot {
            state: circuit.state,
            consecutive_failures: circuit.consecutive_failures,
            consecutive_successes: circuit.consecutive_successes,
            total_calls: circuit.total_calls,
            total_failures: circuit.total_failures,
            total_rejections: circuit.total_rejections,
        }
    }

    /// Get failure rate (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        let circuit = self.lock();
        if circuit.total_calls == 0 {
            return 0.0;
        }
        circuit.total_failures as f64 / circuit.total_calls as f64
    }

    /// Execute an operation protected by the circuit breaker
    ///
    /// # State Transitions
    ///
    /// - **Closed → Open**: When consecutive_failures >= failure_threshold
    /// - **Open → HalfOpen**: When a call arrives `timeout` after the last failure
    /// - **HalfOpen → Closed**: When consecutive_successes >= success_threshold
    /// - **HalfOpen → Open**: On any failure
    ///
    /// A rejected call never polls `f` and is not counted as a failure.
    pub async fn call<F, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            return Err(CircuitBreakerError::Open {
                name: self.name.clone(),
            });
        }

        match f.await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    /// Manually reset the circuit breaker to Closed state
    ///
    /// Consecutive counters are cleared; lifetime totals are kept.
    pub fn reset(&self) {
        let mut circuit = self.lock();
        circuit.state = CircuitState::Closed;
        circuit.consecutive_failures = 0;
        circuit.consecutive_successes = 0;
        tracing::info!(
            circuit_breaker = %self.name,
            "Circuit breaker manually reset to Closed"
        );
    }

    /// Decide whether a call may proceed, applying the lazy Open → HalfOpen
    /// transition once the timeout has elapsed.
    fn admit(&self) -> bool {
        let now = self.clock.now();
        let mut circuit = self.lock();

        if circuit.state != CircuitState::Open {
            return true;
        }

        let elapsed = circuit.elapsed_since_failure(now);
        if elapsed >= self.config.timeout {
            circuit.state = CircuitState::HalfOpen;
            circuit.consecutive_successes = 0;
            tracing::info!(
                circuit_breaker = %self.name,
                state = "Open -> HalfOpen",
                elapsed_seconds = elapsed.as_secs(),
                "Circuit breaker transitioning to HalfOpen"
            );
            return true;
        }

        circuit.total_rejections += 1;
        tracing::debug!(
            circuit_breaker = %self.name,
            remaining_seconds = self.config.timeout.saturating_sub(elapsed).as_secs(),
            "Circuit breaker rejected call"
        );
        false
    }

    fn on_success(&self) {
        let mut circuit = self.lock();
        circuit.total_calls += 1;
        circuit.consecutive_failures = 0;

        if circuit.state == CircuitState::HalfOpen {
            circuit.consecutive_successes += 1;
            if circuit.consecutive_successes >= self.config.success_threshold {
                circuit.state = CircuitState::Closed;
                circuit.consecutive_successes = 0;
                tracing::info!(
                    circuit_breaker = %self.name,
                    state = "HalfOpen -> Closed",
                    success_threshold = self.config.success_threshold,
                    "Circuit breaker closed after successful recovery"
                );
            }
        }
    }

    fn on_failure(&self) {
        let now = self.clock.now();
        let mut circuit = self.lock();
        circuit.total_calls += 1;
        circuit.total_failures += 1;
        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
        circuit.last_failure = Some(now);

        match circuit.state {
            CircuitState::Closed => {
                if circuit.consecutive_failures >= self.config.failure_threshold {
                    circuit.state = CircuitState::Open;
                    tracing::warn!(
                        circuit_breaker = %self.name,
                        state = "Closed -> Open",
                        consecutive_failures = circuit.consecutive_failures,
                        failure_threshold = self.config.failure_threshold,
                        "Circuit breaker opened due to consecutive failures"
                    );
                }
            }
            CircuitState::HalfOpen => {
                circuit.state = CircuitState::Open;
                circuit.consecutive_successes = 0;
                tracing::warn!(
                    circuit_breaker = %self.name,
                    state = "HalfOpen -> Open",
                    "Circuit breaker re-opened after failure in HalfOpen state"
                );
            }
            // Another caller reopened the circuit while this call was in flight.
            CircuitState::Open => {}
        }
    }

    fn lock(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &snapshot.state)
            .field("consecutive_failures", &snapshot.consecutive_failures)
            .field("consecutive_successes", &snapshot.consecutive_successes)
            .field("total_calls", &snapshot.total_calls)
            .field("total_failures", &snapshot.total_failures)
            .field("config", &self.config)
            .finish()
    }
}
