//! Time sources for resilience policies.
//!
//! The circuit breaker reads the current instant through [`Clock`] and the
//! retry loop waits through [`Sleeper`], so both can be driven by a manual
//! clock in tests (see [`crate::testing::ManualClock`]).

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send + Sync + Debug {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Suspends the calling task for a given duration
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Wait for `duration` before returning
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
