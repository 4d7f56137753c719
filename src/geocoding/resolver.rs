use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::metrics::GeocoderMetrics;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState, Clock, RetryError,
    RetryPolicy, Sleeper, SystemClock, TokioSleeper,
};

use super::{Coordinates, GeocodeProvider, LookupError, ResolutionError};

/// Settings fixed for the lifetime of a resolver
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub retry: RetryPolicy,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Timeout handed to every provider lookup
    pub lookup_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&AppConfig> for ResolverConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            retry: RetryPolicy::from(&config.resilience.retry),
            circuit_breaker: CircuitBreakerConfig::from(&config.resilience.circuit_breaker),
            lookup_timeout: Duration::from_secs(config.geocoder.timeout),
        }
    }
}

/// Resolves addresses through a [`GeocodeProvider`], retrying transient
/// errors and failing fast while the provider is considered down
///
/// Each resolver owns its own circuit breaker, so one resolver per backend
/// keeps their health independent.
///
/// # Example
///
/// ```rust,no_run
/// use flyer_geocoder::geocoding::{NominatimProvider, ResilientResolver};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = ResilientResolver::new("nominatim", NominatimProvider::default());
/// let coordinates = resolver.resolve("Bahnhofstrasse 1, 8001 Zürich").await?;
/// println!("{}", coordinates);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ResilientResolver<P> {
    provider: P,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    lookup_timeout: Duration,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    metrics: GeocoderMetrics,
}

impl<P: GeocodeProvider> ResilientResolver<P> {
    pub fn new(name: impl Into<String>, provider: P) -> Self {
        Self::with_config(name, provider, ResolverConfig::default())
    }

    pub fn with_config(name: impl Into<String>, provider: P, config: ResolverConfig) -> Self {
        Self::with_runtime(
            name,
            provider,
            config,
            Arc::new(SystemClock),
            Arc::new(TokioSleeper),
        )
    }

    /// Build a resolver with explicit time sources
    pub fn with_runtime(
        name: impl Into<String>,
        provider: P,
        config: ResolverConfig,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let name = name.into();
        let metrics = GeocoderMetrics::new(&name);
        let breaker = CircuitBreaker::with_clock(name, config.circuit_breaker, Arc::clone(&clock));
        metrics.set_circuit_state(breaker.state());

        Self {
            provider,
            breaker,
            retry: config.retry,
            lookup_timeout: config.lookup_timeout,
            clock,
            sleeper,
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        self.breaker.name()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Resolve `address` to coordinates
    ///
    /// The breaker sees one outcome per call, however many lookups the retry
    /// loop made. An empty answer is not retried but still counts as a breaker
    /// failure.
    pub async fn resolve(&self, address: &str) -> Result<Coordinates, ResolutionError> {
        let started = self.clock.now();

        let result = match self.breaker.call(self.resolve_with_retry(address)).await {
            Ok(coordinates) => Ok(coordinates),
            Err(CircuitBreakerError::Open { name }) => Err(ResolutionError::CircuitOpen { name }),
            Err(CircuitBreakerError::Inner(err)) => Err(err),
        };

        let elapsed = self.clock.now().saturating_duration_since(started);
        let state = self.breaker.state();
        self.metrics.set_circuit_state(state);

        match &result {
            Ok(coordinates) => {
                self.metrics.record_resolution("success", elapsed.as_secs_f64());
                tracing::info!(
                    resolver = %self.name(),
                    latitude = coordinates.latitude,
                    longitude = coordinates.longitude,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Address resolved"
                );
            }
            Err(err) => {
                self.metrics.record_resolution(err.kind(), elapsed.as_secs_f64());
                tracing::warn!(
                    resolver = %self.name(),
                    error = %err,
                    circuit_state = %state,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Address resolution failed"
                );
            }
        }

        result
    }

    async fn resolve_with_retry(&self, address: &str) -> Result<Coordinates, ResolutionError> {
        let lookup = self
            .retry
            .execute(self.sleeper.as_ref(), |attempt| async move {
                tracing::trace!(resolver = %self.name(), attempt = attempt + 1, "Geocoding lookup");
                let result = self.provider.lookup(address, self.lookup_timeout).await;
                self.metrics.record_lookup_attempt(lookup_label(&result));
                result
            })
            .await;

        match lookup {
            Ok(Some(location)) => Ok(location.coordinates),
            Ok(None) => Err(ResolutionError::NotFound {
                address: address.to_string(),
            }),
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => Err(ResolutionError::ExhaustedRetries {
                attempts,
                last_error,
            }),
        }
    }
}

fn lookup_label<T>(result: &Result<Option<T>, LookupError>) -> &'static str {
    match result {
        Ok(Some(_)) => "found",
        Ok(None) => "absent",
        Err(LookupError::TimedOut(_)) => "timed_out",
        Err(LookupError::Service(_)) => "service_error",
    }
}
