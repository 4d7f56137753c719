use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::resilience::CircuitState;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INSTALL_LOCK: Mutex<()> = Mutex::new(());

/// Per-resolver metrics recorded through the `metrics` facade
///
/// Recording is a no-op until a recorder is installed, e.g. with
/// [`GeocoderMetrics::install_prometheus`].
#[derive(Debug, Clone)]
pub struct GeocoderMetrics {
    resolver: String,
}

impl GeocoderMetrics {
    pub fn new(resolver: impl Into<String>) -> Self {
        Self {
            resolver: resolver.into(),
        }
    }

    /// Install the process-wide Prometheus recorder (once) and return its handle
    pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
        if let Some(handle) = PROMETHEUS_HANDLE.get() {
            return Ok(handle.clone());
        }

        let _guard = INSTALL_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = PROMETHEUS_HANDLE.get() {
            return Ok(handle.clone());
        }

        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("geocoder_resolution_duration_seconds".to_string()),
                &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0],
            )?
            .install_recorder()?;

        Self::describe_metrics();

        Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
    }

    /// Prometheus exposition text, empty when no recorder was installed
    pub fn render() -> String {
        PROMETHEUS_HANDLE
            .get()
            .map(PrometheusHandle::render)
            .unwrap_or_default()
    }

    fn describe_metrics() {
        describe_counter!(
            "geocoder_resolutions_total",
            "Total number of resolve calls by outcome"
        );
        describe_histogram!(
            "geocoder_resolution_duration_seconds",
            "Resolve call duration in seconds, backoff included"
        );
        describe_counter!(
            "geocoder_lookup_attempts_total",
            "Total number of upstream lookups by result"
        );
        describe_gauge!(
            "geocoder_circuit_state",
            "Circuit breaker state (0 closed, 1 half-open, 2 open)"
        );
    }

    pub fn record_resolution(&self, outcome: &'static str, duration_secs: f64) {
        counter!(
            "geocoder_resolutions_total",
            "resolver" => self.resolver.clone(),
            "outcome" => outcome
        )
        .increment(1);

        histogram!(
            "geocoder_resolution_duration_seconds",
            "resolver" => self.resolver.clone()
        )
        .record(duration_secs);
    }

    pub fn record_lookup_attempt(&self, result: &'static str) {
        counter!(
            "geocoder_lookup_attempts_total",
            "resolver" => self.resolver.clone(),
            "result" => result
        )
        .increment(1);
    }

    pub fn set_circuit_state(&self, state: CircuitState) {
        let value = match state {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        };
        gauge!("geocoder_circuit_state", "resolver" => self.resolver.clone()).set(value);
    }
}
