use std::time::Duration;

/// Transient failure of a single lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Geocoding service timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Geocoding service error: {0}")]
    Service(String),
}

/// Why `resolve` produced no coordinates
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// The breaker rejected the call; no lookup was made
    #[error("Circuit breaker is open")]
    CircuitOpen { name: String },
    /// The service answered without a match
    #[error("Could not geocode address: {address}")]
    NotFound { address: String },
    /// Every attempt failed with a transient error
    #[error("Failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        last_error: LookupError,
    },
}

impl ResolutionError {
    /// Label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::CircuitOpen { .. } => "circuit_open",
            ResolutionError::NotFound { .. } => "not_found",
            ResolutionError::ExhaustedRetries { .. } => "exhausted_retries",
        }
    }
}
