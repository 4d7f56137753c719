//! Resilient address geocoding for the flyer feed.
//!
//! The core is [`geocoding::ResilientResolver`]: it wraps an external
//! "address to coordinates" lookup with bounded exponential-backoff retry and a
//! circuit breaker that fails fast while the upstream service is down.

pub mod config;
pub mod geocoding;
pub mod logging;
pub mod metrics;
pub mod resilience;

// Testing utilities (always available for integration tests)
pub mod testing;

// Re-export commonly used types for convenience
pub use geocoding::{
    Coordinates, GeocodeProvider, Location, LookupError, NominatimProvider, ResilientResolver,
    ResolutionError, ResolverConfig,
};
pub use metrics::GeocoderMetrics;
pub use resilience::{CircuitBreaker, CircuitState};
