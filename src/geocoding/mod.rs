//! Address geocoding behind a resilient resolver.
//!
//! # Data Flow
//! ```text
//! resolve(address)
//!     → circuit breaker (reject fast while Open)
//!     → retry policy (transient lookup errors, exponential backoff)
//!     → GeocodeProvider::lookup (Nominatim over HTTP, or a test double)
//!     → Coordinates | ResolutionError
//! ```

mod error;
pub mod nominatim;
mod resolver;

pub use error::{LookupError, ResolutionError};
pub use nominatim::NominatimProvider;
pub use resolver::{ResilientResolver, ResolverConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::time::Duration;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Coordinates outside the WGS84 ranges
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("Latitude must be between -90 and 90, got {0}")]
    Latitude(f64),
    #[error("Longitude must be between -180 and 180, got {0}")]
    Longitude(f64),
}

impl Coordinates {
    /// Build validated coordinates
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.latitude, self.longitude)
    }
}

/// A match returned by a geocoding service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: Coordinates,
    /// Human readable name of the match, when the service provides one
    pub display_name: Option<String>,
}

impl Location {
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            display_name: None,
        }
    }
}

/// External "address to location" primitive wrapped by the resolver
///
/// `Ok(None)` means the service answered but found no match. Every `Err` is
/// treated as transient and retried.
#[async_trait(?Send)]
pub trait GeocodeProvider: Debug {
    async fn lookup(&self, address: &str, timeout: Duration) -> Result<Option<Location>, LookupError>;
}
