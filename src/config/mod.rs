pub mod app;
pub mod geocoder;
pub mod resilience;

pub use app::{AppConfig, AppMetadata, LogFormat, ObservabilityConfig};
pub use geocoder::GeocoderConfig;
pub use resilience::{CircuitBreakerConfig, ResilienceConfig, RetryBackoff, RetryConfig};

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Semantic checks run after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Load the application configuration from files and environment variables
pub fn load() -> Result<AppConfig, ConfigError> {
    app::load_config()
}
