use serde::{Deserialize, Serialize};

use super::{ConfigError, Validate};

/// Upstream geocoding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Base URL of the Nominatim instance
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// User agent sent with every request (required by the Nominatim usage policy)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-lookup timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    "PockitFlyer/1.0".to_string()
}

fn default_timeout() -> u64 {
    5
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

impl Validate for GeocoderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError("geocoder.base_url must be an http(s) URL".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::ValidationError("geocoder.user_agent cannot be empty".to_string()));
        }
        if self.timeout == 0 {
            return Err(ConfigError::ValidationError("geocoder.timeout must be > 0".to_string()));
        }
        Ok(())
    }
}
