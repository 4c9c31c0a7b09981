//! Configuration management for Tollgate.

use serde::{Deserialize, Serialize};

/// Main configuration for the Tollgate client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Shared client configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for TollgateConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Shared client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with each request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("tollgate/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum instantaneous requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
        }
    }
}

fn default_requests_per_second() -> f64 {
    1.0
}

impl TollgateConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TollgateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::TollgateError::InvalidConfiguration(e.to_string()))?;
        Ok(config)
    }
}
