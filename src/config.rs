//! Configuration management for Turnstile.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TurnstileError};
use crate::ratelimit::RateLimitPolicy;

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:9980".parse().unwrap()
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Requests admitted per window
    #[serde(default = "default_requests")]
    pub requests: u32,

    /// Window length in seconds
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            period_secs: default_period_secs(),
        }
    }
}

fn default_requests() -> u32 {
    RateLimitPolicy::default().requests
}

fn default_period_secs() -> u64 {
    RateLimitPolicy::default().period_secs
}

impl RateLimitSettings {
    /// Convert the settings into the limiter's policy value.
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            requests: self.requests,
            period_secs: self.period_secs,
        }
    }
}

impl TurnstileConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TurnstileConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the limiter cannot operate under.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.requests == 0 {
            return Err(TurnstileError::Config(
                "rate_limit.requests must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.period_secs == 0 {
            return Err(TurnstileError::Config(
                "rate_limit.period_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = TurnstileConfig::default();
        assert_eq!(config.server.listen_addr.port(), 9980);
        assert_eq!(config.rate_limit.requests, 100);
        assert_eq!(config.rate_limit.period_secs, 3600);
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
server:
  listen_addr: 127.0.0.1:8080
rate_limit:
  requests: 5
  period_secs: 60
"#;
        let config = TurnstileConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert_eq!(config.rate_limit.requests, 5);
        assert_eq!(config.rate_limit.period_secs, 60);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let yaml = r#"
rate_limit:
  requests: 10
"#;
        let config = TurnstileConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.listen_addr.port(), 9980);
        assert_eq!(config.rate_limit.requests, 10);
        assert_eq!(config.rate_limit.period_secs, 3600);
    }

    #[test]
    fn zero_valued_limits_are_rejected() {
        let yaml = r#"
rate_limit:
  requests: 0
"#;
        assert!(TurnstileConfig::from_yaml(yaml).is_err());

        let yaml = r#"
rate_limit:
  period_secs: 0
"#;
        assert!(TurnstileConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn settings_convert_to_policy() {
        let settings = RateLimitSettings {
            requests: 7,
            period_secs: 30,
        };
        let policy = settings.policy();
        assert_eq!(policy.requests, 7);
        assert_eq!(policy.period_secs, 30);
    }
}
