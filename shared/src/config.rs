use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{BaseUrl, InvalidUrl, DEFAULT_MAX_RESPONSE_BYTES};

pub const DEFAULT_UNKNOWN_LABEL: &str = "unknown";
pub const DEFAULT_RESOLVER_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] InvalidUrl),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Retry a failed path-parameter request in `?parentId=` form.
    #[serde(default = "default_query_fallback")]
    pub query_fallback: bool,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_query_fallback() -> bool {
    true
}

fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            query_fallback: default_query_fallback(),
            max_response_bytes: default_max_response_bytes(),
        }
    }

    #[must_use]
    pub fn without_query_fallback(mut self) -> Self {
        self.query_fallback = false;
        self
    }

    pub fn validate(&self) -> Result<BaseUrl, ConfigError> {
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Validation(
                "max_response_bytes must be > 0".into(),
            ));
        }
        Ok(BaseUrl::new(self.base_url.as_str())?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Shown for any level whose name could not be resolved.
    pub unknown_label: String,
    /// Upper bound on lists kept while one resolution call runs.
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            unknown_label: DEFAULT_UNKNOWN_LABEL.to_string(),
            cache_capacity: DEFAULT_RESOLVER_CACHE_CAPACITY,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Validation("cache_capacity must be > 0".into()));
        }
        if self.unknown_label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "unknown_label cannot be blank".into(),
            ));
        }
        Ok(())
    }
}

/// Everything the shell hands the core at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationsConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl LocationsConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        self.resolver.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_applies_defaults() {
        let config =
            LocationsConfig::from_json(r#"{ "gateway": { "base_url": "https://api.example.com" } }"#)
                .unwrap();

        assert!(config.gateway.query_fallback);
        assert_eq!(config.gateway.max_response_bytes, DEFAULT_MAX_RESPONSE_BYTES);
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn from_json_rejects_bad_base_url() {
        let result = LocationsConfig::from_json(r#"{ "gateway": { "base_url": "ftp://x" } }"#);
        assert!(matches!(result, Err(ConfigError::BaseUrl(_))));
    }

    #[test]
    fn from_json_rejects_garbage() {
        let result = LocationsConfig::from_json("not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_validation() {
        let bad_gateway = GatewayConfig {
            max_response_bytes: 0,
            ..GatewayConfig::new("https://api.example.com")
        };
        assert!(bad_gateway.validate().is_err());

        let bad_cache = ResolverConfig {
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(bad_cache.validate().is_err());

        let bad_label = ResolverConfig {
            unknown_label: "  ".into(),
            ..Default::default()
        };
        assert!(bad_label.validate().is_err());

        assert!(ResolverConfig::default().validate().is_ok());
        assert!(GatewayConfig::new("https://api.example.com").validate().is_ok());
    }
}
