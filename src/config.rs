//! Configuration management for Throttlegate.
//!
//! Settings come from an optional YAML file, overlaid by environment
//! variables prefixed with `THROTTLEGATE__` (nested keys separated by `__`,
//! e.g. `THROTTLEGATE__RATE_LIMITING__MAX_STORE_SIZE=10000`).

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;

use crate::error::Result;
use crate::ratelimit::{default_rules, RuleConfig, DEFAULT_MAX_STORE_SIZE};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "THROTTLEGATE";

/// Main configuration for the Throttlegate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Path to a YAML rules document; replaces `rules` when set
    #[serde(default)]
    pub rules_path: Option<String>,

    /// Store size at which expired counters are swept
    #[serde(default = "default_max_store_size")]
    pub max_store_size: usize,

    /// Ordered admission rules
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            max_store_size: default_max_store_size(),
            rules: default_rules(),
        }
    }
}

fn default_max_store_size() -> usize {
    DEFAULT_MAX_STORE_SIZE
}

impl GateConfig {
    /// Load configuration from an optional file path and the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!(path = %path, "Loading configuration file");
            builder = builder.add_source(File::new(path, FileFormat::Yaml));
        }

        let config: GateConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Load configuration from a YAML string, without environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GateConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}
