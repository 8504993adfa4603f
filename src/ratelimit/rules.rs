//! Admission rules configuration and path matching.
//!
//! Rules are declared in order and the first rule whose path pattern matches
//! a request wins. The table is validated once at startup and is immutable
//! afterwards; any problem with it is a configuration error, never a
//! request-time one.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{GateError, Result};

/// A rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique rule identifier, used as part of the counter key
    pub id: String,
    /// Path pattern: an exact path, or a prefix ending in `*`
    pub path: String,
    /// Maximum requests allowed per window
    pub limit: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RuleConfig {
    pub fn new(id: &str, path: &str, limit: u32, window_ms: u64) -> Self {
        Self {
            id: id.to_string(),
            path: path.to_string(),
            limit,
            window_ms,
        }
    }
}

/// A standalone rules document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesDocument {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// The built-in rule table for the protected endpoints.
pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new("otp-send", "/api/otp/send", 5, 10 * 60 * 1000),
        RuleConfig::new("otp-verify", "/api/otp/verify", 10, 10 * 60 * 1000),
        RuleConfig::new("contact", "/api/contact", 5, 60 * 60 * 1000),
        RuleConfig::new("send-emails", "/api/send-emails", 10, 60 * 1000),
    ]
}

/// A compiled request-path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches one path exactly
    Exact(String),
    /// Matches every path starting with the prefix
    Prefix(String),
}

impl PathPattern {
    /// Compile a pattern string.
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(GateError::Config(format!(
                "path pattern '{}' must start with '/'",
                pattern
            )));
        }

        match pattern.find('*') {
            None => Ok(PathPattern::Exact(pattern.to_string())),
            Some(idx) if idx == pattern.len() - 1 => {
                Ok(PathPattern::Prefix(pattern[..idx].to_string()))
            }
            Some(_) => Err(GateError::Config(format!(
                "path pattern '{}' may only use '*' as its final character",
                pattern
            ))),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => p == path,
            PathPattern::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// A validated admission rule.
#[derive(Debug, Clone)]
pub struct Rule {
    id: Arc<str>,
    pattern: PathPattern,
    limit: u32,
    window_ms: u64,
}

impl Rule {
    /// Validate and compile a configured rule.
    pub fn from_config(config: &RuleConfig) -> Result<Self> {
        if config.id.trim().is_empty() {
            return Err(GateError::Config("rule id must not be empty".to_string()));
        }
        if config.limit == 0 {
            return Err(GateError::Config(format!(
                "rule '{}': limit must be greater than zero",
                config.id
            )));
        }
        if config.window_ms == 0 {
            return Err(GateError::Config(format!(
                "rule '{}': window_ms must be greater than zero",
                config.id
            )));
        }
        let pattern = PathPattern::parse(&config.path).map_err(|e| match e {
            GateError::Config(msg) => GateError::Config(format!("rule '{}': {}", config.id, msg)),
            other => other,
        })?;

        Ok(Self {
            id: Arc::from(config.id.as_str()),
            pattern,
            limit: config.limit,
            window_ms: config.window_ms,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared handle to the id, for building counter keys.
    pub fn shared_id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }
}

/// Ordered, immutable table of admission rules.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    /// Build a registry, validating every rule and rejecting duplicate ids.
    pub fn new(configs: &[RuleConfig]) -> Result<Self> {
        let mut seen = HashSet::with_capacity(configs.len());
        let mut rules = Vec::with_capacity(configs.len());

        for config in configs {
            let rule = Rule::from_config(config)?;
            if !seen.insert(config.id.clone()) {
                return Err(GateError::Config(format!(
                    "duplicate rule id '{}'",
                    config.id
                )));
            }
            rules.push(rule);
        }

        Ok(Self { rules })
    }

    /// Registry with the built-in rule table.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&default_rules())
    }

    /// Load a rules document from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading admission rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load a rules document from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: RulesDocument = serde_yaml::from_str(yaml)
            .map_err(|e| GateError::Config(format!("Failed to parse rules: {}", e)))?;
        Self::new(&document.rules)
    }

    /// Find the first rule matching `path`, in declaration order.
    pub fn match_path(&self, path: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.pattern.matches(path))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
