//! Compiler configuration

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main compiler configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompilerConfig {
    pub cache: CacheSettings,
    pub labels: LabelSettings,
}

/// Compiled-query cache settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Memoize compiled queries
    pub enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Naming of generated select labels and table aliases
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelSettings {
    /// Select label prefix (`c` gives `c1`, `c1-2`)
    pub prefix: String,
    /// Synthesized table alias prefix (`t` gives `t1`, `t2`)
    pub table_alias_prefix: String,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            prefix: "c".to_string(),
            table_alias_prefix: "t".to_string(),
        }
    }
}

fn valid_prefix(prefix: &str) -> bool {
    prefix.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl CompilerConfig {
    /// Create a new configuration builder
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder::default()
    }

    /// Parse and validate TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded compiler configuration from {}", path.display());
        Ok(config)
    }

    /// Prefixes must be plain identifiers; table alias prefixes are rendered
    /// unquoted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !valid_prefix(&self.labels.prefix) {
            return Err(ConfigError::Invalid(format!(
                "label prefix '{}' must be an identifier",
                self.labels.prefix
            )));
        }
        if !valid_prefix(&self.labels.table_alias_prefix) {
            return Err(ConfigError::Invalid(format!(
                "table alias prefix '{}' must be an identifier",
                self.labels.table_alias_prefix
            )));
        }
        Ok(())
    }
}

/// Builder for CompilerConfig
#[derive(Debug, Default)]
pub struct CompilerConfigBuilder {
    config: CompilerConfig,
}

impl CompilerConfigBuilder {
    /// Enable or disable the compiled-query cache
    pub fn cache(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    /// Set the select label prefix
    pub fn label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.labels.prefix = prefix.into();
        self
    }

    /// Set the table alias prefix
    pub fn table_alias_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.labels.table_alias_prefix = prefix.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<CompilerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
