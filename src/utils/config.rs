use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Extra attempts after a command's first failed dispatch
    pub max_retries: u32,

    /// Delay between retries (ms)
    pub retry_interval_ms: u64,

    /// Delay after each command that did not abort (ms)
    pub speed_ms: u64,

    /// Default timeout handed to commands that wait (ms)
    pub default_timeout_ms: u64,

    /// Safety limit for `while` blocks
    pub max_loop_iterations: u32,

    /// Start the run in interactive mode
    pub interactive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_interval_ms: 1000,
            speed_ms: 0,
            default_timeout_ms: 30000,
            max_loop_iterations: 1000,
            interactive: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply the overrides that are set
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = overrides.retry_interval_ms {
            self.retry_interval_ms = v;
        }
        if let Some(v) = overrides.speed_ms {
            self.speed_ms = v;
        }
        if let Some(v) = overrides.default_timeout_ms {
            self.default_timeout_ms = v;
        }
        if let Some(v) = overrides.max_loop_iterations {
            self.max_loop_iterations = v;
        }
        if let Some(v) = overrides.interactive {
            self.interactive = v;
        }
    }
}

/// Partial configuration from a script header or the command line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default, alias = "retryInterval")]
    pub retry_interval_ms: Option<u64>,
    #[serde(default, alias = "speed")]
    pub speed_ms: Option<u64>,
    #[serde(default, alias = "defaultTimeout")]
    pub default_timeout_ms: Option<u64>,
    #[serde(default)]
    pub max_loop_iterations: Option<u32>,
    #[serde(default)]
    pub interactive: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("maxRetries: 3\nspeedMs: 50\n").unwrap();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.speed_ms, 50);
        assert_eq!(config.retry_interval_ms, 1000);
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_overrides_apply_in_order() {
        let mut config = Config::default();
        let header: ConfigOverrides = serde_yaml::from_str("speed: 100\nmaxRetries: 1").unwrap();
        config.apply(&header);
        config.apply(&ConfigOverrides {
            max_retries: Some(4),
            ..Default::default()
        });
        assert_eq!(config.speed_ms, 100);
        assert_eq!(config.max_retries, 4);
    }
}
