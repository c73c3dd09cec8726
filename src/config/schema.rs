//! Configuration schema types for `tilecache.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest accepted debounce delay
pub const MAX_DEBOUNCE_MS: u32 = 10_000;

/// File watching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Watch loaded template files for external changes
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { enabled: true, debounce_ms: 100 }
    }
}

/// Error reporting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append reported errors to `errors_file`
    #[serde(default)]
    pub collect_errors: bool,
    /// JSONL file errors are appended to
    #[serde(default = "default_errors_file")]
    pub errors_file: PathBuf,
}

fn default_errors_file() -> PathBuf {
    PathBuf::from(".tilecache/errors.jsonl")
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { collect_errors: false, errors_file: default_errors_file() }
    }
}

/// Complete tilecache.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TilecacheConfig {
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "watch.debounce_ms")
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tilecache.toml: '{}' {}", self.field, self.message)
    }
}

impl TilecacheConfig {
    /// Validate the configuration, returning all problems found
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.watch.debounce_ms == 0 || self.watch.debounce_ms > MAX_DEBOUNCE_MS {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: format!("must be between 1 and {}", MAX_DEBOUNCE_MS),
            });
        }

        if self.log.collect_errors && self.log.errors_file.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "log.errors_file".to_string(),
                message: "must be set when collect_errors is enabled".to_string(),
            });
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TilecacheConfig::default();
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce_ms, 100);
        assert!(!config.log.collect_errors);
        assert!(config.is_valid());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: TilecacheConfig = toml::from_str("[watch]\ndebounce_ms = 250\n").unwrap();
        assert_eq!(config.watch.debounce_ms, 250);
        assert!(config.watch.enabled);
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn test_zero_debounce_invalid() {
        let mut config = TilecacheConfig::default();
        config.watch.debounce_ms = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "watch.debounce_ms");
    }

    #[test]
    fn test_empty_errors_file_invalid_when_collecting() {
        let mut config = TilecacheConfig::default();
        config.log.collect_errors = true;
        config.log.errors_file = PathBuf::new();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("log.errors_file"));
    }
}
