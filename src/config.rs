//! Configuration system for batchlimit
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (BATCHLIMIT_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::executor::parse_limit;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Batch execution settings
    pub runner: RunnerSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per result
    Text,
    /// A JSON document with all results
    Json,
}

/// Batch execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Maximum jobs in flight at once
    pub limit: usize,

    /// Log a progress line after each completed job
    pub progress: bool,

    /// Result output format
    pub output: OutputFormat,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            limit: 1,
            progress: true,
            output: OutputFormat::Text,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: e.message().to_string(),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides()?;

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // An explicit path must exist
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            PathBuf::from("batchlimit.toml"),
            dirs::config_dir()
                .map(|p| p.join("batchlimit").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".batchlimit").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // Parsed as text so a bad value is reported instead of ignored
        if let Ok(val) = std::env::var("BATCHLIMIT_LIMIT") {
            self.runner.limit = parse_limit(&val)?;
        }
        if let Ok(val) = std::env::var("BATCHLIMIT_PROGRESS") {
            self.runner.progress = parse_bool(&val);
        }
        if let Ok(val) = std::env::var("BATCHLIMIT_OUTPUT") {
            self.runner.output = match val.to_lowercase().as_str() {
                "json" => OutputFormat::Json,
                "text" => OutputFormat::Text,
                other => {
                    return Err(Error::config_field_invalid(
                        "runner.output",
                        format!("Invalid output format '{}'. Must be one of: text, json", other),
                    ))
                }
            };
        }

        if let Ok(val) = std::env::var("BATCHLIMIT_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("BATCHLIMIT_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("BATCHLIMIT_LOG_JSON") {
            self.logging.json_format = parse_bool(&val);
        }

        Ok(())
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.runner.limit < 1 {
            return Err(Error::config_field_invalid(
                "runner.limit",
                "limit must be greater or equal to 1",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Expand ~ and environment variables in paths
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".batchlimit")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# batchlimit configuration

[runner]
# Maximum jobs in flight at once (must be at least 1)
limit = 1

# Log a progress line after each completed job
progress = true

# Result output format: text or json
output = "text"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.batchlimit/logs/batchlimit.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.runner.limit, 1);
        assert!(config.runner.progress);
        assert_eq!(config.runner.output, OutputFormat::Text);
        assert_eq!(config.logging.level, "info");
    }

    // All environment manipulation lives in one test; the harness runs tests
    // on several threads and the process environment is shared.
    #[test]
    fn test_env_overrides() {
        env::set_var("BATCHLIMIT_LIMIT", "6");
        env::set_var("BATCHLIMIT_OUTPUT", "json");
        env::set_var("BATCHLIMIT_LOG_LEVEL", "debug");

        let mut config = RunnerConfig::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.runner.limit, 6);
        assert_eq!(config.runner.output, OutputFormat::Json);
        assert_eq!(config.logging.level, "debug");

        env::set_var("BATCHLIMIT_LIMIT", "many");
        let err = RunnerConfig::default().apply_env_overrides().unwrap_err();
        assert!(err.to_string().contains("limit must be a number, not string"));

        env::set_var("BATCHLIMIT_LIMIT", "0");
        let err = RunnerConfig::default().apply_env_overrides().unwrap_err();
        assert!(err.to_string().contains("limit must be greater or equal to 1"));

        env::remove_var("BATCHLIMIT_LIMIT");
        env::set_var("BATCHLIMIT_OUTPUT", "yaml");
        assert!(RunnerConfig::default().apply_env_overrides().is_err());

        env::remove_var("BATCHLIMIT_OUTPUT");
        env::remove_var("BATCHLIMIT_LOG_LEVEL");
    }

    #[test]
    fn test_validation_zero_limit() {
        let mut config = RunnerConfig::default();
        config.runner.limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = RunnerConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = RunnerConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: RunnerConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.runner.limit, parsed.runner.limit);
        assert_eq!(config.runner.output, parsed.runner.output);
    }

    #[test]
    fn test_parse_config_file() {
        let config_str = r#"
[runner]
limit = 8
output = "json"

[logging]
level = "debug"
"#;

        let config: RunnerConfig = toml::from_str(config_str).unwrap();
        assert_eq!(config.runner.limit, 8);
        assert_eq!(config.runner.output, OutputFormat::Json);
        assert!(config.runner.progress);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_default_config_template_parses() {
        let config: RunnerConfig = toml::from_str(&generate_default_config()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = RunnerConfig::find_config_file(Some("/nonexistent/batchlimit.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let path_str = path.to_str().unwrap();

        let written = init_config(Some(path_str), false).unwrap();
        assert_eq!(written, path);
        assert!(init_config(Some(path_str), false).is_err());
        assert!(init_config(Some(path_str), true).is_ok());
    }
}
