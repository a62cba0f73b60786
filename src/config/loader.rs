//! Configuration loading from disk, strings and the environment

use super::schema::{FormatterConfig, HandlerConfig, LoggerConfig, LoggingConfig};
use super::validation::{validate_config, ResolvedConfig, ValidationError};
use crate::core::formatter::BASIC_TEMPLATE;
use crate::core::{LogLevel, LoggerError};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported configuration file '{}' (expected .json or .toml)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("configuration validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("failed to open handler '{name}': {source}")]
    OpenHandler {
        name: String,
        #[source]
        source: Box<LoggerError>,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    /// Validation problems, if this is a validation failure
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ConfigError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl LoggingConfig {
    /// Load a configuration file, choosing the parser by extension
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, has an unknown extension or
    /// does not parse. Semantic problems are reported later, by [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let parse: fn(&str) -> Result<Self, ConfigError> = match extension.as_deref() {
            Some("json") => Self::from_json_str,
            Some("toml") => Self::from_toml_str,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// One console handler on standard error attached to the root
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_logger_hierarchy::{LogLevel, LoggingConfig};
    ///
    /// let config = LoggingConfig::basic(LogLevel::Debug, None);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn basic(level: LogLevel, format: Option<&str>) -> Self {
        let mut config = Self::default();
        config.formatters.insert(
            "basic".to_string(),
            FormatterConfig {
                format: Some(format.unwrap_or(BASIC_TEMPLATE).to_string()),
                datefmt: None,
            },
        );
        config.handlers.insert(
            "console".to_string(),
            HandlerConfig {
                class: "console".to_string(),
                formatter: Some("basic".to_string()),
                stream: Some("stderr".to_string()),
                ..Default::default()
            },
        );
        config.root = Some(LoggerConfig {
            level: Some(level.to_string()),
            handlers: vec!["console".to_string()],
            propagate: None,
        });
        config
    }

    /// Apply `{prefix}LOG_LEVEL` and `{prefix}LOG_FORMAT` from the process environment
    #[must_use]
    pub fn with_env_overrides(self, prefix: &str) -> Self {
        self.with_overrides_from(prefix, |key| std::env::var(key).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with an explicit lookup
    ///
    /// The level replaces the root level; the format replaces every formatter's
    /// template. Values are checked by validation like the rest of the document.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, prefix: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(&format!("{}LOG_LEVEL", prefix)) {
            self.root.get_or_insert_with(LoggerConfig::default).level = Some(level);
        }

        if let Some(format) = lookup(&format!("{}LOG_FORMAT", prefix)) {
            for formatter in self.formatters.values_mut() {
                formatter.format = Some(format.clone());
            }
        }

        self
    }

    /// Check the whole document, reporting every problem at once
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] listing all problems found
    pub fn validate(&self) -> Result<ResolvedConfig, ConfigError> {
        validate_config(self).map_err(ConfigError::Validation)
    }
}
