//! Configuration document model
//!
//! Mirrors the declarative logging configuration: named formatters, named
//! handlers referring to formatters, and loggers referring to handlers. Only
//! syntax is checked here; references and values are checked in
//! [`validation`](super::validation).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Only supported schema version
pub const SCHEMA_VERSION: u32 = 1;

fn default_version() -> u32 {
    SCHEMA_VERSION
}

fn default_true() -> bool {
    true
}

/// Root of a logging configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Mute loggers that existed before configuration and are not named in it
    #[serde(default)]
    pub disable_existing_loggers: bool,

    /// Propagation default for configured loggers that do not set their own
    #[serde(default = "default_true")]
    pub propagate: bool,

    #[serde(default)]
    pub defaults: HandlerDefaults,

    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterConfig>,

    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,

    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerConfig>,

    #[serde(default)]
    pub root: Option<LoggerConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            disable_existing_loggers: false,
            propagate: true,
            defaults: HandlerDefaults::default(),
            formatters: BTreeMap::new(),
            handlers: BTreeMap::new(),
            loggers: BTreeMap::new(),
            root: None,
        }
    }
}

/// Fallbacks for rotating-file handlers that omit these options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerDefaults {
    #[serde(default, alias = "maxBytes")]
    pub max_bytes: Option<u64>,

    #[serde(default, alias = "backupCount")]
    pub backup_count: Option<usize>,

    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatterConfig {
    #[serde(default, alias = "fmt")]
    pub format: Option<String>,

    #[serde(default)]
    pub datefmt: Option<String>,
}

/// One handler declaration
///
/// Which options apply depends on `class`; options for the other class are
/// rejected during validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    pub class: String,

    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub formatter: Option<String>,

    // console
    #[serde(default)]
    pub stream: Option<String>,

    #[serde(default)]
    pub colors: Option<bool>,

    // rotating-file
    #[serde(default, alias = "filename")]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default, alias = "maxBytes")]
    pub max_bytes: Option<u64>,

    #[serde(default, alias = "backupCount")]
    pub backup_count: Option<usize>,

    #[serde(default)]
    pub encoding: Option<String>,

    #[serde(default)]
    pub compress: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: Option<String>,

    /// Handler names, in write order
    #[serde(default)]
    pub handlers: Vec<String>,

    /// Accepts booleans as well as `0` / `1`
    #[serde(default, deserialize_with = "flexible_bool")]
    pub propagate: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrInt {
    Bool(bool),
    Int(i64),
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<BoolOrInt>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        BoolOrInt::Bool(b) => b,
        BoolOrInt::Int(i) => i != 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_uses_defaults() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoggingConfig::default());
        assert!(config.propagate);
        assert_eq!(config.version, 1);
    }

    #[test]
    fn test_aliases_and_integer_propagate() {
        let config: LoggingConfig = serde_json::from_str(
            r#"{
                "formatters": {"plain": {"fmt": "%(message)s"}},
                "handlers": {"file": {"class": "rotating-file", "filename": "app.log", "maxBytes": 10}},
                "loggers": {"svc": {"propagate": 0}}
            }"#,
        )
        .unwrap();

        assert_eq!(config.formatters["plain"].format.as_deref(), Some("%(message)s"));
        assert_eq!(config.handlers["file"].path, Some(PathBuf::from("app.log")));
        assert_eq!(config.handlers["file"].max_bytes, Some(10));
        assert_eq!(config.loggers["svc"].propagate, Some(false));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<LoggingConfig, _> =
            serde_json::from_str(r#"{"loggers": {"svc": {"levle": "DEBUG"}}}"#);
        assert!(result.is_err());
    }
}
