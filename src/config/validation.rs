//! Configuration validation
//!
//! Turns a [`LoggingConfig`] into a [`ResolvedConfig`]: levels parsed, handler
//! classes and their options checked, formatters compiled, and every name
//! reference followed. All problems are collected and returned together; no
//! file is touched here.

use super::schema::{HandlerConfig, LoggingConfig, LoggerConfig, SCHEMA_VERSION};
use crate::core::{Formatter, FormatterError, LogLevel, Result};
use crate::handlers::{
    ConsoleSink, ConsoleStream, Encoding, FileMode, Handler, RotatingFileSink, RotationPolicy,
};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported configuration version {0} (expected 1)")]
    UnsupportedVersion(u32),

    #[error("handler '{handler}': unknown class '{class}'")]
    UnknownClass { handler: String, class: String },

    #[error("{owner}: invalid level '{value}'")]
    InvalidLevel { owner: String, value: String },

    #[error("handler '{handler}': unknown formatter '{formatter}'")]
    UnknownFormatter { handler: String, formatter: String },

    #[error("{logger}: unknown handler '{handler}'")]
    UnknownHandler { logger: String, handler: String },

    #[error("{logger}: handler '{handler}' is listed more than once")]
    DuplicateHandler { logger: String, handler: String },

    #[error("handler '{handler}': rotating-file handler requires a path")]
    MissingPath { handler: String },

    #[error("handler '{handler}': invalid stream '{value}'")]
    InvalidStream { handler: String, value: String },

    #[error("handler '{handler}': invalid mode '{value}' (expected 'a' or 'w')")]
    InvalidMode { handler: String, value: String },

    #[error("{owner}: unsupported encoding '{value}'")]
    InvalidEncoding { owner: String, value: String },

    #[error("handler '{handler}': option '{option}' does not apply to a {class} handler")]
    InapplicableOption {
        handler: String,
        class: &'static str,
        option: &'static str,
    },

    #[error("formatter '{formatter}': {source}")]
    Formatter {
        formatter: String,
        #[source]
        source: FormatterError,
    },

    #[error("logger names must not be empty; configure the root logger in the 'root' section")]
    EmptyLoggerName,
}

/// Validated configuration, ready to be applied to a registry
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub disable_existing_loggers: bool,
    /// Every declared handler, in name order
    pub handlers: Vec<HandlerSpec>,
    pub root: Option<LoggerSpec>,
    pub loggers: Vec<LoggerSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggerSpec {
    pub name: String,
    pub level: Option<LogLevel>,
    pub handlers: Vec<String>,
    pub propagate: bool,
}

#[derive(Debug, Clone)]
pub struct HandlerSpec {
    pub name: String,
    pub level: LogLevel,
    /// Shared by every handler naming the same formatter
    pub formatter: Arc<Formatter>,
    pub target: HandlerTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerTarget {
    Console {
        stream: ConsoleStream,
        colors: bool,
    },
    RotatingFile {
        path: PathBuf,
        mode: FileMode,
        policy: RotationPolicy,
        encoding: Encoding,
    },
}

impl HandlerSpec {
    /// Build the handler, opening its file if it has one
    ///
    /// # Errors
    ///
    /// Returns error if the log file or its directory cannot be created
    pub fn open(&self) -> Result<Handler> {
        let handler = match &self.target {
            HandlerTarget::Console { stream, colors } => {
                Handler::new(self.name.as_str(), ConsoleSink::new(*stream).with_colors(*colors))
            }
            HandlerTarget::RotatingFile {
                path,
                mode,
                policy,
                encoding,
            } => Handler::new(
                self.name.as_str(),
                RotatingFileSink::with_options(path, policy.clone(), *mode, *encoding)?,
            ),
        };

        Ok(handler
            .with_level(self.level)
            .with_formatter(Arc::clone(&self.formatter)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerClass {
    Console,
    RotatingFile,
}

impl HandlerClass {
    fn parse(class: &str) -> Option<Self> {
        match class.trim() {
            "console" | "stream" | "logging.StreamHandler" => Some(HandlerClass::Console),
            "rotating-file" | "rotating_file" | "logging.handlers.RotatingFileHandler" => {
                Some(HandlerClass::RotatingFile)
            }
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            HandlerClass::Console => "console",
            HandlerClass::RotatingFile => "rotating-file",
        }
    }
}

/// Validate `config`, returning every problem found
pub fn validate_config(config: &LoggingConfig) -> std::result::Result<ResolvedConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.version != SCHEMA_VERSION {
        errors.push(ValidationError::UnsupportedVersion(config.version));
    }

    let formatters = compile_formatters(config, &mut errors);
    let default_formatter = Arc::new(Formatter::default());

    let handlers: Vec<HandlerSpec> = config
        .handlers
        .iter()
        .filter_map(|(name, handler)| {
            resolve_handler(name, handler, config, &formatters, &default_formatter, &mut errors)
        })
        .collect();

    let root = config
        .root
        .as_ref()
        .map(|root| resolve_logger("", "root logger".to_string(), root, config, &mut errors));

    let mut loggers = Vec::with_capacity(config.loggers.len());
    for (name, logger) in &config.loggers {
        if name.is_empty() {
            errors.push(ValidationError::EmptyLoggerName);
            continue;
        }
        loggers.push(resolve_logger(
            name,
            format!("logger '{}'", name),
            logger,
            config,
            &mut errors,
        ));
    }

    if errors.is_empty() {
        Ok(ResolvedConfig {
            disable_existing_loggers: config.disable_existing_loggers,
            handlers,
            root,
            loggers,
        })
    } else {
        Err(errors)
    }
}

fn compile_formatters(
    config: &LoggingConfig,
    errors: &mut Vec<ValidationError>,
) -> BTreeMap<String, Arc<Formatter>> {
    let mut compiled = BTreeMap::new();
    for (name, formatter) in &config.formatters {
        let template = formatter
            .format
            .as_deref()
            .unwrap_or(crate::core::formatter::DEFAULT_TEMPLATE);
        match Formatter::new(template, formatter.datefmt.as_deref()) {
            Ok(f) => {
                compiled.insert(name.clone(), Arc::new(f));
            }
            Err(source) => errors.push(ValidationError::Formatter {
                formatter: name.clone(),
                source,
            }),
        }
    }
    compiled
}

fn parse_level(owner: String, value: &str, errors: &mut Vec<ValidationError>) -> Option<LogLevel> {
    match value.parse::<LogLevel>() {
        Ok(level) => Some(level),
        Err(_) => {
            errors.push(ValidationError::InvalidLevel {
                owner,
                value: value.to_string(),
            });
            None
        }
    }
}

fn resolve_handler(
    name: &str,
    handler: &HandlerConfig,
    config: &LoggingConfig,
    formatters: &BTreeMap<String, Arc<Formatter>>,
    default_formatter: &Arc<Formatter>,
    errors: &mut Vec<ValidationError>,
) -> Option<HandlerSpec> {
    let before = errors.len();
    let owner = || format!("handler '{}'", name);

    let level = match handler.level.as_deref() {
        Some(value) => parse_level(owner(), value, errors).unwrap_or_default(),
        None => LogLevel::Trace,
    };

    let formatter = match handler.formatter.as_deref() {
        Some(formatter_name) => match formatters.get(formatter_name) {
            Some(f) => Arc::clone(f),
            None => {
                // A formatter that failed to compile was already reported
                if !config.formatters.contains_key(formatter_name) {
                    errors.push(ValidationError::UnknownFormatter {
                        handler: name.to_string(),
                        formatter: formatter_name.to_string(),
                    });
                }
                Arc::clone(default_formatter)
            }
        },
        None => Arc::clone(default_formatter),
    };

    let Some(class) = HandlerClass::parse(&handler.class) else {
        errors.push(ValidationError::UnknownClass {
            handler: name.to_string(),
            class: handler.class.clone(),
        });
        return None;
    };

    let mut inapplicable = |present: bool, option: &'static str| {
        if present {
            errors.push(ValidationError::InapplicableOption {
                handler: name.to_string(),
                class: class.label(),
                option,
            });
        }
    };

    let target = match class {
        HandlerClass::Console => {
            inapplicable(handler.path.is_some(), "path");
            inapplicable(handler.mode.is_some(), "mode");
            inapplicable(handler.max_bytes.is_some(), "max_bytes");
            inapplicable(handler.backup_count.is_some(), "backup_count");
            inapplicable(handler.encoding.is_some(), "encoding");
            inapplicable(handler.compress.is_some(), "compress");

            let stream = match handler.stream.as_deref() {
                Some(value) => value.parse().unwrap_or_else(|_| {
                    errors.push(ValidationError::InvalidStream {
                        handler: name.to_string(),
                        value: value.to_string(),
                    });
                    ConsoleStream::default()
                }),
                None => ConsoleStream::default(),
            };

            HandlerTarget::Console {
                stream,
                colors: handler.colors.unwrap_or(false),
            }
        }
        HandlerClass::RotatingFile => {
            inapplicable(handler.stream.is_some(), "stream");
            inapplicable(handler.colors.is_some(), "colors");

            let path = handler.path.clone().unwrap_or_else(|| {
                errors.push(ValidationError::MissingPath {
                    handler: name.to_string(),
                });
                PathBuf::new()
            });

            let mode = match handler.mode.as_deref() {
                Some(value) => value.parse().unwrap_or_else(|_| {
                    errors.push(ValidationError::InvalidMode {
                        handler: name.to_string(),
                        value: value.to_string(),
                    });
                    FileMode::default()
                }),
                None => FileMode::default(),
            };

            let encoding = match handler
                .encoding
                .as_deref()
                .or(config.defaults.encoding.as_deref())
            {
                Some(value) => value.parse().unwrap_or_else(|_| {
                    errors.push(ValidationError::InvalidEncoding {
                        owner: owner(),
                        value: value.to_string(),
                    });
                    Encoding::default()
                }),
                None => Encoding::default(),
            };

            let fallback = RotationPolicy::default();
            let policy = RotationPolicy::new()
                .with_max_bytes(
                    handler
                        .max_bytes
                        .or(config.defaults.max_bytes)
                        .unwrap_or(fallback.max_bytes),
                )
                .with_backup_count(
                    handler
                        .backup_count
                        .or(config.defaults.backup_count)
                        .unwrap_or(fallback.backup_count),
                )
                .with_compression(handler.compress.unwrap_or(false));

            HandlerTarget::RotatingFile {
                path,
                mode,
                policy,
                encoding,
            }
        }
    };

    if errors.len() > before {
        return None;
    }

    Some(HandlerSpec {
        name: name.to_string(),
        level,
        formatter,
        target,
    })
}

fn resolve_logger(
    name: &str,
    owner: String,
    logger: &LoggerConfig,
    config: &LoggingConfig,
    errors: &mut Vec<ValidationError>,
) -> LoggerSpec {
    let level = logger
        .level
        .as_deref()
        .and_then(|value| parse_level(owner.clone(), value, errors));

    let mut seen = HashSet::new();
    for handler in &logger.handlers {
        if !config.handlers.contains_key(handler) {
            errors.push(ValidationError::UnknownHandler {
                logger: owner.clone(),
                handler: handler.clone(),
            });
        } else if !seen.insert(handler.as_str()) {
            errors.push(ValidationError::DuplicateHandler {
                logger: owner.clone(),
                handler: handler.clone(),
            });
        }
    }

    LoggerSpec {
        name: name.to_string(),
        level,
        handlers: logger.handlers.clone(),
        propagate: logger.propagate.unwrap_or(config.propagate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FormatterConfig;

    fn file_handler(path: &str) -> HandlerConfig {
        HandlerConfig {
            class: "rotating-file".to_string(),
            path: Some(PathBuf::from(path)),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_resolves() {
        let mut config = LoggingConfig::default();
        config.formatters.insert(
            "plain".to_string(),
            FormatterConfig {
                format: Some("%(name)s %(message)s".to_string()),
                datefmt: None,
            },
        );
        let mut handler = file_handler("logs/app.log");
        handler.formatter = Some("plain".to_string());
        handler.level = Some("warning".to_string());
        config.handlers.insert("file".to_string(), handler);
        config.loggers.insert(
            "svc".to_string(),
            LoggerConfig {
                level: Some("DEBUG".to_string()),
                handlers: vec!["file".to_string()],
                propagate: None,
            },
        );

        let resolved = validate_config(&config).unwrap();
        assert_eq!(resolved.handlers.len(), 1);
        assert_eq!(resolved.handlers[0].level, LogLevel::Warning);
        assert_eq!(resolved.handlers[0].formatter.template(), "%(name)s %(message)s");
        assert_eq!(resolved.loggers[0].level, Some(LogLevel::Debug));
        assert!(resolved.loggers[0].propagate);
    }

    #[test]
    fn test_all_errors_reported_together() {
        let mut config = LoggingConfig {
            version: 2,
            ..Default::default()
        };
        config.handlers.insert(
            "bad".to_string(),
            HandlerConfig {
                class: "smtp".to_string(),
                ..Default::default()
            },
        );
        config.loggers.insert(
            "svc".to_string(),
            LoggerConfig {
                level: Some("LOUD".to_string()),
                handlers: vec!["missing".to_string()],
                propagate: None,
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::UnsupportedVersion(2)));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownClass { class, .. } if class == "smtp")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidLevel { value, .. } if value == "LOUD")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownHandler { handler, .. } if handler == "missing")));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let mut config = LoggingConfig::default();
        config.formatters.insert(
            "broken".to_string(),
            FormatterConfig {
                format: Some("%(nonexistent)s".to_string()),
                datefmt: None,
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::Formatter {
                source: FormatterError::UnknownPlaceholder { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_rotating_file_checks() {
        let mut config = LoggingConfig::default();
        config.handlers.insert(
            "nopath".to_string(),
            HandlerConfig {
                class: "logging.handlers.RotatingFileHandler".to_string(),
                stream: Some("stdout".to_string()),
                mode: Some("r".to_string()),
                encoding: Some("utf-16".to_string()),
                ..Default::default()
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingPath {
            handler: "nopath".to_string()
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InapplicableOption { option: "stream", .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidMode { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidEncoding { .. })));
    }

    #[test]
    fn test_defaults_fill_rotation_options() {
        let mut config = LoggingConfig::default();
        config.defaults.max_bytes = Some(2048);
        config.defaults.backup_count = Some(3);
        config.defaults.encoding = Some("latin-1".to_string());
        let mut own = file_handler("own.log");
        own.backup_count = Some(9);
        config.handlers.insert("inherits".to_string(), file_handler("a.log"));
        config.handlers.insert("own".to_string(), own);

        let resolved = validate_config(&config).unwrap();
        let targets: Vec<_> = resolved.handlers.iter().map(|h| h.target.clone()).collect();

        match &targets[0] {
            HandlerTarget::RotatingFile {
                policy, encoding, ..
            } => {
                assert_eq!(policy.max_bytes, 2048);
                assert_eq!(policy.backup_count, 3);
                assert_eq!(*encoding, Encoding::Latin1);
            }
            other => panic!("unexpected target {:?}", other),
        }
        match &targets[1] {
            HandlerTarget::RotatingFile { policy, .. } => assert_eq!(policy.backup_count, 9),
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_handler_reference() {
        let mut config = LoggingConfig::default();
        config.handlers.insert(
            "console".to_string(),
            HandlerConfig {
                class: "console".to_string(),
                ..Default::default()
            },
        );
        config.root = Some(LoggerConfig {
            level: None,
            handlers: vec!["console".to_string(), "console".to_string()],
            propagate: None,
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateHandler {
                logger: "root logger".to_string(),
                handler: "console".to_string()
            }]
        );
    }

    #[test]
    fn test_explicit_propagate_overrides_global_default() {
        let mut config = LoggingConfig {
            propagate: false,
            ..Default::default()
        };
        config.loggers.insert("quiet".to_string(), LoggerConfig::default());
        config.loggers.insert(
            "loud".to_string(),
            LoggerConfig {
                propagate: Some(true),
                ..Default::default()
            },
        );

        let resolved = validate_config(&config).unwrap();
        let by_name: BTreeMap<_, _> = resolved
            .loggers
            .iter()
            .map(|l| (l.name.as_str(), l.propagate))
            .collect();
        assert_eq!(by_name["quiet"], false);
        assert_eq!(by_name["loud"], true);
    }
}
