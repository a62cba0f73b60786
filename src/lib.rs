//! # Rust Logger Hierarchy
//!
//! A synchronous, in-process logging engine built around a tree of named
//! loggers and configured declaratively.
//!
//! ## Features
//!
//! - **Hierarchical Loggers**: Dotted names, inherited levels and propagation to ancestors
//! - **Two Filter Points**: Each logger and each handler applies its own threshold
//! - **Lazy Messages**: Messages are only produced for records that pass the logger filter
//! - **Rotating Files**: Size based rotation with bounded, optionally compressed backups
//! - **Declarative Configuration**: JSON or TOML documents, validated before anything is opened
//! - **Thread Safe**: Lock-free emission path, one lock per handler
//!
//! ## Example
//!
//! ```
//! use rust_logger_hierarchy::prelude::*;
//! use rust_logger_hierarchy::info;
//!
//! let config = LoggingConfig::from_json_str(r#"{
//!     "version": 1,
//!     "formatters": {"brief": {"format": "%(levelname)-8s %(name)s: %(message)s"}},
//!     "handlers": {"console": {"class": "console", "formatter": "brief", "stream": "stdout"}},
//!     "root": {"level": "INFO", "handlers": ["console"]}
//! }"#).unwrap();
//!
//! let registry = Registry::from_config(&config).unwrap();
//! let logger = registry.get_logger("app.db");
//!
//! info!(logger, "connected to {}", "primary");
//! logger.debug("not shown: below the inherited INFO level");
//! ```

pub mod config;
pub mod core;
pub mod global;
pub mod handlers;
pub mod macros;

pub mod prelude {
    pub use crate::config::{ConfigError, LoggingConfig, ValidationError};
    pub use crate::core::{
        FieldValue, Formatter, LogContext, LogLevel, LogRecord, Logger, LoggerError,
        LoggerMetrics, Registry, RegistryBuilder, Result, Sink, SourceLocation,
    };
    pub use crate::handlers::{
        ConsoleSink, ConsoleStream, Encoding, FileMode, Handler, RotatingFileSink, RotationPolicy,
    };
}

pub use crate::config::{ConfigError, LoggingConfig, ValidationError};
pub use crate::core::{
    DiagnosticCallback, FieldValue, Formatter, FormatterError, LogContext, LogLevel, LogRecord,
    Logger, LoggerError, LoggerMetrics, LoggerNode, Placeholder, Registry, RegistryBuilder,
    Result, Sink, SourceLocation,
};
pub use crate::handlers::{ConsoleSink, Handler, RotatingFileSink, RotationPolicy};
