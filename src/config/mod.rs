//! Declarative configuration
//!
//! ```text
//! config file (JSON/TOML) or LoggingConfig built in code
//!     → loader.rs (parse, environment overrides)
//!     → validation.rs (semantic checks, every error at once)
//!     → ResolvedConfig (typed, formatters compiled)
//!     → Registry::configure (open handlers, then apply topology)
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{FormatterConfig, HandlerConfig, HandlerDefaults, LoggerConfig, LoggingConfig};
pub use validation::{HandlerSpec, HandlerTarget, LoggerSpec, ResolvedConfig, ValidationError};
