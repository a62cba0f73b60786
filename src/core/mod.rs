//! Core logger types and traits

pub mod diagnostics;
pub(crate) mod dispatch;
pub mod error;
pub mod formatter;
pub mod log_context;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod registry;
pub mod sink;

pub use diagnostics::{DiagnosticCallback, Diagnostics};
pub use error::{LoggerError, Result};
pub use formatter::{Formatter, FormatterError, Placeholder};
pub use log_context::{FieldValue, LogContext};
pub use log_level::LogLevel;
pub use log_record::{LogRecord, SourceLocation};
pub use logger::{Logger, LoggerNode};
pub use metrics::LoggerMetrics;
pub use registry::{Registry, RegistryBuilder};
pub use sink::Sink;
