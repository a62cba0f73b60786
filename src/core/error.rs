//! Error types for the logger system

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration could not be loaded, validated or applied
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Registry already received its configuration
    #[error("Logger registry is already configured")]
    AlreadyConfigured,

    /// Global registry already installed
    #[error("Global logger registry is already initialized")]
    AlreadyInitialized,

    /// Global registry not installed yet
    #[error("Global logger registry is not initialized")]
    NotInitialized,

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSinkError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Handler already closed
    #[error("Handler '{0}' is closed")]
    HandlerClosed(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Whether this error originates from configuration loading or validation
    pub fn is_config(&self) -> bool {
        matches!(self, LoggerError::Config(_) | LoggerError::AlreadyConfigured)
    }
}
