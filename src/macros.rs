//! Logging macros for ergonomic log message formatting.
//!
//! These macros record the call site (`file!()`, `line!()`, `module_path!()`)
//! and defer `format!` until the record has passed the logger's level check.
//!
//! # Examples
//!
//! ```
//! use rust_logger_hierarchy::{info, Registry};
//!
//! let registry = Registry::new();
//! let logger = registry.get_logger("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message with automatic formatting and call site information.
///
/// # Examples
///
/// ```
/// # use rust_logger_hierarchy::{LogLevel, Registry};
/// # let logger = Registry::new().get_logger("app");
/// use rust_logger_hierarchy::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_at(
            $level,
            $crate::SourceLocation::new(file!(), line!(), module_path!()),
            || format!($($arg)+),
        )
    };
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_hierarchy::{LogLevel, Registry};
/// # let logger = Registry::new().get_logger("app");
/// # logger.set_level(Some(LogLevel::Trace));
/// use rust_logger_hierarchy::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_hierarchy::Registry;
/// # let logger = Registry::new().get_logger("app");
/// use rust_logger_hierarchy::{warn, warning};
/// warning!(logger, "Low disk space");
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Alias of [`warning!`].
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
///
/// # Examples
///
/// ```
/// # use rust_logger_hierarchy::Registry;
/// # let logger = Registry::new().get_logger("app");
/// use rust_logger_hierarchy::fatal;
/// fatal!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Formatter, LogLevel, Registry, Result, Sink};
    use crate::handlers::Handler;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct VecSink(Arc<Mutex<Vec<String>>>);

    impl Sink for VecSink {
        fn write_line(&mut self, _level: LogLevel, line: &str) -> Result<()> {
            self.0.lock().push(line.to_string());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "vec"
        }
    }

    fn capture(template: &str) -> (Registry, Arc<Mutex<Vec<String>>>) {
        let registry = Registry::builder().root_level(LogLevel::Trace).build();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let handler = Handler::new("capture", VecSink(Arc::clone(&lines)))
            .with_formatter(Arc::new(Formatter::new(template, None).unwrap()));
        registry.root().add_handler(Arc::new(handler));
        (registry, lines)
    }

    #[test]
    fn test_level_macros() {
        let (registry, lines) = capture("%(levelname)s %(message)s");
        let logger = registry.get_logger("app");

        trace!(logger, "Value: {}", 10);
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warning!(logger, "Retry {} of {}", 1, 3);
        warn!(logger, "Warning message");
        error!(logger, "Code: {}", 500);
        fatal!(logger, "Fatal message");
        log!(logger, LogLevel::Info, "Formatted: {}", 42);

        assert_eq!(
            lines.lock().as_slice(),
            [
                "TRACE Value: 10",
                "DEBUG Count: 5",
                "INFO Items: 100",
                "WARNING Retry 1 of 3",
                "WARNING Warning message",
                "ERROR Code: 500",
                "FATAL Fatal message",
                "INFO Formatted: 42",
            ]
        );
    }

    #[test]
    fn test_call_site_captured() {
        let (registry, lines) = capture("%(filename)s %(module)s %(message)s");
        let logger = registry.get_logger("app");

        info!(logger, "here");

        let line = lines.lock()[0].clone();
        assert!(line.starts_with("macros.rs "));
        assert!(line.contains("macros::tests"));
        assert!(line.ends_with(" here"));
    }

    #[test]
    fn test_arguments_not_evaluated_when_filtered() {
        let (registry, lines) = capture("%(message)s");
        let logger = registry.get_logger("quiet");
        logger.set_level(Some(LogLevel::Error));
        let evaluations = AtomicUsize::new(0);
        let expensive = || {
            evaluations.fetch_add(1, Ordering::SeqCst);
            "computed"
        };

        debug!(logger, "value {}", expensive());
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);

        error!(logger, "value {}", expensive());
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);
        assert_eq!(lines.lock().as_slice(), ["value computed"]);
    }
}
