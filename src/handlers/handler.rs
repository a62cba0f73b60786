//! Handler: one sink, its own severity threshold, and a formatter

use crate::core::{Formatter, LogLevel, LogRecord, LoggerError, Result, Sink};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Output endpoint attached to one or more loggers
///
/// Writes to the same handler are serialized by a per-handler lock, so lines
/// from concurrent callers never interleave. Distinct handlers never contend.
///
/// # Examples
///
/// ```
/// use rust_logger_hierarchy::handlers::{ConsoleSink, Handler};
/// use rust_logger_hierarchy::{Formatter, LogLevel};
/// use std::sync::Arc;
///
/// let formatter = Formatter::new("%(levelname)s %(name)s: %(message)s", None).unwrap();
/// let handler = Handler::new("console", ConsoleSink::stdout())
///     .with_level(LogLevel::Warning)
///     .with_formatter(Arc::new(formatter));
///
/// assert!(!handler.accepts(LogLevel::Info));
/// assert!(handler.accepts(LogLevel::Error));
/// ```
pub struct Handler {
    name: String,
    min_level: LogLevel,
    formatter: Arc<Formatter>,
    sink: Mutex<Box<dyn Sink>>,
    closed: AtomicBool,
}

impl Handler {
    /// Handler accepting every level, rendering only the message
    pub fn new<S: Sink + 'static>(name: impl Into<String>, sink: S) -> Self {
        Self::from_boxed(name, Box::new(sink))
    }

    pub fn from_boxed(name: impl Into<String>, sink: Box<dyn Sink>) -> Self {
        Self {
            name: name.into(),
            min_level: LogLevel::Trace,
            formatter: Arc::new(Formatter::default()),
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn formatter(&self) -> &Arc<Formatter> {
        &self.formatter
    }

    #[inline]
    pub fn accepts(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Format and write `record`, regardless of this handler's level
    pub fn write(&self, record: &LogRecord<'_>) -> Result<()> {
        let line = self.formatter.render(record);
        self.write_line(record.level, &line)
    }

    /// Filter by this handler's level, then write
    ///
    /// Returns `Ok(false)` when the record is below the threshold.
    pub fn handle(&self, record: &LogRecord<'_>) -> Result<bool> {
        if !self.accepts(record.level) {
            return Ok(false);
        }
        self.write(record)?;
        Ok(true)
    }

    /// Write an already formatted line
    pub(crate) fn write_line(&self, level: LogLevel, line: &str) -> Result<()> {
        let mut sink = self.sink.lock();
        if self.is_closed() {
            return Err(LoggerError::HandlerClosed(self.name.clone()));
        }
        sink.write_line(level, line)
    }

    pub fn flush(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.sink.lock().flush()
    }

    /// Flush and release the sink; idempotent
    pub fn close(&self) -> Result<()> {
        let mut sink = self.sink.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        sink.close()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("min_level", &self.min_level)
            .field("template", &self.formatter.template())
            .field("closed", &self.is_closed())
            .finish()
    }
}
