//! Log record structure
//!
//! A record is built only after the originating logger admitted its level, and
//! lives for the duration of one dispatch. The message is produced lazily, at
//! most once, the first time a handler needs it.

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Stands in for the message when its producer panicked
pub const PANICKED_PRODUCER_MESSAGE: &str = "<message producer panicked>";

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Call site of a log statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub module_path: &'static str,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, module_path: &'static str) -> Self {
        Self {
            file,
            line,
            module_path,
        }
    }

    /// Final path component of `file`
    pub fn file_name(&self) -> &'static str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file)
    }
}

type MessageProducer<'a> = Box<dyn FnOnce() -> String + 'a>;

pub struct LogRecord<'a> {
    pub logger_name: &'a str,
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub location: Option<SourceLocation>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub process_id: u32,
    pub context: Option<&'a LogContext>,
    producer: Cell<Option<MessageProducer<'a>>>,
    message: OnceCell<String>,
}

impl<'a> LogRecord<'a> {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    fn with_producer(logger_name: &'a str, level: LogLevel, producer: Option<MessageProducer<'a>>) -> Self {
        Self {
            logger_name,
            level,
            timestamp: Utc::now(),
            location: None,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            process_id: std::process::id(),
            context: None,
            producer: Cell::new(producer),
            message: OnceCell::new(),
        }
    }

    /// Record with an already available message
    pub fn new(logger_name: &'a str, level: LogLevel, message: impl Into<String>) -> Self {
        let record = Self::with_producer(logger_name, level, None);
        let _ = record
            .message
            .set(Self::sanitize_message(&message.into()));
        record
    }

    /// Record whose message is produced on first use
    pub fn lazy<F>(logger_name: &'a str, level: LogLevel, producer: F) -> Self
    where
        F: FnOnce() -> String + 'a,
    {
        Self::with_producer(logger_name, level, Some(Box::new(producer)))
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: &'a LogContext) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The rendered message, evaluating the producer on first call
    pub fn message(&self) -> &str {
        self.message.get_or_init(|| {
            let raw = match self.producer.take() {
                Some(produce) => catch_unwind(AssertUnwindSafe(produce))
                    .unwrap_or_else(|_| PANICKED_PRODUCER_MESSAGE.to_string()),
                None => String::new(),
            };
            Self::sanitize_message(&raw)
        })
    }

    /// Whether the message has been produced yet
    pub fn is_message_evaluated(&self) -> bool {
        self.message.get().is_some()
    }
}

impl fmt::Debug for LogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRecord")
            .field("logger_name", &self.logger_name)
            .field("level", &self.level)
            .field("timestamp", &self.timestamp)
            .field("location", &self.location)
            .field("thread_id", &self.thread_id)
            .field("message", &self.message.get())
            .finish_non_exhaustive()
    }
}
