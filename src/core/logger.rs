//! Logger nodes and the caller-facing `Logger` handle
//!
//! Nodes form a tree over dotted names. Each node only knows its parent through
//! a non-owning reference; the [`Registry`](super::Registry) owns every node.
//! Levels and flags are atomics and the handler list is a copy-on-write
//! snapshot, so emission never takes a lock on a node.

use super::{
    dispatch::{self, DispatchContext},
    log_context::LogContext,
    log_level::LogLevel,
    log_record::SourceLocation,
};
use crate::handlers::Handler;
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

const INHERIT: u8 = u8::MAX;

/// Effective level used by a node whose ancestors are gone (registry torn down)
const ORPHAN_LEVEL: LogLevel = LogLevel::Info;

pub struct LoggerNode {
    name: String,
    parent: Option<Weak<LoggerNode>>,
    level: AtomicU8,
    propagate: AtomicBool,
    disabled: AtomicBool,
    handlers: ArcSwap<Vec<Arc<Handler>>>,
}

impl LoggerNode {
    pub(crate) fn root(level: LogLevel) -> Arc<Self> {
        Arc::new(Self {
            name: String::new(),
            parent: None,
            level: AtomicU8::new(level.as_u8()),
            propagate: AtomicBool::new(true),
            disabled: AtomicBool::new(false),
            handlers: ArcSwap::from_pointee(Vec::new()),
        })
    }

    pub(crate) fn child(name: &str, parent: &Arc<LoggerNode>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parent: Some(Arc::downgrade(parent)),
            level: AtomicU8::new(INHERIT),
            propagate: AtomicBool::new(true),
            disabled: AtomicBool::new(false),
            handlers: ArcSwap::from_pointee(Vec::new()),
        })
    }

    /// Dotted name; empty for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parent(&self) -> Option<Arc<LoggerNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn explicit_level(&self) -> Option<LogLevel> {
        LogLevel::from_u8(self.level.load(Ordering::Acquire))
    }

    /// Set or clear the explicit level; the root cannot inherit and falls back to INFO
    pub fn set_level(&self, level: Option<LogLevel>) {
        let value = match level {
            Some(level) => level.as_u8(),
            None if self.is_root() => LogLevel::Info.as_u8(),
            None => INHERIT,
        };
        self.level.store(value, Ordering::Release);
    }

    /// Own explicit level, else the nearest ancestor's
    ///
    /// Reports the level tree only. A muted node keeps its inherited level here
    /// while [`is_enabled_for`](Self::is_enabled_for) rejects every level.
    pub fn effective_level(&self) -> LogLevel {
        if let Some(level) = self.explicit_level() {
            return level;
        }

        let mut current = self.parent();
        while let Some(node) = current {
            if let Some(level) = node.explicit_level() {
                return level;
            }
            current = node.parent();
        }

        ORPHAN_LEVEL
    }

    /// Whether a record at `level` passes this node's filter
    #[inline]
    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        !self.is_disabled() && level >= self.effective_level()
    }

    pub fn propagate(&self) -> bool {
        self.propagate.load(Ordering::Acquire)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.propagate.store(propagate, Ordering::Release);
    }

    /// Muted nodes drop every record, whatever its level
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Release);
    }

    /// Current handler list snapshot
    pub fn handlers(&self) -> Arc<Vec<Arc<Handler>>> {
        self.handlers.load_full()
    }

    pub fn add_handler(&self, handler: Arc<Handler>) {
        self.handlers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&handler));
            next
        });
    }

    /// Detach `handler` (by identity); returns whether it was attached
    pub fn remove_handler(&self, handler: &Arc<Handler>) -> bool {
        let previous = self.handlers.rcu(|current| {
            current
                .iter()
                .filter(|h| !Arc::ptr_eq(h, handler))
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|h| Arc::ptr_eq(h, handler))
    }

    /// Detach every handler called `name`; returns the first one removed
    pub fn remove_handler_named(&self, name: &str) -> Option<Arc<Handler>> {
        let previous = self.handlers.rcu(|current| {
            current
                .iter()
                .filter(|h| h.name() != name)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().find(|h| h.name() == name).cloned()
    }

    /// Replace the whole handler list at once
    pub fn set_handlers(&self, handlers: Vec<Arc<Handler>>) {
        self.handlers.store(Arc::new(handlers));
    }
}

impl fmt::Debug for LoggerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerNode")
            .field("name", &self.name)
            .field("explicit_level", &self.explicit_level())
            .field("propagate", &self.propagate())
            .field("disabled", &self.is_disabled())
            .field("handlers", &self.handlers().len())
            .finish()
    }
}

/// Handle through which callers log
///
/// Cheap to clone; all clones for one name refer to the same node.
///
/// # Examples
///
/// ```
/// use rust_logger_hierarchy::{LogLevel, Registry};
///
/// let registry = Registry::new();
/// let logger = registry.get_logger("warehouse.rooms");
///
/// logger.set_level(Some(LogLevel::Debug));
/// logger.debug("room 12 loaded");
/// logger.log_lazy(LogLevel::Trace, || format!("expensive {}", 42)); // never formatted
/// ```
#[derive(Clone)]
pub struct Logger {
    node: Arc<LoggerNode>,
    context: Arc<DispatchContext>,
}

impl Logger {
    pub(crate) fn new(node: Arc<LoggerNode>, context: Arc<DispatchContext>) -> Self {
        Self { node, context }
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn node(&self) -> &Arc<LoggerNode> {
        &self.node
    }

    /// Whether both handles refer to the same logger node
    pub fn same_node(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        self.node.is_enabled_for(level)
    }

    pub fn effective_level(&self) -> LogLevel {
        self.node.effective_level()
    }

    /// Whether configuration muted this logger; see [`LoggerNode::is_disabled`]
    pub fn is_disabled(&self) -> bool {
        self.node.is_disabled()
    }

    pub fn level(&self) -> Option<LogLevel> {
        self.node.explicit_level()
    }

    pub fn set_level(&self, level: Option<LogLevel>) {
        self.node.set_level(level);
    }

    pub fn propagate(&self) -> bool {
        self.node.propagate()
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.node.set_propagate(propagate);
    }

    pub fn add_handler(&self, handler: Arc<Handler>) {
        self.node.add_handler(handler);
    }

    pub fn remove_handler(&self, handler: &Arc<Handler>) -> bool {
        self.node.remove_handler(handler)
    }

    pub fn handlers(&self) -> Arc<Vec<Arc<Handler>>> {
        self.node.handlers()
    }

    /// Log a message; conversion into `String` only happens if the record is emitted
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_lazy(level, move || message.into());
    }

    /// Log a message produced on demand
    pub fn log_lazy<F>(&self, level: LogLevel, message: F)
    where
        F: FnOnce() -> String,
    {
        dispatch::emit(&self.context, &self.node, level, message, None, None);
    }

    /// Log with call site information (used by the logging macros)
    pub fn log_at<F>(&self, level: LogLevel, location: SourceLocation, message: F)
    where
        F: FnOnce() -> String,
    {
        dispatch::emit(&self.context, &self.node, level, message, Some(location), None);
    }

    /// Log with structured fields, rendered by the `%(fields)s` placeholder
    pub fn log_with_fields(&self, level: LogLevel, message: impl Into<String>, fields: LogContext) {
        dispatch::emit(
            &self.context,
            &self.node,
            level,
            move || message.into(),
            None,
            Some(&fields),
        );
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }

    /// Helper for structured info logging
    pub fn info_with_fields(&self, message: impl Into<String>, fields: LogContext) {
        self.log_with_fields(LogLevel::Info, message, fields);
    }

    /// Helper for structured error logging
    pub fn error_with_fields(&self, message: impl Into<String>, fields: LogContext) {
        self.log_with_fields(LogLevel::Error, message, fields);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Logger").field(&self.node).finish()
    }
}
