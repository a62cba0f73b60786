//! Logger registry
//!
//! Owns the root node and every named node, creating missing ancestors when a
//! dotted name is first requested, and applies a declarative configuration.

use super::{
    diagnostics::{DiagnosticCallback, Diagnostics},
    dispatch::DispatchContext,
    error::{LoggerError, Result},
    log_level::LogLevel,
    logger::{Logger, LoggerNode},
    metrics::LoggerMetrics,
};
use crate::config::{ConfigError, LoggingConfig, ResolvedConfig};
use crate::handlers::Handler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Builder for a [`Registry`]
///
/// # Examples
///
/// ```
/// use rust_logger_hierarchy::{LogLevel, Registry};
/// use std::sync::Arc;
///
/// let registry = Registry::builder()
///     .root_level(LogLevel::Warning)
///     .diagnostic_callback(Arc::new(|msg: &str| eprintln!("logging problem: {}", msg)))
///     .build();
///
/// assert_eq!(registry.root().effective_level(), LogLevel::Warning);
/// ```
pub struct RegistryBuilder {
    root_level: LogLevel,
    diagnostic_callback: Option<DiagnosticCallback>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            root_level: LogLevel::Info,
            diagnostic_callback: None,
        }
    }

    #[must_use]
    pub fn root_level(mut self, level: LogLevel) -> Self {
        self.root_level = level;
        self
    }

    /// Receive handler failure reports instead of standard error
    #[must_use]
    pub fn diagnostic_callback(mut self, callback: DiagnosticCallback) -> Self {
        self.diagnostic_callback = Some(callback);
        self
    }

    pub fn build(self) -> Registry {
        let diagnostics = match self.diagnostic_callback {
            Some(callback) => Diagnostics::with_callback(callback),
            None => Diagnostics::new(),
        };

        Registry {
            root: LoggerNode::root(self.root_level),
            nodes: RwLock::new(HashMap::new()),
            handlers: RwLock::new(Vec::new()),
            context: Arc::new(DispatchContext::new(diagnostics)),
            configured: AtomicBool::new(false),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the logger tree
///
/// # Examples
///
/// ```
/// use rust_logger_hierarchy::Registry;
///
/// let registry = Registry::new();
/// let db = registry.get_logger("app.db");
///
/// assert!(db.same_node(&registry.get_logger("app.db")));
/// assert_eq!(registry.logger_names(), vec!["app", "app.db"]);
/// ```
pub struct Registry {
    root: Arc<LoggerNode>,
    nodes: RwLock<HashMap<String, Arc<LoggerNode>>>,
    /// Handlers created from configuration, in declaration order
    handlers: RwLock<Vec<Arc<Handler>>>,
    context: Arc<DispatchContext>,
    configured: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        RegistryBuilder::new().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// New registry with `config` applied
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or a handler cannot be opened
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        let registry = Self::new();
        registry.configure(config)?;
        Ok(registry)
    }

    fn handle(&self, node: Arc<LoggerNode>) -> Logger {
        Logger::new(node, Arc::clone(&self.context))
    }

    pub fn root(&self) -> Logger {
        self.handle(Arc::clone(&self.root))
    }

    /// Logger for a dotted name; `""` is the root
    ///
    /// Repeated calls with the same name return handles to the same node.
    pub fn get_logger(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.root();
        }

        if let Some(node) = self.nodes.read().get(name) {
            return self.handle(Arc::clone(node));
        }

        let mut nodes = self.nodes.write();
        let node = Self::ensure_node(&self.root, &mut nodes, name);
        self.handle(node)
    }

    fn ensure_node(
        root: &Arc<LoggerNode>,
        nodes: &mut HashMap<String, Arc<LoggerNode>>,
        name: &str,
    ) -> Arc<LoggerNode> {
        if let Some(node) = nodes.get(name) {
            return Arc::clone(node);
        }

        let parent = match name.rfind('.') {
            Some(index) if index > 0 => Self::ensure_node(root, nodes, &name[..index]),
            _ => Arc::clone(root),
        };

        let node = LoggerNode::child(name, &parent);
        nodes.insert(name.to_string(), Arc::clone(&node));
        node
    }

    /// Names of every non-root logger, sorted
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Configured handler by name
    pub fn handler(&self, name: &str) -> Option<Arc<Handler>> {
        self.handlers
            .read()
            .iter()
            .find(|h| h.name() == name)
            .cloned()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.context.metrics
    }

    /// Number of failure reports sent to the diagnostic channel
    pub fn diagnostics_reported(&self) -> u64 {
        self.context.diagnostics.reported_count()
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    /// Apply `config` to this registry; only the first call succeeds
    ///
    /// The whole document is validated and every handler opened before any
    /// node changes. On error the registry is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::AlreadyConfigured`] on a second call, or a
    /// [`LoggerError::Config`] describing validation or handler failures
    pub fn configure(&self, config: &LoggingConfig) -> Result<()> {
        if self.is_configured() {
            return Err(LoggerError::AlreadyConfigured);
        }

        let resolved = config.validate()?;
        let opened = Self::open_handlers(&resolved)?;

        if self
            .configured
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            Self::close_quietly(&opened);
            return Err(LoggerError::AlreadyConfigured);
        }

        self.apply(&resolved, &opened);
        self.handlers.write().extend(opened);
        Ok(())
    }

    fn open_handlers(resolved: &ResolvedConfig) -> Result<Vec<Arc<Handler>>> {
        let mut opened = Vec::with_capacity(resolved.handlers.len());
        for spec in &resolved.handlers {
            match spec.open() {
                Ok(handler) => opened.push(Arc::new(handler)),
                Err(source) => {
                    Self::close_quietly(&opened);
                    return Err(ConfigError::OpenHandler {
                        name: spec.name.clone(),
                        source: Box::new(source),
                    }
                    .into());
                }
            }
        }
        Ok(opened)
    }

    fn close_quietly(handlers: &[Arc<Handler>]) {
        for handler in handlers {
            let _ = handler.close();
        }
    }

    fn apply(&self, resolved: &ResolvedConfig, opened: &[Arc<Handler>]) {
        let lookup = |names: &[String]| -> Vec<Arc<Handler>> {
            names
                .iter()
                .filter_map(|name| opened.iter().find(|h| h.name() == name).cloned())
                .collect()
        };

        let existing = self.logger_names();

        if let Some(root) = &resolved.root {
            if let Some(level) = root.level {
                self.root.set_level(Some(level));
            }
            self.root.set_handlers(lookup(&root.handlers));
        }

        for spec in &resolved.loggers {
            let logger = self.get_logger(&spec.name);
            let node = logger.node();
            node.set_level(spec.level);
            node.set_propagate(spec.propagate);
            node.set_disabled(false);
            node.set_handlers(lookup(&spec.handlers));
        }

        if resolved.disable_existing_loggers {
            let named: Vec<&str> = resolved.loggers.iter().map(|l| l.name.as_str()).collect();
            let nodes = self.nodes.read();
            for name in &existing {
                let covered = named.iter().any(|configured| {
                    name == configured
                        || (name.starts_with(configured)
                            && name.as_bytes().get(configured.len()) == Some(&b'.'))
                });
                if !covered {
                    if let Some(node) = nodes.get(name) {
                        node.set_disabled(true);
                    }
                }
            }
        }
    }

    /// Every distinct handler reachable from this registry
    fn all_handlers(&self) -> Vec<Arc<Handler>> {
        let mut all: Vec<Arc<Handler>> = self.handlers.read().iter().cloned().collect();
        let mut push_unique = |handler: &Arc<Handler>| {
            if !all.iter().any(|h| Arc::ptr_eq(h, handler)) {
                all.push(Arc::clone(handler));
            }
        };

        for handler in self.root.handlers().iter() {
            push_unique(handler);
        }
        for node in self.nodes.read().values() {
            for handler in node.handlers().iter() {
                push_unique(handler);
            }
        }
        all
    }

    /// Flush every handler, returning the first error encountered
    ///
    /// # Errors
    ///
    /// Returns error if a handler fails to flush; remaining handlers are still flushed
    pub fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for handler in self.all_handlers() {
            if let Err(e) = handler.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flush and close every handler, then detach them from all loggers
    ///
    /// Records emitted afterwards are discarded silently.
    ///
    /// # Errors
    ///
    /// Returns the first flush or close error; all handlers are closed regardless
    pub fn shutdown(&self) -> Result<()> {
        let handlers = self.all_handlers();

        self.root.set_handlers(Vec::new());
        for node in self.nodes.read().values() {
            node.set_handlers(Vec::new());
        }

        let mut first_error = None;
        for handler in handlers {
            if let Err(e) = handler.close() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("root", &self.root)
            .field("loggers", &self.nodes.read().len())
            .field("handlers", &self.handlers.read().len())
            .field("configured", &self.is_configured())
            .finish()
    }
}
