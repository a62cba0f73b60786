//! Record dispatch
//!
//! The path a single call to a [`Logger`](super::Logger) takes: level check on
//! the originating node, record construction, collection of handler snapshots
//! along the propagation chain, then one write per accepting handler.

use super::{
    diagnostics::Diagnostics, formatter::Formatter, log_context::LogContext, log_level::LogLevel,
    log_record::{LogRecord, SourceLocation},
    logger::LoggerNode,
    metrics::LoggerMetrics,
};
use crate::handlers::Handler;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// State shared by every logger handle of one registry
#[derive(Debug, Default)]
pub(crate) struct DispatchContext {
    pub(crate) metrics: LoggerMetrics,
    pub(crate) diagnostics: Diagnostics,
}

impl DispatchContext {
    pub(crate) fn new(diagnostics: Diagnostics) -> Self {
        Self {
            metrics: LoggerMetrics::new(),
            diagnostics,
        }
    }
}

/// Handler snapshots from `node` up to the first node that stops propagation
fn collect_chain(node: &LoggerNode) -> Vec<Arc<Vec<Arc<Handler>>>> {
    let mut chain = vec![node.handlers()];
    if !node.propagate() {
        return chain;
    }

    let mut current = node.parent();
    while let Some(ancestor) = current {
        chain.push(ancestor.handlers());
        if !ancestor.propagate() {
            break;
        }
        current = ancestor.parent();
    }
    chain
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Lines already rendered for this record, keyed by formatter identity
#[derive(Default)]
struct RenderCache {
    entries: Vec<(Arc<Formatter>, Arc<str>)>,
}

impl RenderCache {
    fn line(&mut self, formatter: &Arc<Formatter>, record: &LogRecord<'_>) -> Arc<str> {
        if let Some((_, line)) = self.entries.iter().find(|(f, _)| Arc::ptr_eq(f, formatter)) {
            return Arc::clone(line);
        }
        let line: Arc<str> = formatter.render(record).into();
        self.entries.push((Arc::clone(formatter), Arc::clone(&line)));
        line
    }
}

/// Emit one record through `node`
///
/// Never fails towards the caller. Handler errors and panics are counted in
/// the metrics and summarized in a single diagnostic report for the record.
pub(crate) fn emit<'a, F>(
    context: &DispatchContext,
    node: &'a LoggerNode,
    level: LogLevel,
    message: F,
    location: Option<SourceLocation>,
    fields: Option<&'a LogContext>,
) where
    F: FnOnce() -> String + 'a,
{
    if !node.is_enabled_for(level) {
        context.metrics.record_filtered();
        return;
    }
    context.metrics.record_emitted();

    let mut record = LogRecord::lazy(node.name(), level, message);
    if let Some(location) = location {
        record = record.with_location(location);
    }
    if let Some(fields) = fields {
        record = record.with_context(fields);
    }

    let chain = collect_chain(node);
    let mut cache = RenderCache::default();
    let mut failures: Vec<String> = Vec::new();

    for handler in chain.iter().flat_map(|snapshot| snapshot.iter()) {
        if !handler.accepts(level) {
            continue;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let line = cache.line(handler.formatter(), &record);
            handler.write_line(level, &line)
        }));

        match outcome {
            Ok(Ok(())) => {
                context.metrics.record_handler_write();
            }
            Ok(Err(e)) => {
                context.metrics.record_handler_failure();
                failures.push(format!("handler '{}' failed: {}", handler.name(), e));
            }
            Err(payload) => {
                context.metrics.record_handler_failure();
                failures.push(format!(
                    "handler '{}' panicked: {}",
                    handler.name(),
                    panic_message(payload.as_ref())
                ));
            }
        }
    }

    if !failures.is_empty() {
        let logger = if node.is_root() { "root" } else { node.name() };
        context.diagnostics.report(&format!(
            "logger '{}' ({}): {}",
            logger,
            level,
            failures.join("; ")
        ));
    }
}
