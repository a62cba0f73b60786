//! Dispatch metrics for observability
//!
//! Counters describing how records moved through the pipeline: how many were
//! admitted by their logger, how many were filtered out before a record was
//! built, and how handler writes went.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use rust_logger_hierarchy::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_emitted();
/// metrics.record_handler_write();
/// metrics.record_handler_failure();
///
/// assert_eq!(metrics.records_emitted(), 1);
/// assert_eq!(metrics.failure_rate(), 50.0);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records that passed the logger's effective level
    records_emitted: AtomicU64,

    /// Records dropped by the logger's effective level (message never produced)
    records_filtered: AtomicU64,

    /// Successful handler writes
    handler_writes: AtomicU64,

    /// Failed handler writes (errors and panics)
    handler_failures: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            records_emitted: AtomicU64::new(0),
            records_filtered: AtomicU64::new(0),
            handler_writes: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_emitted(&self) -> u64 {
        self.records_emitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn records_filtered(&self) -> u64 {
        self.records_filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn handler_writes(&self) -> u64 {
        self.handler_writes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_emitted(&self) -> u64 {
        self.records_emitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.records_filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_handler_write(&self) -> u64 {
        self.handler_writes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_handler_failure(&self) -> u64 {
        self.handler_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed handler writes as a percentage (0.0 - 100.0) of all attempts
    ///
    /// Returns 0.0 if no handler write was attempted.
    pub fn failure_rate(&self) -> f64 {
        let failed = self.handler_failures() as f64;
        let total = self.handler_writes() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.records_emitted.store(0, Ordering::Relaxed);
        self.records_filtered.store(0, Ordering::Relaxed);
        self.handler_writes.store(0, Ordering::Relaxed);
        self.handler_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            records_emitted: AtomicU64::new(self.records_emitted()),
            records_filtered: AtomicU64::new(self.records_filtered()),
            handler_writes: AtomicU64::new(self.handler_writes()),
            handler_failures: AtomicU64::new(self.handler_failures()),
        }
    }
}
