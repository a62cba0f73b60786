//! Fallback channel for problems the engine cannot log through itself
//!
//! Sink and rotation failures never reach the caller of `emit`. They are
//! reported here instead, once per dispatched record, on standard error by
//! default or through a user supplied callback.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives one diagnostic line per failed dispatch
pub type DiagnosticCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub struct Diagnostics {
    callback: Option<DiagnosticCallback>,
    reported: AtomicU64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            callback: None,
            reported: AtomicU64::new(0),
        }
    }

    pub fn with_callback(callback: DiagnosticCallback) -> Self {
        Self {
            callback: Some(callback),
            reported: AtomicU64::new(0),
        }
    }

    /// Best-effort report; never panics even if standard error is gone
    pub fn report(&self, message: &str) {
        self.reported.fetch_add(1, Ordering::Relaxed);

        match self.callback {
            Some(ref callback) => {
                let isolated = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    callback(message)
                }));
                if isolated.is_err() {
                    Self::write_stderr(message);
                }
            }
            None => Self::write_stderr(message),
        }
    }

    fn write_stderr(message: &str) {
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        let _ = writeln!(handle, "[LOGGER ERROR] {}", message);
    }

    /// Number of diagnostics reported so far
    pub fn reported_count(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("has_callback", &self.callback.is_some())
            .field("reported", &self.reported_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_callback_receives_reports() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let diagnostics =
            Diagnostics::with_callback(Arc::new(move |msg: &str| sink.lock().push(msg.to_string())));

        diagnostics.report("handler 'file' failed");

        assert_eq!(diagnostics.reported_count(), 1);
        assert_eq!(seen.lock().as_slice(), ["handler 'file' failed"]);
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let diagnostics = Diagnostics::with_callback(Arc::new(|_: &str| panic!("callback broke")));
        diagnostics.report("still counted");
        assert_eq!(diagnostics.reported_count(), 1);
    }
}
