//! Sink trait for raw log output destinations
//!
//! A sink receives fully formatted lines. It is always driven through the
//! owning [`Handler`](crate::handlers::Handler), which serializes access.

use super::{error::Result, log_level::LogLevel};

pub trait Sink: Send {
    /// Write one formatted line; the sink appends the line terminator
    fn write_line(&mut self, level: LogLevel, line: &str) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Release the underlying resource; later writes fail
    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str;
}
