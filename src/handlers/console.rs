//! Console sink implementation

use crate::core::{LogLevel, Result, Sink};
#[cfg(feature = "console")]
use colored::Colorize;
use std::io::Write;
use std::str::FromStr;

/// Standard stream a console sink writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleStream {
    Stdout,
    #[default]
    Stderr,
}

impl FromStr for ConsoleStream {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "stdout" | "ext://sys.stdout" => Ok(ConsoleStream::Stdout),
            "stderr" | "ext://sys.stderr" => Ok(ConsoleStream::Stderr),
            other => Err(format!("Invalid console stream: '{}'", other)),
        }
    }
}

pub struct ConsoleSink {
    stream: ConsoleStream,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new(stream: ConsoleStream) -> Self {
        Self {
            stream,
            use_colors: false,
        }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleStream::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleStream::Stderr)
    }

    /// Color whole lines by level (requires the `console` feature)
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn stream(&self) -> ConsoleStream {
        self.stream
    }

    #[cfg(feature = "console")]
    fn paint(&self, level: LogLevel, line: &str) -> String {
        if self.use_colors {
            line.color(level.color_code()).to_string()
        } else {
            line.to_string()
        }
    }

    #[cfg(not(feature = "console"))]
    fn paint(&self, _level: LogLevel, line: &str) -> String {
        line.to_string()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl Sink for ConsoleSink {
    fn write_line(&mut self, level: LogLevel, line: &str) -> Result<()> {
        let mut output = self.paint(level, line);
        output.push('\n');

        // One write_all under the stream lock keeps the line whole
        match self.stream {
            ConsoleStream::Stdout => {
                let mut handle = std::io::stdout().lock();
                handle.write_all(output.as_bytes())?;
                handle.flush()?;
            }
            ConsoleStream::Stderr => {
                let mut handle = std::io::stderr().lock();
                handle.write_all(output.as_bytes())?;
                handle.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.stream {
            ConsoleStream::Stdout => std::io::stdout().flush()?,
            ConsoleStream::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
