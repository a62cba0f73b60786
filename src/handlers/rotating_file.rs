//! Rotating file sink
//!
//! Before every write the sink asks its [`RotationPolicy`] whether the pending
//! line would push the active file past `max_bytes`. Rotation and the write that
//! triggered it happen under the owning handler's lock, so no line is lost or
//! duplicated across a rotation boundary.

use super::encoding::Encoding;
use super::rotation::{self, RotationPolicy};
use crate::core::error::{LoggerError, Result};
use crate::core::{LogLevel, Sink};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How the active file is opened at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    #[default]
    Append,
    Truncate,
}

impl FromStr for FileMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "a" | "append" => Ok(FileMode::Append),
            "w" | "truncate" => Ok(FileMode::Truncate),
            other => Err(format!("Invalid file mode: '{}'", other)),
        }
    }
}

/// Rotating file sink
///
/// # Examples
///
/// ```no_run
/// use rust_logger_hierarchy::handlers::{Handler, RotatingFileSink, RotationPolicy};
///
/// let policy = RotationPolicy::new()
///     .with_max_bytes(5 * 1024 * 1024)
///     .with_backup_count(3);
/// let sink = RotatingFileSink::with_policy("/var/log/app.log", policy).unwrap();
/// let handler = Handler::new("file", sink);
/// ```
pub struct RotatingFileSink {
    base_path: PathBuf,
    policy: RotationPolicy,
    encoding: Encoding,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    rotations: u64,
}

impl RotatingFileSink {
    /// Open with the default policy, appending to an existing file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        Self::with_options(path, policy, FileMode::Append, Encoding::Utf8)
    }

    /// # Errors
    ///
    /// Returns error if the parent directory or the file cannot be created or opened
    pub fn with_options<P: AsRef<Path>>(
        path: P,
        policy: RotationPolicy,
        mode: FileMode,
        encoding: Encoding,
    ) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "create log directory",
                        format!("Failed to create directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let (file, current_size) = Self::open_file(&base_path, mode)?;

        Ok(Self {
            base_path,
            policy,
            encoding,
            writer: Some(BufWriter::new(file)),
            current_size,
            rotations: 0,
        })
    }

    fn open_file(path: &Path, mode: FileMode) -> Result<(File, u64)> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            FileMode::Append => options.append(true),
            FileMode::Truncate => options.write(true).truncate(true),
        };

        let file = options.open(path).map_err(|e| {
            LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
        })?;
        let size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        Ok((file, size))
    }

    /// Close the active file, shift backups and open a fresh active file
    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        rotation::rotate_backups(&self.base_path, &self.policy)?;

        let (file, _) = Self::open_file(&self.base_path, FileMode::Truncate).map_err(|e| {
            LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;

        self.writer = Some(BufWriter::new(file));
        self.current_size = 0;
        self.rotations += 1;
        Ok(())
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Number of successful rotations since the sink was opened
    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.rotations
    }
}

impl Sink for RotatingFileSink {
    fn name(&self) -> &str {
        "rotating-file"
    }

    fn write_line(&mut self, _level: LogLevel, line: &str) -> Result<()> {
        let mut payload = self.encoding.encode(line);
        payload.push(b'\n');
        let pending = payload.len() as u64;

        // An empty active file is never rotated; an oversized line goes into it as is
        let mut rotation_error = None;
        if self.current_size > 0 && self.policy.should_rotate(self.current_size, pending) {
            if let Err(e) = self.rotate() {
                if self.writer.is_none() {
                    match Self::open_file(&self.base_path, FileMode::Append) {
                        Ok((file, size)) => {
                            self.writer = Some(BufWriter::new(file));
                            self.current_size = size;
                        }
                        Err(_) => return Err(e),
                    }
                }
                // Let the file grow past the limit rather than retry on every write
                self.current_size = 0;
                rotation_error = Some(e);
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File writer not initialized"))?;
        writer
            .write_all(&payload)
            .and_then(|_| writer.flush())
            .map_err(|e| {
                LoggerError::file_sink(
                    self.base_path.display().to_string(),
                    format!("Failed to write log entry: {}", e),
                )
            })?;
        self.current_size += pending;

        match rotation_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.writer = None;
        Ok(())
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            // Best effort flush - ignore errors during drop
            let _ = writer.flush();
        }
    }
}
