//! Size based rotation policy and backup retention
//!
//! Backups live beside the active file as `<file>.1` (newest) up to
//! `<file>.<backup_count>` (oldest), or `<file>.<n>.gz` when compression is on.

use crate::core::error::{LoggerError, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Default rotation threshold (10 MB)
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of retained backups
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Whether appending `pending_bytes` to a file of `current_size` bytes crosses `max_bytes`
///
/// A `max_bytes` of zero disables rotation.
///
/// # Examples
///
/// ```
/// use rust_logger_hierarchy::handlers::should_rotate;
///
/// assert!(!should_rotate(90, 10, 100));
/// assert!(should_rotate(91, 10, 100));
/// assert!(!should_rotate(1_000_000, 10, 0));
/// ```
#[inline]
pub fn should_rotate(current_size: u64, pending_bytes: u64, max_bytes: u64) -> bool {
    max_bytes > 0 && current_size.saturating_add(pending_bytes) > max_bytes
}

/// When a file sink rotates and how much history it keeps
///
/// # Examples
///
/// ```
/// use rust_logger_hierarchy::handlers::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_bytes(50 * 1024 * 1024)
///     .with_backup_count(7)
///     .with_compression(true);
///
/// assert!(policy.should_rotate(50 * 1024 * 1024, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size threshold in bytes; 0 disables rotation
    pub max_bytes: u64,
    /// Number of rotated files to keep; 0 discards rotated content
    pub backup_count: usize,
    /// Whether to gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that never rotates
    #[must_use]
    pub fn never() -> Self {
        Self {
            max_bytes: 0,
            backup_count: 0,
            compress: false,
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    #[inline]
    pub fn should_rotate(&self, current_size: u64, pending_bytes: u64) -> bool {
        should_rotate(current_size, pending_bytes, self.max_bytes)
    }
}

/// Path of the `index`-th backup of `base`
pub fn backup_path(base: &Path, index: usize, compressed: bool) -> PathBuf {
    let filename = base
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("app.log");
    let mut path = base.to_path_buf();
    if compressed {
        path.set_file_name(format!("{}.{}.gz", filename, index));
    } else {
        path.set_file_name(format!("{}.{}", filename, index));
    }
    path
}

/// Backup indices currently present beside `base`, in ascending order
pub fn existing_backups(base: &Path) -> Vec<(usize, PathBuf)> {
    let Some(filename) = base.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let dir = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let prefix = format!("{}.", filename);
    let mut backups: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            let suffix = name.strip_prefix(&prefix)?;
            let digits = suffix.strip_suffix(".gz").unwrap_or(suffix);
            let index = digits.parse::<usize>().ok()?;
            (index > 0).then(|| (index, entry.path()))
        })
        .collect();
    backups.sort();
    backups
}

fn rename_backup(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Ok(());
    }
    // Some platforms refuse to rename over an existing file
    if fs::rename(from, to).is_err() {
        if to.exists() {
            let _ = fs::remove_file(to);
        }
        fs::rename(from, to).map_err(|e| {
            LoggerError::file_rotation(
                from.display().to_string(),
                format!("Failed to shift backup file: {}", e),
            )
        })?;
    }
    Ok(())
}

/// Shift backups up by one, drop whatever falls beyond `backup_count`, and
/// move the (already closed) active file to `.1`
///
/// With a `backup_count` of zero the active file's content is discarded.
pub(crate) fn rotate_backups(base: &Path, policy: &RotationPolicy) -> Result<()> {
    let keep = policy.backup_count;

    if keep == 0 {
        if base.exists() {
            fs::remove_file(base).map_err(|e| {
                LoggerError::file_rotation(
                    base.display().to_string(),
                    format!("Failed to discard rotated log file: {}", e),
                )
            })?;
        }
        return Ok(());
    }

    // Oldest retained slot is about to be overwritten; anything past it is stale
    for (index, path) in existing_backups(base) {
        let superseded = policy.compress
            && path.extension().map_or(true, |ext| ext != "gz")
            && backup_path(base, index, true).exists();
        if index >= keep || superseded {
            fs::remove_file(&path).map_err(|e| {
                LoggerError::file_rotation(
                    path.display().to_string(),
                    format!("Failed to remove old backup: {}", e),
                )
            })?;
        }
    }

    for index in (1..keep).rev() {
        rename_backup(
            &backup_path(base, index, false),
            &backup_path(base, index + 1, false),
        )?;
        rename_backup(
            &backup_path(base, index, true),
            &backup_path(base, index + 1, true),
        )?;
    }

    let first = backup_path(base, 1, false);
    if base.exists() {
        fs::rename(base, &first).map_err(|e| {
            LoggerError::file_rotation(
                base.display().to_string(),
                format!("Failed to rotate current log file: {}", e),
            )
        })?;

        if policy.compress {
            compress_file(&first, &backup_path(base, 1, true))?;
        }
    }

    Ok(())
}

/// Gzip `path` into `gz_path`, removing `path` only once compression succeeded
fn compress_file(path: &Path, gz_path: &Path) -> Result<()> {
    use std::io::{BufReader, BufWriter};

    let mut temp_name = gz_path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_gz_path = PathBuf::from(temp_name);

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary compressed file: {}", temp_gz_path.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let streamed = std::io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| std::io::Write::flush(&mut writer));
    if let Err(e) = streamed {
        let _ = fs::remove_file(&temp_gz_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    fs::rename(&temp_gz_path, gz_path).map_err(|e| {
        let _ = fs::remove_file(&temp_gz_path);
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to rename compressed file to: {}", gz_path.display()),
            e,
        )
    })?;

    // Compression succeeded; a leftover original is dropped by the next rotation
    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but failed to remove original: {}",
            path.display(),
            e
        );
    }

    Ok(())
}
