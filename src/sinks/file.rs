//! File sink with size- and time-based rotation
//!
//! Appends formatted lines to a log file, rotating to numbered backups
//! (`app.log.1`, `app.log.2`, ...) when the configured size or age is
//! exceeded. Rotated segments can be gzip-compressed. A rotation failure
//! degrades to continuing on the current file and reporting the error,
//! never to losing the record.

use crate::core::{
    ConfigError, Formatter, Record, Severity, Sink, SinkError, SinkKind, SinkResult, WriteAck,
};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// When and how the file sink rotates.
///
/// # Examples
///
/// ```
/// use fanlog::sinks::RotationPolicy;
/// use std::time::Duration;
///
/// // Rotate past 50 MB, keep a week of segments, compress them
/// let policy = RotationPolicy::size(50 * 1024 * 1024)
///     .with_max_backups(7)
///     .with_compression(true);
///
/// // Rotate hourly instead
/// let policy = RotationPolicy::time(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RotationPolicy {
    /// Rotate when the current segment exceeds this many bytes
    pub max_bytes: Option<u64>,
    /// Rotate when the current segment is older than this
    pub interval: Option<Duration>,
    /// Rotated segments kept before the oldest is deleted
    pub max_backups: usize,
    /// Gzip rotated segments
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: Some(10 * 1024 * 1024), // 10 MB
            interval: None,
            max_backups: 5,
            compress: false,
        }
    }
}

impl RotationPolicy {
    /// Size-based rotation
    #[must_use]
    pub fn size(max_bytes: u64) -> Self {
        Self {
            max_bytes: Some(max_bytes),
            ..Default::default()
        }
    }

    /// Time-based rotation
    #[must_use]
    pub fn time(interval: Duration) -> Self {
        Self {
            max_bytes: None,
            interval: Some(interval),
            ..Default::default()
        }
    }

    /// No rotation (useful for testing or when external rotation is used)
    #[must_use]
    pub fn never() -> Self {
        Self {
            max_bytes: None,
            interval: None,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

struct FileState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    opened_at: SystemTime,
}

/// Appending file sink. The handle is guarded by its own mutex, so writes
/// from concurrent callers serialize here and nowhere else.
pub struct FileSink {
    path: PathBuf,
    policy: RotationPolicy,
    formatter: Formatter,
    min_severity: Severity,
    enabled: AtomicBool,
    closed: AtomicBool,
    state: Mutex<FileState>,
    rotation_failures: AtomicU64,
}

impl FileSink {
    /// Open (creating if necessary) the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the destination cannot be prepared.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Open the log file with a custom rotation policy.
    pub fn with_policy(
        path: impl Into<PathBuf>,
        policy: RotationPolicy,
    ) -> Result<Self, ConfigError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::io(parent.display().to_string(), e))?;
            }
        }

        let file = Self::open_append(&path)?;
        let current_size = file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;

        Ok(Self {
            path,
            policy,
            formatter: Formatter::default(),
            min_severity: Severity::Debug,
            enabled: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            state: Mutex::new(FileState {
                writer: Some(BufWriter::new(file)),
                current_size,
                opened_at: SystemTime::now(),
            }),
            rotation_failures: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Path of the current log segment.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotation failures seen so far; the sink keeps writing to the current
    /// segment when rotation fails.
    pub fn rotation_failures(&self) -> u64 {
        self.rotation_failures.load(Ordering::Relaxed)
    }

    fn open_append(path: &Path) -> Result<File, ConfigError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;

        // Best-effort advisory lock; a contended lock is reported, not fatal.
        if file.try_lock_exclusive().is_err() {
            eprintln!(
                "[FANLOG WARNING] could not acquire exclusive lock on '{}', \
                 another process may interleave writes",
                path.display()
            );
        }
        Ok(file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let suffix = if self.policy.compress { ".gz" } else { "" };
        PathBuf::from(format!("{}.{}{}", self.path.display(), index, suffix))
    }

    fn needs_rotation(&self, state: &FileState, pending_bytes: u64) -> bool {
        if let Some(max_bytes) = self.policy.max_bytes {
            if state.current_size + pending_bytes > max_bytes {
                return true;
            }
        }
        if let Some(interval) = self.policy.interval {
            if let Ok(age) = state.opened_at.elapsed() {
                if age >= interval {
                    return true;
                }
            }
        }
        false
    }

    /// Rotate the current segment into the numbered backups.
    ///
    /// The open writer is replaced only once the whole rotation has
    /// succeeded; any failure leaves it in place so writing continues on
    /// the current segment.
    fn rotate(&self, state: &mut FileState) -> std::io::Result<()> {
        if let Some(writer) = state.writer.as_mut() {
            writer.flush()?;
        }

        self.shift_backups()?;

        let file = Self::open_append(&self.path).map_err(|e| {
            std::io::Error::other(format!(
                "could not reopen '{}' after rotation: {}",
                self.path.display(),
                e
            ))
        })?;
        state.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        state.opened_at = SystemTime::now();
        state.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn shift_backups(&self) -> std::io::Result<()> {
        if self.policy.max_backups == 0 {
            return fs::remove_file(&self.path);
        }

        // Oldest segment falls off the end.
        let oldest = self.backup_path(self.policy.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.policy.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }

        if self.policy.compress {
            self.compress_into(&self.backup_path(1))?;
            fs::remove_file(&self.path)
        } else {
            fs::rename(&self.path, self.backup_path(1))
        }
    }

    fn compress_into(&self, target: &Path) -> std::io::Result<()> {
        let mut input = File::open(&self.path)?;
        let output = File::create(target)?;
        let mut encoder =
            flate2::write::GzEncoder::new(BufWriter::new(output), flate2::Compression::default());
        std::io::copy(&mut input, &mut encoder)?;
        encoder.finish()?.flush()
    }
}

impl Sink for FileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed) && !self.closed.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn write(&self, record: &Record) -> SinkResult<WriteAck> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(SinkError::rejected(self.name(), "sink is closed"));
        }

        let mut line = self.formatter.render_with_context(record);
        line.push('\n');
        let bytes = line.len() as u64;

        let mut state = self.state.lock();

        if self.needs_rotation(&state, bytes) {
            if let Err(e) = self.rotate(&mut state) {
                // Keep writing to the existing segment and report.
                self.rotation_failures.fetch_add(1, Ordering::Relaxed);
                eprintln!(
                    "[FANLOG ERROR] rotation of '{}' failed: {}",
                    self.path.display(),
                    e
                );
            }
        }

        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::rejected(self.name(), "file writer not initialized"))?;

        writer
            .write_all(line.as_bytes())
            .map_err(|e| SinkError::from_io(self.name(), &e))?;
        writer
            .flush()
            .map_err(|e| SinkError::from_io(self.name(), &e))?;
        state.current_size += bytes;

        Ok(WriteAck::new(SinkKind::File))
    }

    fn flush(&self) -> SinkResult<()> {
        let mut state = self.state.lock();
        if let Some(ref mut writer) = state.writer {
            writer
                .flush()
                .map_err(|e| SinkError::from_io(self.name(), &e))?;
        }
        Ok(())
    }

    fn close(&self) {
        // Idempotent: the writer is dropped exactly once.
        if !self.closed.swap(true, Ordering::SeqCst) {
            let mut state = self.state.lock();
            if let Some(mut writer) = state.writer.take() {
                let _ = writer.flush();
            }
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_write_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let sink = FileSink::new(&path).unwrap();

        sink.write(&Record::new(Severity::Info, "one".to_string()))
            .unwrap();
        sink.write(&Record::new(Severity::Error, "two".to_string()))
            .unwrap();
        sink.flush().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("one"));
        assert!(lines[1].contains("two"));
    }

    #[test]
    fn test_size_rotation_keeps_all_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rotating.log");
        let policy = RotationPolicy::size(1000).with_max_backups(5);
        let sink = FileSink::with_policy(&path, policy).unwrap();

        for i in 0..40 {
            sink.write(&Record::new(Severity::Info, format!("record number {}", i)))
                .unwrap();
        }
        sink.close();

        let mut total = read_lines(&path).len();
        let mut segments = 1;
        for index in 1..=5 {
            let backup = PathBuf::from(format!("{}.{}", path.display(), index));
            if backup.exists() {
                segments += 1;
                total += read_lines(&backup).len();
            }
        }
        assert!(segments >= 2, "expected at least two segments");
        assert_eq!(total, 40, "no record may be lost across rotation");
    }

    #[test]
    fn test_compressed_rotation_produces_gz_segment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gz.log");
        let policy = RotationPolicy::size(200)
            .with_max_backups(2)
            .with_compression(true);
        let sink = FileSink::with_policy(&path, policy).unwrap();

        for i in 0..20 {
            sink.write(&Record::new(Severity::Info, format!("padding line {}", i)))
                .unwrap();
        }
        sink.close();

        let gz = PathBuf::from(format!("{}.1.gz", path.display()));
        assert!(gz.exists(), "compressed backup should exist");
    }

    #[test]
    fn test_never_policy_does_not_rotate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat.log");
        let sink = FileSink::with_policy(&path, RotationPolicy::never()).unwrap();

        for i in 0..50 {
            sink.write(&Record::new(Severity::Info, format!("line {}", i)))
                .unwrap();
        }
        sink.close();

        assert_eq!(read_lines(&path).len(), 50);
        assert!(!PathBuf::from(format!("{}.1", path.display())).exists());
    }

    #[test]
    fn test_failed_rotation_keeps_writing_to_current_segment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("victim.log");
        let sink = FileSink::with_policy(&path, RotationPolicy::size(200)).unwrap();

        sink.write(&Record::new(Severity::Info, "before".to_string()))
            .unwrap();

        // Pull the directory out from under the sink so the rename step of
        // every rotation attempt fails.
        fs::remove_dir_all(dir.path().join("sub")).unwrap();

        for i in 0..10 {
            sink.write(&Record::new(Severity::Info, format!("after {}", i)))
                .unwrap();
        }

        assert!(sink.rotation_failures() > 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path().join("c.log")).unwrap();
        sink.close();
        sink.close();
        assert!(matches!(
            sink.write(&Record::new(Severity::Info, "x".to_string())),
            Err(SinkError::Rejected { .. })
        ));
    }
}
