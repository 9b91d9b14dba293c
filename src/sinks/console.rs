//! Console sink implementation

use crate::core::{Formatter, Record, Severity, Sink, SinkError, SinkKind, SinkResult, WriteAck};
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Writes records to the standard streams: stdout below `ERROR`, stderr at
/// `ERROR` and above. Stream writes are line-buffered by the standard
/// library's own locks, so no extra synchronization is needed here.
pub struct ConsoleSink {
    enabled: AtomicBool,
    closed: AtomicBool,
    min_severity: Severity,
    formatter: Formatter,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            min_severity: Severity::Debug,
            formatter: Formatter::default(),
            use_colors: true,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Set the format template for this sink
    ///
    /// # Example
    ///
    /// ```
    /// use fanlog::sinks::ConsoleSink;
    /// use fanlog::core::Formatter;
    ///
    /// let sink = ConsoleSink::new()
    ///     .with_formatter(Formatter::new("{severity}: {message}"));
    /// ```
    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Console
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

        let line = self.formatter.render_with_context(record);
        let line = if self.use_colors {
            line.color(record.severity.color_code()).to_string()
        } else {
            line
        };

        // Stream failure is effectively impossible but still wrapped for
        // interface symmetry.
        if record.severity.is_error() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
        Ok(WriteAck::new(SinkKind::Console))
    }

    fn flush(&self) -> SinkResult<()> {
        use std::io::Write;
        // Flush both stdout and stderr since we write to both
        std::io::stdout()
            .flush()
            .map_err(|e| SinkError::from_io(self.name(), &e))?;
        std::io::stderr()
            .flush()
            .map_err(|e| SinkError::from_io(self.name(), &e))?;
        Ok(())
    }

    fn close(&self) {
        // Idempotent: only the first call flushes.
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.flush();
        }
    }
}
