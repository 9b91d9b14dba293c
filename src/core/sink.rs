//! Sink trait for log output destinations
//!
//! The sink set is closed: console, file, database, and email. Every sink
//! synchronizes its own handle internally, so `write` takes `&self` and the
//! logger never holds a lock across a write to a different sink.

use super::error::SinkResult;
use super::record::Record;
use super::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of sink kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Console,
    File,
    Database,
    Email,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Database => "database",
            SinkKind::Email => "email",
        }
    }

    /// Deferred kinds are the high-latency path: their writes are queued to
    /// the logger's worker thread instead of running on the caller.
    pub fn is_deferred(&self) -> bool {
        matches!(self, SinkKind::Database | SinkKind::Email)
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Acknowledgment of a completed sink write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    pub kind: SinkKind,
}

impl WriteAck {
    pub fn new(kind: SinkKind) -> Self {
        Self { kind }
    }
}

pub trait Sink: Send + Sync {
    fn kind(&self) -> SinkKind;

    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Cheap check performed by the logger before formatting.
    fn is_enabled(&self) -> bool;

    /// Toggle the sink at runtime; affects subsequently created records.
    fn set_enabled(&self, enabled: bool);

    fn min_severity(&self) -> Severity;

    /// Cheap check performed by the logger before formatting.
    fn meets_threshold(&self, severity: Severity) -> bool {
        severity >= self.min_severity()
    }

    /// Write a record. All I/O failure is converted to a [`SinkError`]
    /// value; implementations must not panic past this boundary.
    ///
    /// [`SinkError`]: crate::core::error::SinkError
    fn write(&self, record: &Record) -> SinkResult<WriteAck>;

    fn flush(&self) -> SinkResult<()> {
        Ok(())
    }

    /// Deliver an alarm notification through this sink.
    ///
    /// Only the email sink supports this; the default declines.
    fn send_alarm(&self, notice: &crate::core::alarm::AlarmNotice) -> SinkResult<()> {
        let _ = notice;
        Err(crate::core::error::SinkError::rejected(
            self.name(),
            "sink does not deliver alarms",
        ))
    }

    /// Release held resources. Must be idempotent: a second call has the
    /// same observable effect as the first.
    fn close(&self);
}
