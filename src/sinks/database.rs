//! Database sink implementation
//!
//! Writes one row per record into a configurable table through an externally
//! supplied [`LogStore`] connection. The sink owns neither pooling nor
//! schema migration; those stay with the database collaborator. Transient
//! failures are retried a bounded number of times with exponential backoff
//! before being surfaced as `SinkError::Unavailable`.

use crate::core::{Record, Severity, Sink, SinkError, SinkKind, SinkResult, WriteAck};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One row of the logging table.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub table: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    /// Context fields serialized as a JSON blob, when present
    pub context: Option<String>,
    pub source_location: Option<String>,
}

/// Connection/session collaborator the database sink writes through.
///
/// Implementations translate a [`LogRow`] into whatever statement their
/// backend expects. Pooling and schema management are their concern.
pub trait LogStore: Send + Sync {
    fn execute(&self, row: &LogRow) -> SinkResult<()>;
}

/// Bounded retry with exponential backoff for transient store failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles per retry with jitter
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry `attempt` (1-based), with up to 25% jitter to
    /// keep concurrent retries from synchronizing.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.saturating_mul(1 << attempt.min(16).saturating_sub(1));
        if base.is_zero() {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0.0..0.25);
        base.mul_f64(1.0 + jitter)
    }

    /// Run `operation`, retrying transient failures up to `max_retries`
    /// times. Runs on the deferred worker thread, so sleeping here never
    /// stalls a logging call.
    pub fn run<T>(&self, mut operation: impl FnMut() -> SinkResult<T>) -> SinkResult<T> {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    std::thread::sleep(self.backoff(attempt));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Writes records as table rows through a [`LogStore`].
pub struct DatabaseSink {
    store: Arc<dyn LogStore>,
    table: String,
    min_severity: Severity,
    enabled: AtomicBool,
    closed: AtomicBool,
    retry: RetryPolicy,
}

impl DatabaseSink {
    pub fn new(store: Arc<dyn LogStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            min_severity: Severity::Debug,
            enabled: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn row_for(&self, record: &Record) -> LogRow {
        LogRow {
            table: self.table.clone(),
            timestamp: record.timestamp,
            severity: record.severity,
            message: record.message.clone(),
            context: record
                .context
                .as_ref()
                .filter(|c| !c.is_empty())
                .map(|c| c.to_json_blob()),
            source_location: record.source_location(),
        }
    }
}

impl Sink for DatabaseSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Database
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

        let row = self.row_for(record);
        self.retry.run(|| self.store.execute(&row))?;
        Ok(WriteAck::new(SinkKind::Database))
    }

    fn close(&self) {
        // The connection belongs to the collaborator; closing here only
        // stops further writes.
        self.closed.store(true, Ordering::SeqCst);
    }
}
