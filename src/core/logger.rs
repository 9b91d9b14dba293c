//! Main logger implementation
//!
//! The [`Logger`] owns an ordered collection of sinks and an optional alarm
//! dispatcher. A logging call builds one [`Record`], fans it out to every
//! enabled sink whose threshold it meets, then consults the dispatcher.
//! Console and file writes run on the caller; database and email writes are
//! queued to a worker thread so the high-latency path can never stall
//! unrelated logging. No failure propagates back to the caller.

use super::alarm::{AlarmConfig, AlarmDispatcher, AlarmNotice};
use super::context::RecordContext;
use super::error::{SinkError, SinkResult};
use super::metrics::LoggerMetrics;
use super::record::Record;
use super::severity::Severity;
use super::sink::{Sink, SinkKind};
use crate::collab::Sysinfo;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// This timeout is used when the logger is dropped without explicit shutdown.
/// For custom timeout control, use the `shutdown()` method instead.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default capacity of the deferred-write queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Callback invoked for every sink failure when configured.
pub type ErrorObserver = Arc<dyn Fn(&SinkError) + Send + Sync>;

enum DeferredJob {
    Write {
        sink: Arc<dyn Sink>,
        record: Arc<Record>,
    },
    Alarm(AlarmNotice),
}

pub struct Logger {
    name: String,
    sinks: Arc<RwLock<Vec<Arc<dyn Sink>>>>,
    alarms: Option<Arc<AlarmDispatcher>>,
    sender: Option<Sender<DeferredJob>>,
    worker: Option<thread::JoinHandle<()>>,
    metrics: Arc<LoggerMetrics>,
    observer: Option<ErrorObserver>,
    sysinfo: Option<Arc<dyn Sysinfo>>,
    /// Last issued timestamp, clamped non-decreasing per logger
    last_stamp: Mutex<DateTime<Utc>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("sinks", &self.sinks.read().len())
            .field("alarms", &self.alarms.is_some())
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Create a builder for a named logger
    ///
    /// # Example
    /// ```
    /// use fanlog::prelude::*;
    ///
    /// let logger = Logger::builder("app").build();
    /// logger.info("started");
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the logger metrics for observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    #[inline]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(Severity::Critical, message);
    }

    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        self.dispatch(Record::new(severity, message.into()));
    }

    /// Log with structured context fields
    pub fn log_with_context(
        &self,
        severity: Severity,
        message: impl Into<String>,
        context: RecordContext,
    ) {
        self.dispatch(Record::new(severity, message.into()).with_context(context));
    }

    /// Log with an explicit source location; used by the logging macros.
    pub fn log_at(
        &self,
        severity: Severity,
        message: impl Into<String>,
        file: &str,
        line: u32,
        module_path: &str,
    ) {
        self.dispatch(Record::new(severity, message.into()).with_location(
            file,
            line,
            module_path,
        ));
    }

    /// Add a sink at runtime; affects subsequently created records only.
    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.sinks.write().push(sink);
    }

    /// Remove the first sink of `kind`, returning it.
    ///
    /// The sink is not closed here: writes already queued to the deferred
    /// lane still hold a reference and complete normally.
    pub fn remove_sink(&self, kind: SinkKind) -> Option<Arc<dyn Sink>> {
        let mut sinks = self.sinks.write();
        let position = sinks.iter().position(|s| s.kind() == kind)?;
        Some(sinks.remove(position))
    }

    /// Toggle the first sink of `kind`; returns false when absent.
    pub fn set_sink_enabled(&self, kind: SinkKind, enabled: bool) -> bool {
        let sinks = self.sinks.read();
        match sinks.iter().find(|s| s.kind() == kind) {
            Some(sink) => {
                sink.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    fn dispatch(&self, mut record: Record) {
        if let Some(ref sysinfo) = self.sysinfo {
            let snapshot = sysinfo.snapshot();
            if !snapshot.is_empty() {
                record
                    .context
                    .get_or_insert_with(RecordContext::new)
                    .merge_defaults(&snapshot);
            }
        }

        // Timestamps are non-decreasing within one logger, even if the wall
        // clock steps backwards.
        {
            let mut last = self.last_stamp.lock();
            if record.timestamp < *last {
                record.timestamp = *last;
            } else {
                *last = record.timestamp;
            }
        }

        // Snapshot under a brief read lock; no lock is held across writes.
        let snapshot: Vec<Arc<dyn Sink>> = self.sinks.read().iter().cloned().collect();
        let record = Arc::new(record);

        let mut delivered = false;
        for sink in snapshot {
            if !(sink.is_enabled() && sink.meets_threshold(record.severity)) {
                continue;
            }
            delivered = true;
            if sink.kind().is_deferred() {
                self.enqueue(DeferredJob::Write {
                    sink,
                    record: Arc::clone(&record),
                });
            } else {
                Self::write_isolated(&sink, &record, &self.metrics, &self.observer);
            }
        }

        if delivered {
            self.metrics.record_logged();
        } else {
            self.metrics.record_filtered();
        }

        if let Some(ref alarms) = self.alarms {
            if let Some(notice) = alarms.consider(&record) {
                self.metrics.record_alarm_fired();
                self.metrics.record_alarms_suppressed(notice.suppressed);
                self.enqueue(DeferredJob::Alarm(notice));
            }
        }
    }

    /// Write to one sink with panic isolation; a failing or panicking sink
    /// never prevents delivery to the others.
    fn write_isolated(
        sink: &Arc<dyn Sink>,
        record: &Record,
        metrics: &Arc<LoggerMetrics>,
        observer: &Option<ErrorObserver>,
    ) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.write(record)));
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => Self::report_failure(metrics, observer, &e),
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                let error = SinkError::rejected(
                    sink.name(),
                    format!("sink panicked: {}", panic_msg),
                );
                Self::report_failure(metrics, observer, &error);
            }
        }
    }

    fn report_failure(
        metrics: &Arc<LoggerMetrics>,
        observer: &Option<ErrorObserver>,
        error: &SinkError,
    ) {
        metrics.record_sink_failure();
        match observer {
            Some(callback) => callback(error),
            // Last resort: one self-log to the console fallback, never back
            // into the logger (which would recurse).
            None => eprintln!("[FANLOG ERROR] {}", error),
        }
    }

    fn enqueue(&self, job: DeferredJob) {
        let Some(ref sender) = self.sender else {
            // No worker thread: run the job on the caller. Degraded but
            // nothing is lost.
            self.run_inline(job);
            return;
        };

        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.metrics.record_queue_full();
                let dropped = self.metrics.record_deferred_dropped();
                // Alert on the first drop and periodically thereafter.
                if dropped == 0 || (dropped + 1) % 1000 == 0 {
                    let error = SinkError::unavailable(
                        "deferred",
                        format!("queue full, {} deferred writes dropped", dropped + 1),
                    );
                    match &self.observer {
                        Some(callback) => callback(&error),
                        None => eprintln!("[FANLOG WARNING] {}", error),
                    }
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                // Logger is shutting down, silently ignore
            }
        }
    }

    fn run_inline(&self, job: DeferredJob) {
        match job {
            DeferredJob::Write { sink, record } => {
                Self::write_isolated(&sink, &record, &self.metrics, &self.observer);
            }
            DeferredJob::Alarm(notice) => {
                Self::deliver_alarm(&self.sinks, &notice, &self.metrics, &self.observer);
            }
        }
    }

    fn deliver_alarm(
        sinks: &Arc<RwLock<Vec<Arc<dyn Sink>>>>,
        notice: &AlarmNotice,
        metrics: &Arc<LoggerMetrics>,
        observer: &Option<ErrorObserver>,
    ) {
        let target = sinks
            .read()
            .iter()
            .find(|s| s.kind() == SinkKind::Email && s.is_enabled())
            .cloned();

        match target {
            Some(sink) => {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    sink.send_alarm(notice)
                }));
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => Self::report_failure(metrics, observer, &e),
                    Err(_) => Self::report_failure(
                        metrics,
                        observer,
                        &SinkError::rejected("email", "alarm delivery panicked"),
                    ),
                }
            }
            None => Self::report_failure(
                metrics,
                observer,
                &SinkError::unavailable("email", "no enabled email sink for alarm"),
            ),
        }
    }

    /// Flush every sink. Each sink is flushed even when an earlier one
    /// fails; the first failure is returned afterwards.
    pub fn flush(&self) -> SinkResult<()> {
        let snapshot: Vec<Arc<dyn Sink>> = self.sinks.read().iter().cloned().collect();
        let mut first_error = None;
        for sink in snapshot {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Gracefully shut down the logger with a custom timeout.
    ///
    /// Drains the deferred queue, flushes, and closes every sink. Records
    /// still buffered after the timeout are dropped and the drop is
    /// reported once to stderr.
    ///
    /// Returns `true` if shutdown completed within the timeout.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let drained = self.drain_worker(timeout);

        if let Err(e) = self.flush() {
            eprintln!("[FANLOG ERROR] flush during shutdown failed: {}", e);
        }

        let sinks = self.sinks.read();
        for sink in sinks.iter() {
            sink.close();
        }

        drained
    }

    fn drain_worker(&mut self, timeout: Duration) -> bool {
        // Close the channel to signal the worker thread.
        drop(self.sender.take());

        let Some(handle) = self.worker.take() else {
            return true;
        };

        let start = std::time::Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!(
                        "[FANLOG ERROR] worker thread panicked during shutdown: {:?}",
                        e
                    );
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[FANLOG WARNING] worker thread did not finish within {:?}, \
                     remaining buffered records are dropped",
                    timeout
                );
                return false;
            }

            // Small sleep to avoid busy-waiting
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        let dropped = self.metrics.deferred_dropped();
        if dropped > 0 {
            eprintln!(
                "[FANLOG WARNING] logger '{}' shutting down with {} dropped deferred writes",
                self.name, dropped
            );
        }
    }
}

/// Builder for constructing a Logger with a fluent API
///
/// # Example
/// ```
/// use fanlog::prelude::*;
/// use std::time::Duration;
///
/// let logger = Logger::builder("app")
///     .alarms(AlarmConfig::new(Severity::Error, Duration::from_secs(60)))
///     .build();
/// ```
pub struct LoggerBuilder {
    name: String,
    sinks: Vec<Arc<dyn Sink>>,
    alarm_config: Option<AlarmConfig>,
    observer: Option<ErrorObserver>,
    sysinfo: Option<Arc<dyn Sysinfo>>,
    queue_capacity: usize,
}

impl LoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sinks: Vec::new(),
            alarm_config: None,
            observer: None,
            sysinfo: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Add a sink
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Add an already shared sink
    #[must_use = "builder methods return a new value"]
    pub fn sink_arc(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Enable alarm dispatch
    #[must_use = "builder methods return a new value"]
    pub fn alarms(mut self, config: AlarmConfig) -> Self {
        self.alarm_config = Some(config);
        self
    }

    /// Observe sink failures instead of the stderr fallback
    #[must_use = "builder methods return a new value"]
    pub fn observer(mut self, observer: ErrorObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Merge a sysinfo snapshot into each record's context
    #[must_use = "builder methods return a new value"]
    pub fn sysinfo(mut self, source: Arc<dyn Sysinfo>) -> Self {
        self.sysinfo = Some(source);
        self
    }

    /// Capacity of the deferred-write queue
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Build the Logger.
    ///
    /// A configuration with zero enabled sinks is legal and degenerates to
    /// a quiet logger, not an error.
    pub fn build(self) -> Logger {
        let sinks = Arc::new(RwLock::new(self.sinks));
        let metrics = Arc::new(LoggerMetrics::new());

        let alarms = self
            .alarm_config
            .map(|config| Arc::new(AlarmDispatcher::new(self.name.clone(), config)));

        let needs_worker =
            alarms.is_some() || sinks.read().iter().any(|s| s.kind().is_deferred());

        let (sender, worker) = if needs_worker {
            let (sender, receiver) = bounded::<DeferredJob>(self.queue_capacity);
            let worker_sinks = Arc::clone(&sinks);
            let worker_metrics = Arc::clone(&metrics);
            let worker_observer = self.observer.clone();

            let handle = thread::spawn(move || {
                while let Ok(job) = receiver.recv() {
                    match job {
                        DeferredJob::Write { sink, record } => {
                            Logger::write_isolated(
                                &sink,
                                &record,
                                &worker_metrics,
                                &worker_observer,
                            );
                        }
                        DeferredJob::Alarm(notice) => {
                            Logger::deliver_alarm(
                                &worker_sinks,
                                &notice,
                                &worker_metrics,
                                &worker_observer,
                            );
                        }
                    }
                }
            });
            (Some(sender), Some(handle))
        } else {
            (None, None)
        };

        Logger {
            name: self.name,
            sinks,
            alarms,
            sender,
            worker,
            metrics,
            observer: self.observer,
            sysinfo: self.sysinfo,
            last_stamp: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }
}
