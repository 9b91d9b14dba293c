//! Alarm dispatch with deduplication and throttling
//!
//! The [`AlarmDispatcher`] is consulted by the logger after sink fan-out.
//! Records at or above the trigger severity are reduced to a deduplication
//! signature; repeated signatures inside the throttle window are suppressed
//! and counted, and the count is reported on the next eligible alarm.
//!
//! The dispatcher only decides; delivery happens through the email sink on
//! the logger's deferred lane, under the same non-propagating failure policy
//! as every other sink.

use super::record::Record;
use super::severity::Severity;
use super::timestamp::TimestampFormat;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Derives a deduplication signature from a record.
pub type DedupKeyFn = Arc<dyn Fn(&Record) -> String + Send + Sync>;

/// How many `consider` calls pass between pruning sweeps of the
/// signature map.
const PRUNE_INTERVAL: u64 = 64;

/// Maximum message prefix carried into the alarm subject.
const SUBJECT_PREFIX_LEN: usize = 60;

/// Configuration for alarm dispatch.
#[derive(Clone)]
pub struct AlarmConfig {
    /// Minimum severity that triggers an alarm
    pub trigger_severity: Severity,

    /// Recipients for alarm messages; when empty the email sink's own
    /// recipient list is used
    pub recipients: Vec<String>,

    /// Minimum time between two alarms sharing a signature
    pub throttle_window: Duration,

    /// Signature derivation; defaults to message plus source location
    pub dedup_key: Option<DedupKeyFn>,

    /// Signatures idle longer than `prune_factor * throttle_window` are
    /// evicted from the map
    pub prune_factor: u32,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            trigger_severity: Severity::Error,
            recipients: Vec::new(),
            throttle_window: Duration::from_secs(60),
            dedup_key: None,
            prune_factor: 10,
        }
    }
}

impl fmt::Debug for AlarmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlarmConfig")
            .field("trigger_severity", &self.trigger_severity)
            .field("recipients", &self.recipients)
            .field("throttle_window", &self.throttle_window)
            .field("dedup_key", &self.dedup_key.as_ref().map(|_| "<fn>"))
            .field("prune_factor", &self.prune_factor)
            .finish()
    }
}

impl AlarmConfig {
    pub fn new(trigger_severity: Severity, throttle_window: Duration) -> Self {
        Self {
            trigger_severity,
            throttle_window,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.recipients = recipients;
        self
    }

    #[must_use]
    pub fn with_dedup_key(mut self, key: DedupKeyFn) -> Self {
        self.dedup_key = Some(key);
        self
    }

    #[must_use]
    pub fn with_prune_factor(mut self, factor: u32) -> Self {
        self.prune_factor = factor.max(1);
        self
    }
}

/// A composed alarm ready for delivery.
#[derive(Debug, Clone)]
pub struct AlarmNotice {
    pub signature: String,
    pub subject: String,
    pub body: String,
    /// Similar alarms suppressed since the previous notification for this
    /// signature
    pub suppressed: u64,
    pub recipients: Vec<String>,
}

struct FiringState {
    last_fired: Instant,
    suppressed: u64,
}

/// Deduplicating, throttling alarm decision engine.
pub struct AlarmDispatcher {
    app: String,
    config: AlarmConfig,
    fired: Mutex<HashMap<String, FiringState>>,
    considered: AtomicU64,
}

impl AlarmDispatcher {
    pub fn new(app: impl Into<String>, config: AlarmConfig) -> Self {
        Self {
            app: app.into(),
            config,
            fired: Mutex::new(HashMap::new()),
            considered: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    /// Number of signatures currently tracked.
    pub fn tracked_signatures(&self) -> usize {
        self.fired.lock().len()
    }

    /// Decide whether `record` warrants an alarm.
    ///
    /// Returns the composed notice when one should be dispatched, `None`
    /// when the record is below the trigger severity or throttled.
    pub fn consider(&self, record: &Record) -> Option<AlarmNotice> {
        self.consider_at(record, Instant::now())
    }

    fn consider_at(&self, record: &Record, now: Instant) -> Option<AlarmNotice> {
        if record.severity < self.config.trigger_severity {
            return None;
        }

        let signature = self.signature(record);
        let mut fired = self.fired.lock();

        let count = self.considered.fetch_add(1, Ordering::Relaxed);
        if (count + 1) % PRUNE_INTERVAL == 0 {
            self.prune(&mut fired, now);
        }

        match fired.get_mut(&signature) {
            Some(state) if now.duration_since(state.last_fired) < self.config.throttle_window => {
                state.suppressed += 1;
                None
            }
            Some(state) => {
                let suppressed = state.suppressed;
                state.last_fired = now;
                state.suppressed = 0;
                Some(self.compose(record, signature, suppressed))
            }
            None => {
                fired.insert(
                    signature.clone(),
                    FiringState {
                        last_fired: now,
                        suppressed: 0,
                    },
                );
                Some(self.compose(record, signature, 0))
            }
        }
    }

    fn signature(&self, record: &Record) -> String {
        match &self.config.dedup_key {
            Some(key) => key(record),
            None => match record.source_location() {
                Some(source) => format!("{}@{}", record.message, source),
                None => record.message.clone(),
            },
        }
    }

    fn compose(&self, record: &Record, signature: String, suppressed: u64) -> AlarmNotice {
        let prefix: String = record.message.chars().take(SUBJECT_PREFIX_LEN).collect();
        let subject = format!("ALARM in {}: {} {}", self.app, record.severity, prefix);

        let timestamp = TimestampFormat::Iso8601.format(&record.timestamp);
        let mut body = format!(
            "severity: {}\ntime: {}\nmessage: {}\n",
            record.severity, timestamp, record.message
        );
        if let Some(source) = record.source_location() {
            body.push_str(&format!("source: {}\n", source));
        }
        if let Some(ref context) = record.context {
            if !context.is_empty() {
                body.push_str(&format!("context: {}\n", context.format_fields()));
            }
        }
        if suppressed > 0 {
            body.push_str(&format!(
                "{} similar alarms suppressed since the previous notification\n",
                suppressed
            ));
        }

        AlarmNotice {
            signature,
            subject,
            body,
            suppressed,
            recipients: self.config.recipients.clone(),
        }
    }

    fn prune(&self, fired: &mut HashMap<String, FiringState>, now: Instant) {
        let horizon = self.config.throttle_window * self.config.prune_factor.max(1);
        fired.retain(|_, state| now.duration_since(state.last_fired) < horizon);
    }
}
