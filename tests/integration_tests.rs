//! End-to-end tests exercising the logger with several sinks at once.

use fanlog::prelude::*;
use fanlog::{
    AlarmConfig, LogRow, LogStore, MailMessage, MailTransport, SinkError, SinkResult, WriteAck,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory sink masquerading as any kind.
struct MemorySink {
    kind: SinkKind,
    min_severity: Severity,
    enabled: AtomicBool,
    written: Mutex<Vec<String>>,
}

impl MemorySink {
    fn new(kind: SinkKind, min_severity: Severity) -> Arc<Self> {
        Arc::new(Self {
            kind,
            min_severity,
            enabled: AtomicBool::new(true),
            written: Mutex::new(Vec::new()),
        })
    }

    fn messages(&self) -> Vec<String> {
        self.written.lock().clone()
    }
}

impl Sink for MemorySink {
    fn kind(&self) -> SinkKind {
        self.kind
    }
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
    fn min_severity(&self) -> Severity {
        self.min_severity
    }
    fn write(&self, record: &Record) -> SinkResult<WriteAck> {
        self.written.lock().push(record.message.clone());
        Ok(WriteAck::new(self.kind))
    }
    fn close(&self) {}
}

struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }
}

impl MailTransport for RecordingTransport {
    fn send(&self, mail: &MailMessage) -> SinkResult<()> {
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

#[test]
fn record_routed_by_per_sink_thresholds() {
    // Console requires Warning, file takes everything.
    let console = MemorySink::new(SinkKind::Console, Severity::Warning);
    let file = MemorySink::new(SinkKind::File, Severity::Debug);

    let mut logger = Logger::builder("routing")
        .sink_arc(console.clone())
        .sink_arc(file.clone())
        .build();

    logger.info("file only");
    logger.error("both");
    logger.shutdown(Duration::from_secs(5));

    assert_eq!(console.messages(), vec!["both".to_string()]);
    assert_eq!(
        file.messages(),
        vec!["file only".to_string(), "both".to_string()]
    );
}

#[test]
fn database_outage_does_not_disturb_other_sinks() {
    struct DownStore {
        calls: AtomicUsize,
    }
    impl LogStore for DownStore {
        fn execute(&self, _row: &LogRow) -> SinkResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SinkError::unavailable("database", "connection refused"))
        }
    }

    let store = Arc::new(DownStore {
        calls: AtomicUsize::new(0),
    });
    let console = MemorySink::new(SinkKind::Console, Severity::Debug);
    let failures = Arc::new(AtomicUsize::new(0));
    let failures_seen = Arc::clone(&failures);

    let mut logger = Logger::builder("outage")
        .sink_arc(console.clone())
        .sink(
            DatabaseSink::new(store.clone(), "app_log")
                .with_retry(fanlog::RetryPolicy::new(3, Duration::from_millis(1))),
        )
        .observer(Arc::new(move |_| {
            failures_seen.fetch_add(1, Ordering::SeqCst);
        }))
        .build();

    logger.error("db is down");
    logger.shutdown(Duration::from_secs(5));

    // Initial attempt plus three bounded retries, then give up.
    assert_eq!(store.calls.load(Ordering::SeqCst), 4);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(console.messages(), vec!["db is down".to_string()]);
    assert_eq!(logger.metrics().sink_failures(), 1);
}

#[test]
fn alarm_storm_is_throttled_and_summarized() {
    let transport = RecordingTransport::new();
    // Threshold above Critical-triggering records so only alarm notices,
    // not per-record mails, reach the transport.
    let email = EmailSink::new(
        transport.clone(),
        "logger@example.com",
        vec!["ops@example.com".to_string()],
    )
    .with_min_severity(Severity::Critical);

    let mut logger = Logger::builder("storm")
        .sink(email)
        .alarms(AlarmConfig::new(Severity::Error, Duration::from_millis(50)))
        .build();

    for _ in 0..5 {
        logger.error("payment backend unreachable");
    }
    std::thread::sleep(Duration::from_millis(60));
    logger.error("payment backend unreachable");
    logger.shutdown(Duration::from_secs(5));

    let sent = transport.sent.lock();
    assert_eq!(sent.len(), 2, "one notice per throttle window");
    assert!(sent[0].subject.starts_with("ALARM in storm: ERROR"));
    assert!(sent[1]
        .body
        .contains("4 similar alarms suppressed since the previous notification"));

    assert_eq!(logger.metrics().alarms_fired(), 2);
    assert_eq!(logger.metrics().alarms_suppressed(), 4);
}

#[test]
fn distinct_messages_alarm_independently() {
    let transport = RecordingTransport::new();
    let email = EmailSink::new(
        transport.clone(),
        "logger@example.com",
        vec!["ops@example.com".to_string()],
    )
    .with_min_severity(Severity::Critical);

    let mut logger = Logger::builder("dedup")
        .sink(email)
        .alarms(AlarmConfig::new(Severity::Error, Duration::from_secs(60)))
        .build();

    logger.error("disk full");
    logger.error("disk full");
    logger.error("certificate expired");
    logger.shutdown(Duration::from_secs(5));

    assert_eq!(transport.sent.lock().len(), 2);
}

#[test]
fn shutdown_drains_the_deferred_queue() {
    struct SlowStore {
        rows: Mutex<Vec<String>>,
    }
    impl LogStore for SlowStore {
        fn execute(&self, row: &LogRow) -> SinkResult<()> {
            std::thread::sleep(Duration::from_millis(1));
            self.rows.lock().push(row.message.clone());
            Ok(())
        }
    }

    let store = Arc::new(SlowStore {
        rows: Mutex::new(Vec::new()),
    });
    let mut logger = Logger::builder("drain")
        .sink(DatabaseSink::new(store.clone(), "t"))
        .build();

    for i in 0..50 {
        logger.info(format!("row {}", i));
    }
    assert!(logger.shutdown(Duration::from_secs(10)));
    assert_eq!(store.rows.lock().len(), 50);
}

#[cfg(feature = "file")]
#[test]
fn rotation_preserves_every_record() {
    use std::io::Read;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");

    let sink = FileSink::with_policy(
        &path,
        RotationPolicy::size(256).with_max_backups(20),
    )
    .unwrap();

    let mut logger = Logger::builder("rotation").sink(sink).build();
    for i in 0..40 {
        logger.info(format!("record number {:04}", i));
    }
    logger.shutdown(Duration::from_secs(5));

    let mut lines = 0;
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let mut contents = String::new();
        std::fs::File::open(entry.unwrap().path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        lines += contents.lines().count();
    }
    assert_eq!(lines, 40, "no record lost across rotation");

    let backups = std::fs::read_dir(dir.path()).unwrap().count();
    assert!(backups >= 2, "expected at least one rotated segment");
}

#[cfg(feature = "file")]
#[test]
fn logger_built_from_json_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.log");

    let json = format!(
        r#"{{
            "console": {{"enabled": false}},
            "file": {{"enabled": true, "path": {:?}, "min_severity": "info"}}
        }}"#,
        path
    );
    let options = LoggerOptions::from_json(&json).unwrap();

    let logger =
        Logger::from_options("configured", &options, &fanlog::Collaborators::default()).unwrap();
    logger.debug("filtered out");
    logger.info("written to disk");
    drop(logger);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("written to disk"));
    assert!(!contents.contains("filtered out"));
}

#[test]
fn sysinfo_fields_join_caller_context() {
    struct FixedSysinfo;
    impl fanlog::Sysinfo for FixedSysinfo {
        fn snapshot(&self) -> RecordContext {
            RecordContext::new()
                .with_field("hostname", "worker-1")
                .with_field("request_id", "from-sysinfo")
        }
    }

    struct ContextSink {
        seen: Mutex<Vec<Option<RecordContext>>>,
    }
    impl Sink for ContextSink {
        fn kind(&self) -> SinkKind {
            SinkKind::Console
        }
        fn is_enabled(&self) -> bool {
            true
        }
        fn set_enabled(&self, _enabled: bool) {}
        fn min_severity(&self) -> Severity {
            Severity::Debug
        }
        fn write(&self, record: &Record) -> SinkResult<WriteAck> {
            self.seen.lock().push(record.context.clone());
            Ok(WriteAck::new(SinkKind::Console))
        }
        fn close(&self) {}
    }

    let sink = Arc::new(ContextSink {
        seen: Mutex::new(Vec::new()),
    });
    let mut logger = Logger::builder("sysinfo")
        .sink_arc(sink.clone())
        .sysinfo(Arc::new(FixedSysinfo))
        .build();

    logger.log_with_context(
        Severity::Info,
        "request handled",
        RecordContext::new().with_field("request_id", "abc-123"),
    );
    logger.shutdown(Duration::from_secs(1));

    let seen = sink.seen.lock();
    let context = seen[0].as_ref().unwrap();
    let rendered = context.format_fields();
    assert!(rendered.contains("hostname=worker-1"));
    // Caller fields always win over the snapshot.
    assert!(rendered.contains("request_id=abc-123"));
    assert!(!rendered.contains("from-sysinfo"));
}

#[test]
fn registry_round_trip() {
    let logger = Arc::new(Logger::builder("integration-registry").build());
    fanlog::registry::register(Arc::clone(&logger));

    let fetched = fanlog::registry::get("integration-registry").unwrap();
    fetched.info("through the registry");

    assert!(fanlog::registry::unregister("integration-registry").is_some());
    assert!(fanlog::registry::get("integration-registry").is_none());
}

#[test]
fn macros_capture_the_call_site() {
    struct LocationSink {
        seen: Mutex<Vec<(Option<String>, Severity)>>,
    }
    impl Sink for LocationSink {
        fn kind(&self) -> SinkKind {
            SinkKind::Console
        }
        fn is_enabled(&self) -> bool {
            true
        }
        fn set_enabled(&self, _enabled: bool) {}
        fn min_severity(&self) -> Severity {
            Severity::Debug
        }
        fn write(&self, record: &Record) -> SinkResult<WriteAck> {
            self.seen
                .lock()
                .push((record.source_location(), record.severity));
            Ok(WriteAck::new(SinkKind::Console))
        }
        fn close(&self) {}
    }

    let sink = Arc::new(LocationSink {
        seen: Mutex::new(Vec::new()),
    });
    let logger = Logger::builder("macros").sink_arc(sink.clone()).build();

    fanlog::warning!(logger, "slow request: {}ms", 950);

    let seen = sink.seen.lock();
    let (location, severity) = &seen[0];
    assert_eq!(*severity, Severity::Warning);
    assert!(location.as_ref().unwrap().contains("integration_tests.rs"));
}
