//! Multi-sink logging with rotation and alarms
//!
//! Routes one stream of records to the console and a rotating file with
//! different thresholds, and raises throttled alarms on errors.
//!
//! Run with: cargo run --example multi_sink

use fanlog::prelude::*;
use fanlog::{AlarmConfig, MailMessage, MailTransport, SinkResult};
use std::sync::Arc;
use std::time::Duration;

/// Stand-in transport that prints instead of speaking SMTP.
struct PrintingTransport;

impl MailTransport for PrintingTransport {
    fn send(&self, mail: &MailMessage) -> SinkResult<()> {
        println!("--- would send mail ---");
        println!("subject: {}", mail.subject);
        println!("{}", mail.body);
        Ok(())
    }
}

fn main() -> Result<(), fanlog::ConfigError> {
    let file = FileSink::with_policy(
        "demo.log",
        RotationPolicy::size(4096).with_max_backups(3),
    )?;

    let email = EmailSink::new(
        Arc::new(PrintingTransport),
        "logger@example.com",
        vec!["ops@example.com".to_string()],
    );

    let mut logger = Logger::builder("demo")
        .sink(ConsoleSink::new().with_min_severity(Severity::Warning))
        .sink(file.with_min_severity(Severity::Debug))
        .sink(email)
        .alarms(AlarmConfig::new(Severity::Error, Duration::from_secs(60)))
        .build();

    // Everything below Warning goes to the file only.
    for i in 0..20 {
        logger.info(format!("background task {} finished", i));
    }
    logger.warning("queue depth above soft limit");

    // A storm of identical errors produces a single alarm; repeats are
    // counted into the next notice after the window.
    for _ in 0..5 {
        logger.error("payment backend unreachable");
    }

    logger.shutdown(Duration::from_secs(5));
    Ok(())
}
