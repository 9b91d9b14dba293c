//! # Fanlog
//!
//! A multi-sink logging toolkit. One logging call fans a record out to any
//! combination of console, file, database and email sinks, each with its
//! own severity threshold and enable flag, without a failure in one sink
//! ever reaching the others or the caller.
//!
//! ## Features
//!
//! - **Multiple sinks**: console (colored), rotating file, database rows
//!   through a pluggable store, email over SMTP
//! - **Fault isolation**: sink failures are counted, reported to an
//!   observer callback, and never propagate to logging calls
//! - **Deferred lane**: database and email writes run on a worker thread
//!   behind a bounded queue, so slow backends cannot stall logging
//! - **Alarms**: severity-triggered email notices with per-signature
//!   throttling and a suppressed-repeat count
//! - **Declarative config**: describe a whole logger in JSON and build it
//!   with [`Logger::from_options`]
//!
//! ## Quick Start
//!
//! ```rust
//! use fanlog::prelude::*;
//!
//! let logger = Logger::builder("app")
//!     .sink(ConsoleSink::new().with_min_severity(Severity::Info))
//!     .build();
//!
//! logger.info("application started");
//! fanlog::error!(logger, "request {} failed", 42);
//! ```
//!
//! ## Alarms
//!
//! ```rust
//! use fanlog::prelude::*;
//! use std::time::Duration;
//!
//! let logger = Logger::builder("app")
//!     .alarms(AlarmConfig::new(Severity::Error, Duration::from_secs(60)))
//!     .build();
//!
//! // The first error fires a notice; repeats within the window are
//! // counted and summarized in the next one.
//! logger.error("payment backend unreachable");
//! ```

pub mod collab;
pub mod core;
mod macros;
pub mod registry;
pub mod sinks;

pub use collab::{Credentials, EnvCredentials, HostSysinfo, MemoryCredentials, Sysinfo};
pub use self::core::{
    AlarmConfig, AlarmDispatcher, AlarmNotice, Collaborators, ConfigError, DedupKeyFn,
    ErrorObserver, FieldValue, Formatter, Logger, LoggerBuilder, LoggerMetrics, LoggerOptions,
    Record, RecordContext, Severity, Sink, SinkError, SinkKind, SinkResult, TimestampFormat,
    WriteAck, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_TEMPLATE,
};
#[cfg(feature = "console")]
pub use sinks::ConsoleSink;
pub use sinks::{DatabaseSink, EmailSink, LogRow, LogStore, MailMessage, MailTransport,
    RetryPolicy, SmtpTransport};
#[cfg(feature = "file")]
pub use sinks::{FileSink, RotationPolicy};

/// Convenience re-exports for the common path.
pub mod prelude {
    pub use crate::core::{
        AlarmConfig, Formatter, Logger, LoggerOptions, Record, RecordContext, Severity, Sink,
        SinkKind,
    };
    #[cfg(feature = "console")]
    pub use crate::sinks::ConsoleSink;
    pub use crate::sinks::{DatabaseSink, EmailSink};
    #[cfg(feature = "file")]
    pub use crate::sinks::{FileSink, RotationPolicy};
}
