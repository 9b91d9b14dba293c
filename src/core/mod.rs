//! Core logging pieces: records, severities, sinks, alarms and the logger
//! itself.

pub mod alarm;
pub mod config;
pub mod context;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod record;
pub mod severity;
pub mod sink;
pub mod template;
pub mod timestamp;

pub use alarm::{AlarmConfig, AlarmDispatcher, AlarmNotice, DedupKeyFn};
pub use config::{Collaborators, LoggerOptions};
pub use context::{FieldValue, RecordContext};
pub use error::{ConfigError, SinkError, SinkResult};
pub use logger::{
    ErrorObserver, Logger, LoggerBuilder, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use metrics::LoggerMetrics;
pub use record::Record;
pub use severity::Severity;
pub use sink::{Sink, SinkKind, WriteAck};
pub use template::{Formatter, DEFAULT_TEMPLATE};
pub use timestamp::TimestampFormat;
