//! Declarative logger configuration
//!
//! [`LoggerOptions`] mirrors the builder API as plain data so a whole
//! logger can be described in a JSON document and constructed with
//! [`Logger::from_options`]. Collaborators that cannot live in a config
//! file (database connections, credential sources, host info) are injected
//! through [`Collaborators`].
//!
//! Validation happens here, at construction: a sink that is enabled but
//! missing what it needs is a [`ConfigError`], never a runtime surprise.
//! A configuration with zero enabled sinks is legal and yields a quiet
//! logger.

use super::alarm::AlarmConfig;
use super::error::ConfigError;
use super::logger::{Logger, LoggerBuilder, DEFAULT_QUEUE_CAPACITY};
use super::severity::Severity;
use crate::collab::{Credentials, Sysinfo};
use crate::sinks::database::{DatabaseSink, LogStore};
use crate::sinks::email::{EmailSink, SmtpTransport};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_error() -> Severity {
    Severity::Error
}

fn default_table() -> String {
    "log".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_smtp_timeout() -> u64 {
    5
}

fn default_max_backups() -> usize {
    5
}

fn default_throttle() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Complete logger description, deserializable from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerOptions {
    pub console: ConsoleOptions,
    pub file: FileOptions,
    pub database: DatabaseOptions,
    pub email: EmailOptions,
    pub alarms: AlarmOptions,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub min_severity: Severity,
    #[serde(default = "default_true")]
    pub colors: bool,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            min_severity: Severity::default(),
            colors: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileOptions {
    pub enabled: bool,
    pub min_severity: Severity,
    pub path: Option<PathBuf>,
    /// Rotate the segment past this many bytes; `None` keeps the default
    pub rotate_max_bytes: Option<u64>,
    /// Rotate the segment past this age in seconds
    pub rotate_interval_seconds: Option<u64>,
    pub max_backups: usize,
    pub compress: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            min_severity: Severity::Debug,
            path: None,
            rotate_max_bytes: None,
            rotate_interval_seconds: None,
            max_backups: default_max_backups(),
            compress: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseOptions {
    pub enabled: bool,
    pub min_severity: Severity,
    pub table: String,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            min_severity: Severity::Debug,
            table: default_table(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailOptions {
    pub enabled: bool,
    #[serde(default = "default_error")]
    pub min_severity: Severity,
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_smtp_timeout")]
    pub timeout_seconds: u64,
    pub sender: Option<String>,
    pub recipients: Vec<String>,
}

impl Default for EmailOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            min_severity: default_error(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            timeout_seconds: default_smtp_timeout(),
            sender: None,
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlarmOptions {
    pub enabled: bool,
    #[serde(default = "default_error")]
    pub trigger_severity: Severity,
    #[serde(default = "default_throttle")]
    pub throttle_seconds: u64,
    /// Overrides the email sink's recipients for alarm notices when set
    pub recipients: Vec<String>,
}

impl Default for AlarmOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            trigger_severity: default_error(),
            throttle_seconds: default_throttle(),
            recipients: Vec::new(),
        }
    }
}

impl LoggerOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::invalid("options", e.to_string()))
    }

    /// Load options from a JSON file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&contents)
    }
}

/// Runtime collaborators that configuration files cannot carry.
#[derive(Default, Clone)]
pub struct Collaborators {
    /// Database connection for the database sink
    pub store: Option<Arc<dyn LogStore>>,
    /// Secret source consulted for `smtp_user` / `smtp_password`
    pub credentials: Option<Arc<dyn Credentials>>,
    /// Host info merged into each record's context
    pub sysinfo: Option<Arc<dyn Sysinfo>>,
}

impl Logger {
    /// Build a logger from declarative options plus runtime collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an enabled sink is missing something it
    /// needs: a file sink without a path, a database sink without a store,
    /// an email sink without host, sender or recipients, or alarms without
    /// an enabled email sink to deliver through.
    pub fn from_options(
        name: impl Into<String>,
        options: &LoggerOptions,
        collaborators: &Collaborators,
    ) -> Result<Logger, ConfigError> {
        let mut builder = Logger::builder(name).queue_capacity(if options.queue_capacity == 0 {
            default_queue_capacity()
        } else {
            options.queue_capacity
        });

        if options.console.enabled {
            builder = Self::add_console(builder, &options.console)?;
        }

        if options.file.enabled {
            builder = Self::add_file(builder, &options.file)?;
        }

        if options.database.enabled {
            let store = collaborators.store.clone().ok_or_else(|| {
                ConfigError::invalid("database", "enabled but no log store collaborator supplied")
            })?;
            builder = builder.sink(
                DatabaseSink::new(store, options.database.table.clone())
                    .with_min_severity(options.database.min_severity),
            );
        }

        if options.email.enabled {
            builder = builder.sink(Self::email_sink(&options.email, collaborators)?);
        }

        if options.alarms.enabled {
            if !options.email.enabled {
                return Err(ConfigError::invalid(
                    "alarms",
                    "enabled but no email sink to deliver notices through",
                ));
            }
            builder = builder.alarms(
                AlarmConfig::new(
                    options.alarms.trigger_severity,
                    Duration::from_secs(options.alarms.throttle_seconds),
                )
                .with_recipients(options.alarms.recipients.clone()),
            );
        }

        if let Some(ref sysinfo) = collaborators.sysinfo {
            builder = builder.sysinfo(Arc::clone(sysinfo));
        }

        Ok(builder.build())
    }

    #[cfg(feature = "console")]
    fn add_console(
        builder: LoggerBuilder,
        options: &ConsoleOptions,
    ) -> Result<LoggerBuilder, ConfigError> {
        use crate::sinks::console::ConsoleSink;
        Ok(builder.sink(
            ConsoleSink::new()
                .with_colors(options.colors)
                .with_min_severity(options.min_severity),
        ))
    }

    #[cfg(not(feature = "console"))]
    fn add_console(
        _builder: LoggerBuilder,
        _options: &ConsoleOptions,
    ) -> Result<LoggerBuilder, ConfigError> {
        Err(ConfigError::invalid(
            "console",
            "enabled but the 'console' feature is not compiled in",
        ))
    }

    #[cfg(feature = "file")]
    fn add_file(
        builder: LoggerBuilder,
        options: &FileOptions,
    ) -> Result<LoggerBuilder, ConfigError> {
        use crate::sinks::file::{FileSink, RotationPolicy};

        let path = options
            .path
            .clone()
            .ok_or_else(|| ConfigError::invalid("file", "enabled but no path configured"))?;

        let mut policy = RotationPolicy::default();
        if options.rotate_max_bytes.is_some() || options.rotate_interval_seconds.is_some() {
            policy.max_bytes = options.rotate_max_bytes;
            policy.interval = options.rotate_interval_seconds.map(Duration::from_secs);
        }
        policy.max_backups = options.max_backups;
        policy.compress = options.compress;

        let sink =
            FileSink::with_policy(path, policy)?.with_min_severity(options.min_severity);
        Ok(builder.sink(sink))
    }

    #[cfg(not(feature = "file"))]
    fn add_file(
        _builder: LoggerBuilder,
        _options: &FileOptions,
    ) -> Result<LoggerBuilder, ConfigError> {
        Err(ConfigError::invalid(
            "file",
            "enabled but the 'file' feature is not compiled in",
        ))
    }

    fn email_sink(
        options: &EmailOptions,
        collaborators: &Collaborators,
    ) -> Result<EmailSink, ConfigError> {
        let host = options
            .smtp_host
            .clone()
            .ok_or_else(|| ConfigError::invalid("email", "enabled but no smtp_host configured"))?;
        let sender = options
            .sender
            .clone()
            .ok_or_else(|| ConfigError::invalid("email", "enabled but no sender configured"))?;
        if options.recipients.is_empty() {
            return Err(ConfigError::invalid("email", "enabled but no recipients"));
        }

        let mut transport = SmtpTransport::new(host, options.smtp_port)
            .with_timeout(Duration::from_secs(options.timeout_seconds));

        // Secrets come from the credential collaborator, never the options.
        if let Some(ref credentials) = collaborators.credentials {
            if let (Some(user), Some(password)) = (
                credentials.get("smtp_user"),
                credentials.get("smtp_password"),
            ) {
                transport = transport.with_credentials(user, password);
            }
        }

        Ok(
            EmailSink::new(Arc::new(transport), sender, options.recipients.clone())
                .with_min_severity(options.min_severity),
        )
    }
}
