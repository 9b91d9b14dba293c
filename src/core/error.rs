//! Error types for the logging toolkit
//!
//! Two distinct classes: [`SinkError`] values describe delivery failures and
//! never cross the logging API back to the caller; [`ConfigError`] is the
//! only error allowed to propagate, at construction time.

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// A failed delivery to one sink.
///
/// Transient variants (`Unavailable`, `Timeout`) are eligible for bounded
/// retries on the deferred sinks; `Rejected` is permanent.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Destination temporarily unreachable (connection down, queue full)
    #[error("sink '{sink}' unavailable: {message}")]
    Unavailable { sink: String, message: String },

    /// Permanent failure (bad credentials, malformed destination, closed sink)
    #[error("sink '{sink}' rejected the record: {message}")]
    Rejected { sink: String, message: String },

    /// Write did not complete within the sink's deadline
    #[error("sink '{sink}' timed out: {message}")]
    Timeout { sink: String, message: String },
}

impl SinkError {
    pub fn unavailable(sink: impl Into<String>, message: impl Into<String>) -> Self {
        SinkError::Unavailable {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn rejected(sink: impl Into<String>, message: impl Into<String>) -> Self {
        SinkError::Rejected {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn timeout(sink: impl Into<String>, message: impl Into<String>) -> Self {
        SinkError::Timeout {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Classify an I/O error from a sink's destination.
    pub fn from_io(sink: impl Into<String>, err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        let sink = sink.into();
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => SinkError::Timeout {
                sink,
                message: err.to_string(),
            },
            ErrorKind::PermissionDenied | ErrorKind::InvalidInput | ErrorKind::InvalidData => {
                SinkError::Rejected {
                    sink,
                    message: err.to_string(),
                }
            }
            _ => SinkError::Unavailable {
                sink,
                message: err.to_string(),
            },
        }
    }

    /// Name of the sink this failure came from.
    pub fn sink(&self) -> &str {
        match self {
            SinkError::Unavailable { sink, .. }
            | SinkError::Rejected { sink, .. }
            | SinkError::Timeout { sink, .. } => sink,
        }
    }

    /// Whether a bounded retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SinkError::Unavailable { .. } | SinkError::Timeout { .. }
        )
    }
}

/// Construction-time configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration with details
    #[error("invalid configuration for {component}: {message}")]
    Invalid { component: String, message: String },

    /// Destination could not be prepared (directory, file handle)
    #[error("failed to prepare '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn invalid(component: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
