//! Sink implementations: console, file, database and email.

#[cfg(feature = "console")]
pub mod console;
pub mod database;
pub mod email;
#[cfg(feature = "file")]
pub mod file;

#[cfg(feature = "console")]
pub use console::ConsoleSink;
pub use database::{DatabaseSink, LogRow, LogStore, RetryPolicy};
pub use email::{EmailSink, MailMessage, MailTransport, SmtpTransport};
#[cfg(feature = "file")]
pub use file::{FileSink, RotationPolicy};
