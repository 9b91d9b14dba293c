//! Logging macros that capture the call site
//!
//! The macros format their arguments and attach `file!()`, `line!()` and
//! `module_path!()` to the record, which the function API cannot do.

/// Log at an explicit severity with the caller's source location.
///
/// # Example
/// ```
/// use fanlog::prelude::*;
///
/// let logger = Logger::builder("app").build();
/// fanlog::log!(logger, Severity::Info, "user {} signed in", 42);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger.log_at($severity, format!($($arg)+), file!(), line!(), module_path!())
    };
}

/// Log a debug record with the caller's source location.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Debug, $($arg)+)
    };
}

/// Log an info record with the caller's source location.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Info, $($arg)+)
    };
}

/// Log a warning record with the caller's source location.
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Warning, $($arg)+)
    };
}

/// Log an error record with the caller's source location.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Error, $($arg)+)
    };
}

/// Log a critical record with the caller's source location.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Critical, $($arg)+)
    };
}
