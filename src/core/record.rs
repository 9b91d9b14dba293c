//! Log record structure

use super::context::RecordContext;
use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.is_none() {
            *cache = Some(format!("{:?}", std::thread::current().id()));
        }
        cache
            .as_ref()
            .expect("thread_id cache initialized in previous line")
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.is_none() {
            *cache = Some(std::thread::current().name().map(String::from));
        }
        cache
            .as_ref()
            .expect("thread_name cache initialized in previous line")
            .clone()
    })
}

/// One immutable logged event.
///
/// Created by the [`Logger`](crate::core::logger::Logger) at call time and
/// handed read-only to every sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub module_path: Option<String>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RecordContext>,
}

impl Record {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log records.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(severity: Severity, message: String) -> Self {
        Self {
            severity,
            message: Self::sanitize_message(&message),
            timestamp: Utc::now(),
            file: None,
            line: None,
            module_path: None,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            context: None,
        }
    }

    pub fn with_location(mut self, file: &str, line: u32, module_path: &str) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self.module_path = Some(module_path.to_string());
        self
    }

    pub fn with_context(mut self, context: RecordContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Source location as a single `file:line (module)` string, if captured.
    pub fn source_location(&self) -> Option<String> {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => match &self.module_path {
                Some(module) => Some(format!("{}:{} ({})", file, line, module)),
                None => Some(format!("{}:{}", file, line)),
            },
            (Some(file), None) => Some(file.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_sanitized() {
        let record = Record::new(Severity::Info, "line1\nline2\tend\r".to_string());
        assert_eq!(record.message, "line1\\nline2\\tend\\r");
    }

    #[test]
    fn test_source_location() {
        let record = Record::new(Severity::Error, "boom".to_string()).with_location(
            "src/main.rs",
            42,
            "app::worker",
        );
        assert_eq!(
            record.source_location().unwrap(),
            "src/main.rs:42 (app::worker)"
        );

        let bare = Record::new(Severity::Error, "boom".to_string());
        assert!(bare.source_location().is_none());
    }

    #[test]
    fn test_with_context() {
        let ctx = RecordContext::new().with_field("k", "v");
        let record = Record::new(Severity::Debug, "msg".to_string()).with_context(ctx);
        assert!(record.context.unwrap().fields().contains_key("k"));
    }
}
