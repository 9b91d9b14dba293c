//! Record formatter driven by placeholder templates
//!
//! A [`Formatter`] renders a [`Record`] into a text line. Rendering is pure
//! and infallible: an unknown placeholder expands to the empty string and an
//! unterminated `{` is emitted literally, so formatting can never crash a
//! logging call.
//!
//! Recognized placeholders: `{timestamp}`, `{severity}`, `{message}`,
//! `{thread}`, `{file}`, `{line}`, `{module}`, `{source}`, `{context}`.

use super::record::Record;
use super::timestamp::TimestampFormat;

/// Default template used by the console and file sinks.
pub const DEFAULT_TEMPLATE: &str = "[{timestamp}] [{severity}] {thread} - {message}";

/// Renders records through a placeholder template.
#[derive(Debug, Clone)]
pub struct Formatter {
    template: String,
    timestamp_format: TimestampFormat,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl Formatter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            timestamp_format: TimestampFormat::default(),
        }
    }

    /// Set the timestamp format used for the `{timestamp}` placeholder
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Set a custom strftime format for the `{timestamp}` placeholder
    #[must_use]
    pub fn with_custom_timestamp(mut self, format_str: &str) -> Self {
        self.timestamp_format = TimestampFormat::Custom(format_str.to_string());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render a record into a single line.
    pub fn render(&self, record: &Record) -> String {
        let mut output = String::with_capacity(self.template.len() + record.message.len());
        let mut chars = self.template.chars();

        while let Some(ch) = chars.next() {
            if ch != '{' {
                output.push(ch);
                continue;
            }

            let mut name = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == '}' {
                    closed = true;
                    break;
                }
                name.push(inner);
            }

            if closed {
                output.push_str(&self.expand(&name, record));
            } else {
                // Unterminated placeholder: emit what we consumed literally.
                output.push('{');
                output.push_str(&name);
            }
        }

        output
    }

    fn expand(&self, name: &str, record: &Record) -> String {
        match name {
            "timestamp" => self.timestamp_format.format(&record.timestamp),
            "severity" => record.severity.to_str().to_string(),
            "message" => record.message.clone(),
            "thread" => record
                .thread_name
                .clone()
                .unwrap_or_else(|| record.thread_id.clone()),
            "file" => record.file.clone().unwrap_or_default(),
            "line" => record.line.map(|l| l.to_string()).unwrap_or_default(),
            "module" => record.module_path.clone().unwrap_or_default(),
            "source" => record.source_location().unwrap_or_default(),
            "context" => record
                .context
                .as_ref()
                .map(|c| c.format_fields())
                .unwrap_or_default(),
            // Unknown placeholders render as empty rather than failing.
            _ => String::new(),
        }
    }

    /// Render a record and append its context fields when the template does
    /// not already place them.
    ///
    /// This is the form the console and file sinks use: the line stays clean
    /// for records without context, and structured fields follow after a
    /// separator when present.
    pub fn render_with_context(&self, record: &Record) -> String {
        let mut output = self.render(record);
        if !self.template.contains("{context}") {
            if let Some(ref context) = record.context {
                if !context.is_empty() {
                    output.push_str(" | ");
                    output.push_str(&context.format_fields());
                }
            }
        }
        output
    }
}
