//! Email sink implementation
//!
//! Composes a message per record (subject from severity and message prefix,
//! body from the full record) and hands it to an SMTP-capable transport.
//! The sink is deferred: the logger queues its writes to the worker thread,
//! so a slow or retrying send never blocks a logging call. The alarm
//! dispatcher delivers its notices through this sink as well.

use crate::core::{AlarmNotice, Record, Severity, Sink, SinkError, SinkKind, SinkResult, WriteAck};
use crate::sinks::database::RetryPolicy;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Maximum message prefix carried into a subject line.
const SUBJECT_PREFIX_LEN: usize = 60;

/// A composed outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// SMTP-capable transport the email sink hands messages to.
pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &MailMessage) -> SinkResult<()>;
}

/// Minimal SMTP client over a plain TCP connection.
///
/// Speaks HELO / AUTH PLAIN / MAIL FROM / RCPT TO / DATA with write and
/// read timeouts so a stuck server cannot hold the worker thread forever.
/// TLS stays with a collaborator-provided transport behind [`MailTransport`].
pub struct SmtpTransport {
    host: String,
    port: u16,
    timeout: Duration,
    credentials: Option<(String, String)>,
}

impl SmtpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(5),
            credentials: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Authenticate with AUTH PLAIN using the given user and password.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    fn connect(&self) -> SinkResult<TcpStream> {
        let address = format!("{}:{}", self.host, self.port);
        let stream = TcpStream::connect(&address)
            .map_err(|e| SinkError::from_io("email", &e))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| SinkError::from_io("email", &e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| SinkError::from_io("email", &e))?;
        Ok(stream)
    }

    fn read_reply(reader: &mut BufReader<TcpStream>) -> SinkResult<u16> {
        loop {
            let mut line = String::new();
            reader
                .read_line(&mut line)
                .map_err(|e| SinkError::from_io("email", &e))?;
            if line.len() < 4 {
                return Err(SinkError::unavailable("email", "short SMTP reply"));
            }
            // `get` rather than a slice: byte 3 may not be a char boundary
            // in a garbled reply, and that must not panic.
            let code = line
                .get(..3)
                .and_then(|digits| digits.parse::<u16>().ok())
                .ok_or_else(|| SinkError::unavailable("email", "malformed SMTP reply"))?;
            // A dash after the code marks a continuation line.
            if line.as_bytes()[3] != b'-' {
                return Ok(code);
            }
        }
    }

    fn command(
        stream: &mut TcpStream,
        reader: &mut BufReader<TcpStream>,
        line: &str,
        expect: u16,
    ) -> SinkResult<()> {
        stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.write_all(b"\r\n"))
            .map_err(|e| SinkError::from_io("email", &e))?;
        Self::expect(Self::read_reply(reader)?, expect, line)
    }

    fn expect(code: u16, expect: u16, command: &str) -> SinkResult<()> {
        if code == expect {
            Ok(())
        } else if code >= 500 {
            Err(SinkError::rejected(
                "email",
                format!("server replied {} to '{}'", code, command.trim()),
            ))
        } else {
            Err(SinkError::unavailable(
                "email",
                format!("server replied {} to '{}'", code, command.trim()),
            ))
        }
    }

    /// Escape a leading dot per the SMTP data transparency rule.
    fn dot_stuff(body: &str) -> String {
        body.lines()
            .map(|line| {
                if line.starts_with('.') {
                    format!(".{}", line)
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\r\n")
    }
}

impl MailTransport for SmtpTransport {
    fn send(&self, mail: &MailMessage) -> SinkResult<()> {
        if mail.to.is_empty() {
            return Err(SinkError::rejected("email", "no recipients"));
        }

        let mut stream = self.connect()?;
        let mut reader = BufReader::new(
            stream
                .try_clone()
                .map_err(|e| SinkError::from_io("email", &e))?,
        );

        Self::expect(Self::read_reply(&mut reader)?, 220, "<greeting>")?;
        Self::command(&mut stream, &mut reader, "HELO fanlog", 250)?;

        if let Some((user, password)) = &self.credentials {
            let token = BASE64.encode(format!("\0{}\0{}", user, password));
            Self::command(&mut stream, &mut reader, &format!("AUTH PLAIN {}", token), 235)?;
        }

        Self::command(
            &mut stream,
            &mut reader,
            &format!("MAIL FROM:<{}>", mail.from),
            250,
        )?;
        for recipient in &mail.to {
            Self::command(
                &mut stream,
                &mut reader,
                &format!("RCPT TO:<{}>", recipient),
                250,
            )?;
        }

        Self::command(&mut stream, &mut reader, "DATA", 354)?;
        let payload = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\n\r\n{}\r\n.",
            mail.from,
            mail.to.join(", "),
            mail.subject,
            Self::dot_stuff(&mail.body)
        );
        Self::command(&mut stream, &mut reader, &payload, 250)?;
        Self::command(&mut stream, &mut reader, "QUIT", 221)?;
        Ok(())
    }
}

/// Sends one message per record through a [`MailTransport`].
pub struct EmailSink {
    transport: Arc<dyn MailTransport>,
    sender: String,
    recipients: Vec<String>,
    min_severity: Severity,
    enabled: AtomicBool,
    closed: AtomicBool,
    retry: RetryPolicy,
}

impl EmailSink {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        sender: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            transport,
            sender: sender.into(),
            recipients,
            min_severity: Severity::Error,
            enabled: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    fn compose(&self, record: &Record) -> MailMessage {
        let prefix: String = record.message.chars().take(SUBJECT_PREFIX_LEN).collect();
        let subject = format!("{}: {}", record.severity, prefix);

        let mut body = format!(
            "severity: {}\ntime: {}\nmessage: {}\n",
            record.severity,
            record.timestamp.to_rfc3339(),
            record.message
        );
        if let Some(source) = record.source_location() {
            body.push_str(&format!("source: {}\n", source));
        }
        if let Some(ref context) = record.context {
            if !context.is_empty() {
                body.push_str(&format!("context: {}\n", context.format_fields()));
            }
        }

        MailMessage {
            from: self.sender.clone(),
            to: self.recipients.clone(),
            subject,
            body,
        }
    }
}

impl Sink for EmailSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Email
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed) && !self.closed.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn write(&self, record: &Record) -> SinkResult<WriteAck> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(SinkError::rejected(self.name(), "sink is closed"));
        }

        let mail = self.compose(record);
        self.retry.run(|| self.transport.send(&mail))?;
        Ok(WriteAck::new(SinkKind::Email))
    }

    fn send_alarm(&self, notice: &AlarmNotice) -> SinkResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(SinkError::rejected(self.name(), "sink is closed"));
        }

        let to = if notice.recipients.is_empty() {
            self.recipients.clone()
        } else {
            notice.recipients.clone()
        };
        let mail = MailMessage {
            from: self.sender.clone(),
            to,
            subject: notice.subject.clone(),
            body: notice.body.clone(),
        };
        self.retry.run(|| self.transport.send(&mail))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
