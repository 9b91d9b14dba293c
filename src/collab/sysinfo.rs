//! Host information collaborator
//!
//! Supplies a snapshot of ambient facts (host, process, user) that the
//! logger merges into each record's context. Caller-supplied fields always
//! win over snapshot fields with the same name.

use crate::core::RecordContext;

/// Source of default context fields.
pub trait Sysinfo: Send + Sync {
    fn snapshot(&self) -> RecordContext;
}

/// Snapshot built from the standard library: hostname, pid, OS, user and
/// the invoking command line. Computed once at construction since none of
/// these change over the process lifetime.
#[derive(Debug, Clone)]
pub struct HostSysinfo {
    snapshot: RecordContext,
}

impl HostSysinfo {
    pub fn new() -> Self {
        let mut snapshot = RecordContext::new()
            .with_field("pid", i64::from(std::process::id()))
            .with_field("os", std::env::consts::OS);

        if let Some(hostname) = Self::hostname() {
            snapshot.add_field("hostname", hostname);
        }
        if let Ok(user) = std::env::var("USER").or_else(|_| std::env::var("USERNAME")) {
            snapshot.add_field("user", user);
        }

        let argv: Vec<String> = std::env::args().collect();
        if !argv.is_empty() {
            snapshot.add_field("argv", argv.join(" "));
        }

        Self { snapshot }
    }

    fn hostname() -> Option<String> {
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok()
            .filter(|h| !h.is_empty())
    }
}

impl Default for HostSysinfo {
    fn default() -> Self {
        Self::new()
    }
}

impl Sysinfo for HostSysinfo {
    fn snapshot(&self) -> RecordContext {
        self.snapshot.clone()
    }
}
