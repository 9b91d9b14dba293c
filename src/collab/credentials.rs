//! Credential lookup collaborator
//!
//! Sinks that authenticate (SMTP, database stores) ask a [`Credentials`]
//! source for secrets by key instead of reading them from configuration
//! files, so secrets never land in serialized logger options.

use std::collections::HashMap;

/// Key/value secret source.
pub trait Credentials: Send + Sync {
    /// Look up one secret; `None` when the key is unknown.
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory credentials, mostly for tests and embedded setups.
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentials {
    values: HashMap<String, String>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl Credentials for MemoryCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Reads secrets from process environment variables, with an optional
/// prefix (`FANLOG_` turns key `smtp_password` into `FANLOG_SMTP_PASSWORD`).
#[derive(Debug, Default, Clone)]
pub struct EnvCredentials {
    prefix: String,
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Credentials for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        let variable = format!("{}{}", self.prefix, key).to_uppercase();
        std::env::var(variable).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_credentials() {
        let creds = MemoryCredentials::new().with("smtp_user", "mailer");
        assert_eq!(creds.get("smtp_user").as_deref(), Some("mailer"));
        assert_eq!(creds.get("missing"), None);
    }

    #[test]
    fn test_env_credentials_prefix_and_case() {
        std::env::set_var("FANLOG_TEST_TOKEN", "s3cret");
        let creds = EnvCredentials::with_prefix("fanlog_");
        assert_eq!(creds.get("test_token").as_deref(), Some("s3cret"));
        std::env::remove_var("FANLOG_TEST_TOKEN");
    }
}
