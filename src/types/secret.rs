// ABOUTME: Sensitive values and references to namespaced credential secrets.
// ABOUTME: SecretValue never prints its contents; SecretReference tracks lifecycle outcome.

use secrecy::{ExposeSecret, Secret};
use std::fmt;

use super::ResourceName;

/// A sensitive string (database password, registry token).
///
/// `Debug` is redacted and there is deliberately no `Display`.
#[derive(Clone)]
pub struct SecretValue(Secret<String>);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value.into()))
    }

    /// Borrow the plaintext. Callers must not log the result.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}

/// What the secret manager did this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOutcome {
    Created,
    Updated,
    Reused,
}

impl fmt::Display for SecretOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecretOutcome::Created => "created",
            SecretOutcome::Updated => "updated",
            SecretOutcome::Reused => "reused",
        };
        f.write_str(s)
    }
}

/// Identifies the database credential secret handed to the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    pub name: ResourceName,
    pub namespace: ResourceName,
    pub managed_by_release: bool,
    pub outcome: SecretOutcome,
}
