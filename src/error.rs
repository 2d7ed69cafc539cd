// ABOUTME: Application-wide error type and process exit codes for stevedore.
// ABOUTME: Uses thiserror; pipeline failures are wrapped from DeployError.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::{DeployError, DeployErrorKind};

/// Exit code for any failed run.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when the operator declined a confirmation.
pub const EXIT_CANCELLED: i32 = 3;
/// Exit code after an interrupt signal.
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("interrupted; release resources are left in place for the next run to reconcile")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Deploy(e) if e.kind() == DeployErrorKind::Cancelled => EXIT_CANCELLED,
            Error::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
