// ABOUTME: Error type shared by all backend interfaces.
// ABOUTME: Distinguishes tool failures, timeouts, and unparseable output.

use thiserror::Error;

use crate::exec::ExecError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("unexpected output from `{command}`: {reason}")]
    Parse { command: String, reason: String },

    #[error("{0}")]
    Unavailable(String),
}

impl BackendError {
    /// Whether the underlying command hit its time limit.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Exec(e) if e.is_timeout())
    }

    /// Rewrite the free-form text this error carries, e.g. to mask identifiers.
    pub fn map_text(self, f: impl Fn(&str) -> String) -> Self {
        match self {
            BackendError::CommandFailed { command, stderr } => BackendError::CommandFailed {
                command: f(&command),
                stderr: f(&stderr),
            },
            BackendError::Parse { command, reason } => BackendError::Parse {
                command: f(&command),
                reason: f(&reason),
            },
            BackendError::Unavailable(message) => BackendError::Unavailable(f(&message)),
            exec @ BackendError::Exec(_) => exec,
        }
    }
}
