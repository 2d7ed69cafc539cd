// ABOUTME: Deployment error taxonomy with SNAFU pattern.
// ABOUTME: Every variant carries a remediation hint; kind() supports programmatic handling.

use snafu::Snafu;
use std::time::Duration;

use super::report::DiagnosticReport;
use crate::backend::BackendError;

/// Errors that stop the deployment pipeline.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeployError {
    #[snafu(display("{message}; run `{remediation}` first"))]
    Precondition {
        message: String,
        remediation: String,
    },

    #[snafu(display(
        "cloud credentials are not valid: {source}; re-authenticate (for example `aws sso login` or refresh your access keys)"
    ))]
    Credential { source: BackendError },

    #[snafu(display(
        "could not bind the cluster context for {cluster} in {region}: {source}; check for expired credentials, local clock skew, or missing permission to describe the cluster"
    ))]
    ContextBind {
        cluster: String,
        region: String,
        source: BackendError,
    },

    #[snafu(display(
        "cluster {cluster} is not reachable: {source}; check network access to the control plane endpoint"
    ))]
    Connectivity {
        cluster: String,
        source: BackendError,
    },

    #[snafu(display("{message}"))]
    Validation { message: String },

    #[snafu(display("{message}; pass --image with a full image reference"))]
    Discovery { message: String },

    #[snafu(display(
        "release {release} failed after {}s: {source}; see the diagnostic report above",
        elapsed.as_secs()
    ))]
    Release {
        release: String,
        elapsed: Duration,
        source: BackendError,
        report: Option<Box<DiagnosticReport>>,
    },

    #[snafu(display("deployment cancelled: {reason}"))]
    Cancelled { reason: String },

    #[snafu(display("failed to {action}: {source}"))]
    Backend {
        action: &'static str,
        source: BackendError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Precondition,
    Credential,
    ContextBind,
    Connectivity,
    Validation,
    Discovery,
    Release,
    Cancelled,
    Backend,
}

impl DeployError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Precondition { .. } => DeployErrorKind::Precondition,
            DeployError::Credential { .. } => DeployErrorKind::Credential,
            DeployError::ContextBind { .. } => DeployErrorKind::ContextBind,
            DeployError::Connectivity { .. } => DeployErrorKind::Connectivity,
            DeployError::Validation { .. } => DeployErrorKind::Validation,
            DeployError::Discovery { .. } => DeployErrorKind::Discovery,
            DeployError::Release { .. } => DeployErrorKind::Release,
            DeployError::Cancelled { .. } => DeployErrorKind::Cancelled,
            DeployError::Backend { .. } => DeployErrorKind::Backend,
        }
    }

    /// Diagnostic report attached to a failed release.
    pub fn report(&self) -> Option<&DiagnosticReport> {
        match self {
            DeployError::Release { report, .. } => report.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn precondition(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        DeployError::Precondition {
            message: message.into(),
            remediation: remediation.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DeployError::Validation {
            message: message.into(),
        }
    }
}
