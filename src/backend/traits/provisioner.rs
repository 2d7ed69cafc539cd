// ABOUTME: Read-only interface to the infrastructure provisioner's state and outputs.
// ABOUTME: Output lookups return None for absent keys instead of failing.

use crate::backend::BackendError;
use async_trait::async_trait;
use std::fmt;

/// Well-known provisioner output names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKey {
    ClusterName,
    RdsEndpoint,
    RdsAddress,
    RdsPort,
    RdsDatabaseName,
    RdsUsername,
    Region,
}

impl OutputKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKey::ClusterName => "cluster_name",
            OutputKey::RdsEndpoint => "rds_endpoint",
            OutputKey::RdsAddress => "rds_address",
            OutputKey::RdsPort => "rds_port",
            OutputKey::RdsDatabaseName => "rds_database_name",
            OutputKey::RdsUsername => "rds_username",
            OutputKey::Region => "region",
        }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provisioner state and output queries.
#[async_trait]
pub trait ProvisionerOps: Send + Sync {
    /// Whether the provisioner working directory has been initialized.
    async fn is_initialized(&self) -> Result<bool, BackendError>;

    /// Number of resources tracked in the provisioner's state.
    async fn tracked_resources(&self) -> Result<usize, BackendError>;

    /// Look up a named output. Absent keys yield `Ok(None)`.
    async fn output(&self, key: OutputKey) -> Result<Option<String>, BackendError>;
}
