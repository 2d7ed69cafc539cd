// ABOUTME: Release manager interface.
// ABOUTME: Upgrade-or-install under a timeout, and release status for diagnostics.

use std::time::Duration;

use crate::backend::BackendError;
use async_trait::async_trait;

/// Fully resolved release invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub release: String,
    pub chart: String,
    pub namespace: String,
    /// Ordered `key=value` overrides, passed as strings.
    pub values: Vec<(String, String)>,
}

#[async_trait]
pub trait ReleaseOps: Send + Sync {
    async fn upgrade_or_install(
        &self,
        request: &ReleaseRequest,
        timeout: Duration,
    ) -> Result<(), BackendError>;

    async fn status(&self, release: &str, namespace: &str) -> Result<String, BackendError>;
}
