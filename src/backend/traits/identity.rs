// ABOUTME: Cloud identity interface: caller identity, CLI defaults, cluster context binding.
// ABOUTME: Account identifiers are only displayed masked.

use crate::backend::BackendError;
use async_trait::async_trait;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
}

impl CallerIdentity {
    /// Account id with all but the last four digits hidden.
    pub fn masked_account(&self) -> String {
        mask(&self.account)
    }
}

/// Hide all but the last four characters of an identifier.
pub fn mask(value: &str) -> String {
    let visible = value.len().saturating_sub(4);
    value
        .char_indices()
        .map(|(i, c)| if i < visible { '*' } else { c })
        .collect()
}

/// Cloud identity operations.
#[async_trait]
pub trait IdentityOps: Send + Sync {
    /// Verify credentials and return the caller identity.
    async fn caller_identity(&self) -> Result<CallerIdentity, BackendError>;

    /// Region configured as the local CLI default, if any.
    async fn configured_region(&self) -> Result<Option<String>, BackendError>;

    /// Point the local cluster CLI context at `cluster` in `region`. Idempotent.
    async fn bind_cluster_context(&self, region: &str, cluster: &str) -> Result<(), BackendError>;
}
