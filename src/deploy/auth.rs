// ABOUTME: Verifies cloud credentials and binds the local cluster context.
// ABOUTME: Single attempt per step; the caller identity is kept for image resolution.

use snafu::ResultExt;

use super::error::{ConnectivitySnafu, ContextBindSnafu, CredentialSnafu, DeployError};
use crate::backend::{CallerIdentity, IdentityOps, WorkloadOps};

/// Authenticate, bind the cluster context, and confirm the cluster answers.
pub async fn authenticate(
    identity: &dyn IdentityOps,
    workloads: &dyn WorkloadOps,
    cluster: &str,
    region: &str,
) -> Result<CallerIdentity, DeployError> {
    let caller = identity.caller_identity().await.context(CredentialSnafu)?;
    tracing::info!(account = %caller.masked_account(), "authenticated");

    identity
        .bind_cluster_context(region, cluster)
        .await
        .context(ContextBindSnafu { cluster, region })?;

    workloads
        .probe()
        .await
        .context(ConnectivitySnafu { cluster })?;

    tracing::debug!(cluster, region, "cluster context bound");
    Ok(caller)
}
