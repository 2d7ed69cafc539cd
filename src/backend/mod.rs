// ABOUTME: Backends for the external tools: interfaces and CLI implementations.
// ABOUTME: The pipeline only sees the traits; `Backends` bundles one of each.

pub mod cli;
mod error;
pub mod traits;

pub use error::BackendError;
pub use traits::*;

use std::sync::Arc;

/// One implementation of every interface the pipeline needs.
#[derive(Clone)]
pub struct Backends {
    pub provisioner: Arc<dyn ProvisionerOps>,
    pub identity: Arc<dyn IdentityOps>,
    pub secrets: Arc<dyn SecretOps>,
    pub workloads: Arc<dyn WorkloadOps>,
    pub registry: Arc<dyn RegistryOps>,
    pub release: Arc<dyn ReleaseOps>,
}
