// ABOUTME: Typed interfaces to the external collaborators of the pipeline.
// ABOUTME: Provisioner, identity, cluster secrets/workloads, registry, and release manager.

mod cluster;
mod identity;
mod provisioner;
mod registry;
mod release;

pub use cluster::{
    DeploymentStatus, EventSummary, PodSummary, SecretManifest, SecretObject, SecretOps,
    ServiceExposure, WorkloadOps,
};
pub use identity::{CallerIdentity, IdentityOps, mask};
pub use provisioner::{OutputKey, ProvisionerOps};
pub use registry::RegistryOps;
pub use release::{ReleaseOps, ReleaseRequest};
