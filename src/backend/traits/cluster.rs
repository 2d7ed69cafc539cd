// ABOUTME: Cluster object interfaces for secrets and workloads.
// ABOUTME: SecretOps has apply semantics; WorkloadOps covers rollout and diagnostic queries.

use std::collections::BTreeMap;

use crate::backend::BackendError;
use crate::types::SecretValue;
use async_trait::async_trait;

/// A secret as read back from the cluster. Values stay encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretObject {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub data: BTreeMap<String, String>,
}

/// Desired state of a secret for create-or-update.
#[derive(Debug, Clone)]
pub struct SecretManifest {
    pub name: String,
    pub namespace: String,
    pub secret_type: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub data: BTreeMap<String, SecretValue>,
}

/// Secret and namespace operations.
#[async_trait]
pub trait SecretOps: Send + Sync {
    /// Create the namespace if it does not exist.
    async fn ensure_namespace(&self, namespace: &str) -> Result<(), BackendError>;

    /// Fetch a secret; `Ok(None)` when absent.
    async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<SecretObject>, BackendError>;

    /// Create or update a secret to match the manifest.
    async fn apply_secret(&self, manifest: &SecretManifest) -> Result<(), BackendError>;

    /// Set a label, overwriting any existing value.
    async fn label_secret(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError>;

    /// Set an annotation, overwriting any existing value.
    async fn annotate_secret(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError>;
}

/// Rollout state of one deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub name: String,
    pub generation: i64,
    pub observed_generation: i64,
    pub desired_replicas: i32,
    /// Pods of every revision, including old ones still terminating.
    pub replicas: i32,
    pub updated_replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
}

impl DeploymentStatus {
    /// Whether the controller has finished rolling out the latest spec.
    ///
    /// Mirrors `kubectl rollout status`: every pod must belong to the new
    /// revision and every updated pod must be available.
    pub fn is_rolled_out(&self) -> bool {
        self.observed_generation >= self.generation
            && self.updated_replicas >= self.desired_replicas
            && self.replicas <= self.updated_replicas
            && self.available_replicas >= self.updated_replicas
            && self.ready_replicas >= self.desired_replicas
    }
}

/// How a service is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceExposure {
    /// External load balancer; `address` is None while provisioning.
    LoadBalancer {
        name: String,
        address: Option<String>,
        port: u16,
    },
    /// Only reachable inside the cluster.
    Internal { name: String, port: u16 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSummary {
    pub name: String,
    pub phase: String,
    pub ready_containers: usize,
    pub total_containers: usize,
    pub restarts: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSummary {
    pub last_seen: String,
    pub event_type: String,
    pub reason: String,
    pub object: String,
    pub message: String,
}

/// Workload queries and rollout control.
#[async_trait]
pub trait WorkloadOps: Send + Sync {
    /// Check that the cluster API answers.
    async fn probe(&self) -> Result<(), BackendError>;

    async fn deployments(
        &self,
        selector: &str,
        namespace: &str,
    ) -> Result<Vec<DeploymentStatus>, BackendError>;

    /// Trigger a fresh rollout of a deployment.
    async fn restart_deployment(&self, name: &str, namespace: &str) -> Result<(), BackendError>;

    async fn services(
        &self,
        selector: &str,
        namespace: &str,
    ) -> Result<Vec<ServiceExposure>, BackendError>;

    async fn pods(&self, selector: &str, namespace: &str)
    -> Result<Vec<PodSummary>, BackendError>;

    /// Most recent `limit` events in the namespace, oldest first.
    async fn events(
        &self,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<EventSummary>, BackendError>;

    async fn pod_logs(&self, pod: &str, namespace: &str, tail: u32)
    -> Result<String, BackendError>;

    async fn describe_pod(&self, pod: &str, namespace: &str) -> Result<String, BackendError>;
}
