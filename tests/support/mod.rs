// ABOUTME: Test support utilities.
// ABOUTME: In-memory backends that record every call, plus tracing setup.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Once};
use std::time::Duration;

use stevedore::backend::*;
use stevedore::exec::ExecError;
use stevedore::types::SecretValue;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("stevedore=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const ACCOUNT: &str = "123456789012";
pub const REGION: &str = "us-west-2";
pub const DB_HOST: &str = "hello.abc123.us-west-2.rds.amazonaws.com";

/// Ordered log of every backend call, shared by all fakes.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.0.lock().iter().any(|c| c.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

fn unavailable(what: &str) -> BackendError {
    BackendError::Unavailable(format!("{what} unavailable"))
}

// =============================================================================
// Provisioner
// =============================================================================

pub struct FakeProvisioner {
    pub log: CallLog,
    pub initialized: Mutex<bool>,
    pub resources: Mutex<usize>,
    pub outputs: Mutex<HashMap<OutputKey, String>>,
}

impl FakeProvisioner {
    pub fn applied(log: CallLog) -> Self {
        let outputs = HashMap::from([
            (OutputKey::ClusterName, "hello-cluster".to_string()),
            (OutputKey::RdsEndpoint, format!("{DB_HOST}:3306")),
            (OutputKey::RdsDatabaseName, "hello_world".to_string()),
            (OutputKey::RdsUsername, "admin".to_string()),
            (OutputKey::Region, REGION.to_string()),
        ]);
        Self {
            log,
            initialized: Mutex::new(true),
            resources: Mutex::new(12),
            outputs: Mutex::new(outputs),
        }
    }

    pub fn set(&self, key: OutputKey, value: &str) {
        self.outputs.lock().insert(key, value.to_string());
    }

    pub fn remove(&self, key: OutputKey) {
        self.outputs.lock().remove(&key);
    }
}

#[async_trait]
impl ProvisionerOps for FakeProvisioner {
    async fn is_initialized(&self) -> Result<bool, BackendError> {
        self.log.push("provisioner.is_initialized");
        Ok(*self.initialized.lock())
    }

    async fn tracked_resources(&self) -> Result<usize, BackendError> {
        self.log.push("provisioner.tracked_resources");
        Ok(*self.resources.lock())
    }

    async fn output(&self, key: OutputKey) -> Result<Option<String>, BackendError> {
        self.log.push(format!("provisioner.output {key}"));
        Ok(self.outputs.lock().get(&key).cloned())
    }
}

// =============================================================================
// Identity
// =============================================================================

pub struct FakeIdentity {
    pub log: CallLog,
    pub account: Mutex<Option<String>>,
    pub cli_region: Mutex<Option<String>>,
    pub bind_fails: Mutex<bool>,
}

impl FakeIdentity {
    pub fn valid(log: CallLog) -> Self {
        Self {
            log,
            account: Mutex::new(Some(ACCOUNT.to_string())),
            cli_region: Mutex::new(None),
            bind_fails: Mutex::new(false),
        }
    }
}

#[async_trait]
impl IdentityOps for FakeIdentity {
    async fn caller_identity(&self) -> Result<CallerIdentity, BackendError> {
        self.log.push("identity.caller_identity");
        match self.account.lock().clone() {
            Some(account) => Ok(CallerIdentity {
                arn: format!("arn:aws:iam::{account}:user/deployer"),
                account,
            }),
            None => Err(BackendError::CommandFailed {
                command: "aws sts get-caller-identity".to_string(),
                stderr: "ExpiredToken".to_string(),
            }),
        }
    }

    async fn configured_region(&self) -> Result<Option<String>, BackendError> {
        self.log.push("identity.configured_region");
        Ok(self.cli_region.lock().clone())
    }

    async fn bind_cluster_context(&self, region: &str, cluster: &str) -> Result<(), BackendError> {
        self.log.push(format!("identity.bind {region} {cluster}"));
        if *self.bind_fails.lock() {
            Err(unavailable("cluster"))
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// Cluster (secrets and workloads)
// =============================================================================

/// A stored secret with its plaintext values.
#[derive(Debug, Clone, Default)]
pub struct StoredSecret {
    pub object: SecretObject,
    pub values: BTreeMap<String, String>,
}

pub struct FakeCluster {
    pub log: CallLog,
    pub reachable: Mutex<bool>,
    pub namespaces: Mutex<BTreeSet<String>>,
    pub secrets: Mutex<BTreeMap<(String, String), StoredSecret>>,
    /// Status snapshots returned by successive `deployments` calls; the last one repeats.
    pub deployment_polls: Mutex<VecDeque<Vec<DeploymentStatus>>>,
    pub deployments_listable: Mutex<bool>,
    pub services: Mutex<Vec<ServiceExposure>>,
    pub pods: Mutex<Vec<PodSummary>>,
    pub events: Mutex<Vec<EventSummary>>,
    pub logs: Mutex<String>,
    pub description: Mutex<String>,
}

pub fn rolled_out(name: &str) -> DeploymentStatus {
    DeploymentStatus {
        name: name.to_string(),
        generation: 2,
        observed_generation: 2,
        desired_replicas: 2,
        replicas: 2,
        updated_replicas: 2,
        ready_replicas: 2,
        available_replicas: 2,
    }
}

pub fn rolling(name: &str) -> DeploymentStatus {
    DeploymentStatus {
        replicas: 3,
        updated_replicas: 1,
        ready_replicas: 2,
        available_replicas: 2,
        ..rolled_out(name)
    }
}

impl FakeCluster {
    pub fn healthy(log: CallLog) -> Self {
        Self {
            log,
            reachable: Mutex::new(true),
            namespaces: Mutex::new(BTreeSet::new()),
            secrets: Mutex::new(BTreeMap::new()),
            deployment_polls: Mutex::new(VecDeque::from([vec![rolled_out("hello-world")]])),
            deployments_listable: Mutex::new(true),
            services: Mutex::new(vec![ServiceExposure::LoadBalancer {
                name: "hello-world".to_string(),
                address: Some("a1b2.elb.amazonaws.com".to_string()),
                port: 80,
            }]),
            pods: Mutex::new(vec![PodSummary {
                name: "hello-world-7d9f-abcde".to_string(),
                phase: "Running".to_string(),
                ready_containers: 1,
                total_containers: 1,
                restarts: 0,
            }]),
            events: Mutex::new(Vec::new()),
            logs: Mutex::new(String::new()),
            description: Mutex::new(String::new()),
        }
    }

    pub fn secret(&self, name: &str, namespace: &str) -> Option<StoredSecret> {
        self.secrets
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Seed a secret without ownership metadata.
    pub fn seed_secret(&self, name: &str, namespace: &str, password: &str) {
        let object = SecretObject {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        };
        self.secrets.lock().insert(
            (namespace.to_string(), name.to_string()),
            StoredSecret {
                object,
                values: BTreeMap::from([("password".to_string(), password.to_string())]),
            },
        );
    }

    fn with_secret<F>(&self, name: &str, namespace: &str, f: F) -> Result<(), BackendError>
    where
        F: FnOnce(&mut StoredSecret),
    {
        let mut secrets = self.secrets.lock();
        let secret = secrets
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| BackendError::CommandFailed {
                command: format!("kubectl label secret {name}"),
                stderr: "NotFound".to_string(),
            })?;
        f(secret);
        Ok(())
    }
}

#[async_trait]
impl SecretOps for FakeCluster {
    async fn ensure_namespace(&self, namespace: &str) -> Result<(), BackendError> {
        self.log.push(format!("secrets.ensure_namespace {namespace}"));
        self.namespaces.lock().insert(namespace.to_string());
        Ok(())
    }

    async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<SecretObject>, BackendError> {
        self.log.push(format!("secrets.get {name}"));
        Ok(self.secret(name, namespace).map(|s| s.object))
    }

    async fn apply_secret(&self, manifest: &SecretManifest) -> Result<(), BackendError> {
        self.log.push(format!("secrets.apply {}", manifest.name));
        let values: BTreeMap<String, String> = manifest
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.expose().to_string()))
            .collect();
        let object = SecretObject {
            name: manifest.name.clone(),
            namespace: manifest.namespace.clone(),
            labels: manifest.labels.clone(),
            annotations: manifest.annotations.clone(),
            data: values.keys().map(|k| (k.clone(), "<encoded>".to_string())).collect(),
        };
        self.secrets.lock().insert(
            (manifest.namespace.clone(), manifest.name.clone()),
            StoredSecret { object, values },
        );
        Ok(())
    }

    async fn label_secret(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError> {
        self.log.push(format!("secrets.label {name} {key}"));
        self.with_secret(name, namespace, |s| {
            s.object.labels.insert(key.to_string(), value.to_string());
        })
    }

    async fn annotate_secret(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError> {
        self.log.push(format!("secrets.annotate {name} {key}"));
        self.with_secret(name, namespace, |s| {
            s.object.annotations.insert(key.to_string(), value.to_string());
        })
    }
}

#[async_trait]
impl WorkloadOps for FakeCluster {
    async fn probe(&self) -> Result<(), BackendError> {
        self.log.push("workloads.probe");
        if *self.reachable.lock() {
            Ok(())
        } else {
            Err(unavailable("api server"))
        }
    }

    async fn deployments(
        &self,
        selector: &str,
        _namespace: &str,
    ) -> Result<Vec<DeploymentStatus>, BackendError> {
        self.log.push(format!("workloads.deployments {selector}"));
        if !*self.deployments_listable.lock() {
            return Err(unavailable("deployments"));
        }
        let mut polls = self.deployment_polls.lock();
        if polls.len() > 1 {
            Ok(polls.pop_front().unwrap_or_default())
        } else {
            Ok(polls.front().cloned().unwrap_or_default())
        }
    }

    async fn restart_deployment(&self, name: &str, _namespace: &str) -> Result<(), BackendError> {
        self.log.push(format!("workloads.restart {name}"));
        Ok(())
    }

    async fn services(
        &self,
        _selector: &str,
        _namespace: &str,
    ) -> Result<Vec<ServiceExposure>, BackendError> {
        self.log.push("workloads.services");
        Ok(self.services.lock().clone())
    }

    async fn pods(
        &self,
        _selector: &str,
        _namespace: &str,
    ) -> Result<Vec<PodSummary>, BackendError> {
        self.log.push("workloads.pods");
        Ok(self.pods.lock().clone())
    }

    async fn events(
        &self,
        _namespace: &str,
        limit: usize,
    ) -> Result<Vec<EventSummary>, BackendError> {
        self.log.push(format!("workloads.events {limit}"));
        let events = self.events.lock();
        let skip = events.len().saturating_sub(limit);
        Ok(events[skip..].to_vec())
    }

    async fn pod_logs(&self, pod: &str, _namespace: &str, tail: u32) -> Result<String, BackendError> {
        self.log.push(format!("workloads.logs {pod} {tail}"));
        Ok(self.logs.lock().clone())
    }

    async fn describe_pod(&self, pod: &str, _namespace: &str) -> Result<String, BackendError> {
        self.log.push(format!("workloads.describe {pod}"));
        Ok(self.description.lock().clone())
    }
}

// =============================================================================
// Registry
// =============================================================================

pub struct FakeRegistry {
    pub log: CallLog,
    pub repositories: Mutex<BTreeSet<String>>,
    pub images: Mutex<BTreeSet<(String, String)>>,
    pub token: Mutex<Option<String>>,
}

impl FakeRegistry {
    pub fn with_image(log: CallLog, repository: &str, tag: &str) -> Self {
        Self {
            log,
            repositories: Mutex::new(BTreeSet::from([repository.to_string()])),
            images: Mutex::new(BTreeSet::from([(repository.to_string(), tag.to_string())])),
            token: Mutex::new(Some("ecr-login-token".to_string())),
        }
    }
}

#[async_trait]
impl RegistryOps for FakeRegistry {
    async fn repository_exists(&self, repository: &str, _region: &str) -> Result<bool, BackendError> {
        self.log.push(format!("registry.repository_exists {repository}"));
        Ok(self.repositories.lock().contains(repository))
    }

    async fn image_exists(
        &self,
        repository: &str,
        tag: &str,
        _region: &str,
    ) -> Result<bool, BackendError> {
        self.log.push(format!("registry.image_exists {repository}:{tag}"));
        Ok(self
            .images
            .lock()
            .contains(&(repository.to_string(), tag.to_string())))
    }

    async fn list_tags(&self, repository: &str, _region: &str) -> Result<Vec<String>, BackendError> {
        self.log.push(format!("registry.list_tags {repository}"));
        Ok(self
            .images
            .lock()
            .iter()
            .filter(|(r, _)| r == repository)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn mint_login_token(&self, _region: &str) -> Result<SecretValue, BackendError> {
        self.log.push("registry.mint_login_token");
        self.token
            .lock()
            .clone()
            .map(SecretValue::new)
            .ok_or_else(|| unavailable("registry token"))
    }
}

// =============================================================================
// Release manager
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseBehavior {
    Succeed,
    TimeOut,
    Fail,
}

pub struct FakeRelease {
    pub log: CallLog,
    pub behavior: Mutex<ReleaseBehavior>,
    pub requests: Mutex<Vec<(ReleaseRequest, Duration)>>,
    pub status: Mutex<String>,
}

impl FakeRelease {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            behavior: Mutex::new(ReleaseBehavior::Succeed),
            requests: Mutex::new(Vec::new()),
            status: Mutex::new("STATUS: deployed".to_string()),
        }
    }
}

#[async_trait]
impl ReleaseOps for FakeRelease {
    async fn upgrade_or_install(
        &self,
        request: &ReleaseRequest,
        timeout: Duration,
    ) -> Result<(), BackendError> {
        self.log.push(format!("release.upgrade {}", request.release));
        self.requests.lock().push((request.clone(), timeout));
        match *self.behavior.lock() {
            ReleaseBehavior::Succeed => Ok(()),
            ReleaseBehavior::TimeOut => Err(BackendError::Exec(ExecError::Timeout {
                program: "helm".to_string(),
                timeout,
            })),
            ReleaseBehavior::Fail => Err(BackendError::CommandFailed {
                command: "helm upgrade --install".to_string(),
                stderr: format!(
                    "UPGRADE FAILED with {}",
                    request
                        .values
                        .iter()
                        .map(|(key, value)| format!("{key}={value}"))
                        .collect::<Vec<_>>()
                        .join(" ")
                ),
            }),
        }
    }

    async fn status(&self, release: &str, _namespace: &str) -> Result<String, BackendError> {
        self.log.push(format!("release.status {release}"));
        Ok(self.status.lock().clone())
    }
}

// =============================================================================
// World
// =============================================================================

/// A complete set of fakes describing a provisioned, healthy environment.
pub struct World {
    pub log: CallLog,
    pub provisioner: Arc<FakeProvisioner>,
    pub identity: Arc<FakeIdentity>,
    pub cluster: Arc<FakeCluster>,
    pub registry: Arc<FakeRegistry>,
    pub release: Arc<FakeRelease>,
}

impl World {
    pub fn healthy() -> Self {
        let log = CallLog::default();
        Self {
            provisioner: Arc::new(FakeProvisioner::applied(log.clone())),
            identity: Arc::new(FakeIdentity::valid(log.clone())),
            cluster: Arc::new(FakeCluster::healthy(log.clone())),
            registry: Arc::new(FakeRegistry::with_image(log.clone(), "hello-world", "latest")),
            release: Arc::new(FakeRelease::new(log.clone())),
            log,
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            provisioner: self.provisioner.clone(),
            identity: self.identity.clone(),
            secrets: self.cluster.clone(),
            workloads: self.cluster.clone(),
            registry: self.registry.clone(),
            release: self.release.clone(),
        }
    }
}

/// Configuration with a fast rollout poll for tests.
pub fn fast_config() -> stevedore::config::Config {
    stevedore::config::Config {
        poll_interval: Duration::from_millis(10),
        rollout_timeout: Duration::from_millis(50),
        ..Default::default()
    }
}
