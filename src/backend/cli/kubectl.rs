// ABOUTME: Cluster backend over kubectl.
// ABOUTME: Server-side apply for secrets and namespaces; JSON queries for workloads and events.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{parse_json, run_checked};
use crate::backend::{
    BackendError, DeploymentStatus, EventSummary, PodSummary, SecretManifest, SecretObject,
    SecretOps, ServiceExposure, WorkloadOps,
};
use crate::exec::{CommandRunner, CommandSpec};
use crate::types::SecretValue;

const FIELD_MANAGER: &str = "stevedore";
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Kubectl<R> {
    runner: R,
}

#[derive(Deserialize)]
struct List<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct Metadata {
    name: String,
    namespace: String,
    generation: i64,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    creation_timestamp: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SecretJson {
    metadata: Metadata,
    data: BTreeMap<String, String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DeploymentJson {
    metadata: Metadata,
    spec: DeploymentSpecJson,
    status: DeploymentStatusJson,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DeploymentSpecJson {
    replicas: Option<i32>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct DeploymentStatusJson {
    observed_generation: i64,
    replicas: i32,
    updated_replicas: i32,
    ready_replicas: i32,
    available_replicas: i32,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ServiceJson {
    metadata: Metadata,
    spec: ServiceSpecJson,
    status: ServiceStatusJson,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ServiceSpecJson {
    #[serde(rename = "type")]
    service_type: String,
    ports: Vec<ServicePortJson>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ServicePortJson {
    port: u16,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ServiceStatusJson {
    load_balancer: LoadBalancerJson,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoadBalancerJson {
    ingress: Vec<IngressJson>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct IngressJson {
    hostname: Option<String>,
    ip: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PodJson {
    metadata: Metadata,
    spec: PodSpecJson,
    status: PodStatusJson,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PodSpecJson {
    containers: Vec<serde_json::Value>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct PodStatusJson {
    phase: String,
    container_statuses: Vec<ContainerStatusJson>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ContainerStatusJson {
    ready: bool,
    restart_count: i32,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct EventJson {
    metadata: Metadata,
    #[serde(rename = "type")]
    event_type: String,
    reason: String,
    message: String,
    involved_object: ObjectRefJson,
    last_timestamp: Option<String>,
    event_time: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ObjectRefJson {
    kind: String,
    name: String,
}

impl EventJson {
    fn seen_at(&self) -> String {
        self.last_timestamp
            .clone()
            .or_else(|| self.event_time.clone())
            .or_else(|| self.metadata.creation_timestamp.clone())
            .unwrap_or_default()
    }
}

impl<R: CommandRunner> Kubectl<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new("kubectl")
    }

    async fn apply(&self, manifest: serde_json::Value) -> Result<(), BackendError> {
        let spec = self
            .command()
            .args([
                "apply",
                "--server-side",
                "--force-conflicts",
                "--field-manager",
                FIELD_MANAGER,
                "-f",
                "-",
            ])
            .stdin(SecretValue::new(manifest.to_string()));
        run_checked(&self.runner, &spec).await?;
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        selector: &str,
        namespace: &str,
    ) -> Result<Vec<T>, BackendError> {
        let spec = self
            .command()
            .args(["get", kind, "-l", selector, "-n", namespace, "-o", "json"]);
        let output = run_checked(&self.runner, &spec).await?;
        let list: List<T> = parse_json(&spec, &output.stdout)?;
        Ok(list.items)
    }
}

/// JSON manifest for a secret; data values are base64-encoded.
fn secret_manifest_json(manifest: &SecretManifest) -> serde_json::Value {
    let data: BTreeMap<&str, String> = manifest
        .data
        .iter()
        .map(|(k, v)| (k.as_str(), BASE64.encode(v.expose())))
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "type": manifest.secret_type,
        "metadata": {
            "name": manifest.name,
            "namespace": manifest.namespace,
            "labels": manifest.labels,
            "annotations": manifest.annotations,
        },
        "data": data,
    })
}

#[async_trait]
impl<R: CommandRunner> SecretOps for Kubectl<R> {
    async fn ensure_namespace(&self, namespace: &str) -> Result<(), BackendError> {
        self.apply(serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": namespace },
        }))
        .await
    }

    async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<SecretObject>, BackendError> {
        let spec = self.command().args([
            "get",
            "secret",
            name,
            "-n",
            namespace,
            "-o",
            "json",
            "--ignore-not-found",
        ]);
        let output = run_checked(&self.runner, &spec).await?;
        if output.stdout.trim().is_empty() {
            return Ok(None);
        }

        let secret: SecretJson = parse_json(&spec, &output.stdout)?;
        Ok(Some(SecretObject {
            name: secret.metadata.name,
            namespace: secret.metadata.namespace,
            labels: secret.metadata.labels,
            annotations: secret.metadata.annotations,
            data: secret.data,
        }))
    }

    async fn apply_secret(&self, manifest: &SecretManifest) -> Result<(), BackendError> {
        self.apply(secret_manifest_json(manifest)).await
    }

    async fn label_secret(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError> {
        let pair = format!("{key}={value}");
        let spec = self.command().args([
            "label",
            "secret",
            name,
            pair.as_str(),
            "--overwrite",
            "-n",
            namespace,
        ]);
        run_checked(&self.runner, &spec).await?;
        Ok(())
    }

    async fn annotate_secret(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), BackendError> {
        let pair = format!("{key}={value}");
        let spec = self.command().args([
            "annotate",
            "secret",
            name,
            pair.as_str(),
            "--overwrite",
            "-n",
            namespace,
        ]);
        run_checked(&self.runner, &spec).await?;
        Ok(())
    }
}

#[async_trait]
impl<R: CommandRunner> WorkloadOps for Kubectl<R> {
    async fn probe(&self) -> Result<(), BackendError> {
        let spec = self
            .command()
            .args(["cluster-info", "--request-timeout=10s"])
            .timeout(PROBE_TIMEOUT);
        run_checked(&self.runner, &spec).await?;
        Ok(())
    }

    async fn deployments(
        &self,
        selector: &str,
        namespace: &str,
    ) -> Result<Vec<DeploymentStatus>, BackendError> {
        let items: Vec<DeploymentJson> = self.get_json("deployments", selector, namespace).await?;
        Ok(items
            .into_iter()
            .map(|d| DeploymentStatus {
                name: d.metadata.name,
                generation: d.metadata.generation,
                observed_generation: d.status.observed_generation,
                desired_replicas: d.spec.replicas.unwrap_or(1),
                replicas: d.status.replicas,
                updated_replicas: d.status.updated_replicas,
                ready_replicas: d.status.ready_replicas,
                available_replicas: d.status.available_replicas,
            })
            .collect())
    }

    async fn restart_deployment(&self, name: &str, namespace: &str) -> Result<(), BackendError> {
        let target = format!("deployment/{name}");
        let spec = self
            .command()
            .args(["rollout", "restart", target.as_str(), "-n", namespace]);
        run_checked(&self.runner, &spec).await?;
        Ok(())
    }

    async fn services(
        &self,
        selector: &str,
        namespace: &str,
    ) -> Result<Vec<ServiceExposure>, BackendError> {
        let items: Vec<ServiceJson> = self.get_json("services", selector, namespace).await?;
        Ok(items
            .into_iter()
            .map(|s| {
                let port = s.spec.ports.first().map(|p| p.port).unwrap_or(80);
                if s.spec.service_type == "LoadBalancer" {
                    let address = s
                        .status
                        .load_balancer
                        .ingress
                        .into_iter()
                        .find_map(|i| i.hostname.or(i.ip));
                    ServiceExposure::LoadBalancer {
                        name: s.metadata.name,
                        address,
                        port,
                    }
                } else {
                    ServiceExposure::Internal {
                        name: s.metadata.name,
                        port,
                    }
                }
            })
            .collect())
    }

    async fn pods(
        &self,
        selector: &str,
        namespace: &str,
    ) -> Result<Vec<PodSummary>, BackendError> {
        let items: Vec<PodJson> = self.get_json("pods", selector, namespace).await?;
        Ok(items
            .into_iter()
            .map(|p| PodSummary {
                name: p.metadata.name,
                phase: p.status.phase,
                ready_containers: p
                    .status
                    .container_statuses
                    .iter()
                    .filter(|c| c.ready)
                    .count(),
                total_containers: p.spec.containers.len(),
                restarts: p
                    .status
                    .container_statuses
                    .iter()
                    .map(|c| c.restart_count)
                    .sum(),
            })
            .collect())
    }

    async fn events(
        &self,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<EventSummary>, BackendError> {
        let spec = self
            .command()
            .args(["get", "events", "-n", namespace, "-o", "json"]);
        let output = run_checked(&self.runner, &spec).await?;
        let list: List<EventJson> = parse_json(&spec, &output.stdout)?;

        let mut events: Vec<EventSummary> = list
            .items
            .into_iter()
            .map(|e| EventSummary {
                last_seen: e.seen_at(),
                event_type: e.event_type,
                reason: e.reason,
                object: format!(
                    "{}/{}",
                    e.involved_object.kind.to_lowercase(),
                    e.involved_object.name
                ),
                message: e.message.trim().to_string(),
            })
            .collect();
        // RFC 3339 timestamps sort lexically
        events.sort_by(|a, b| a.last_seen.cmp(&b.last_seen));
        let skip = events.len().saturating_sub(limit);
        Ok(events.into_iter().skip(skip).collect())
    }

    async fn pod_logs(
        &self,
        pod: &str,
        namespace: &str,
        tail: u32,
    ) -> Result<String, BackendError> {
        let tail = format!("--tail={tail}");
        let spec = self.command().args([
            "logs",
            pod,
            "-n",
            namespace,
            tail.as_str(),
            "--all-containers=true",
        ]);
        Ok(run_checked(&self.runner, &spec).await?.stdout)
    }

    async fn describe_pod(&self, pod: &str, namespace: &str) -> Result<String, BackendError> {
        let spec = self
            .command()
            .args(["describe", "pod", pod, "-n", namespace]);
        Ok(run_checked(&self.runner, &spec).await?.stdout)
    }
}
