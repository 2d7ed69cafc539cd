// ABOUTME: Forces a fresh rollout after a successful release and waits for it to settle.
// ABOUTME: Also builds access instructions from the release's services.

use std::time::Duration;

use crate::backend::{ServiceExposure, WorkloadOps};
use crate::diagnostics::{Diagnostics, Warning};

/// Local port suggested for port-forwarding.
const LOCAL_FORWARD_PORT: u16 = 8080;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutOutcome {
    /// Every matching deployment finished rolling out.
    Ready,
    /// The wait expired; the release itself still succeeded.
    TimedOut,
    /// No deployment matched the selector.
    NothingToRestart,
    /// Deployments could not be listed, so nothing was restarted.
    Unverified,
}

/// Polling bounds for the rollout wait.
#[derive(Debug, Clone, Copy)]
pub struct RolloutWait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl RolloutWait {
    /// Number of polls before giving up.
    pub fn max_polls(&self) -> u64 {
        let interval = self.interval.as_millis().max(1);
        (self.timeout.as_millis() / interval).max(1) as u64
    }
}

/// Restart every deployment matching `selector`, then wait for them.
///
/// Nothing here fails the deployment; problems become warnings.
pub async fn restart_and_wait(
    workloads: &dyn WorkloadOps,
    selector: &str,
    namespace: &str,
    wait: RolloutWait,
    diag: &mut Diagnostics,
) -> RolloutOutcome {
    let deployments = match workloads.deployments(selector, namespace).await {
        Ok(deployments) => deployments,
        Err(e) => {
            diag.warn(Warning::rollout(format!(
                "could not list deployments to restart: {e}"
            )));
            return RolloutOutcome::Unverified;
        }
    };
    if deployments.is_empty() {
        diag.warn(Warning::rollout(format!(
            "no deployment matches {selector} in {namespace}; no fresh rollout was forced"
        )));
        return RolloutOutcome::NothingToRestart;
    }

    for deployment in &deployments {
        if let Err(e) = workloads.restart_deployment(&deployment.name, namespace).await {
            diag.warn(Warning::rollout(format!(
                "could not restart deployment {}: {e}",
                deployment.name
            )));
        }
    }

    for poll in 0..wait.max_polls() {
        tokio::time::sleep(wait.interval).await;
        match workloads.deployments(selector, namespace).await {
            Ok(statuses) if !statuses.is_empty() && statuses.iter().all(|s| s.is_rolled_out()) => {
                tracing::info!(polls = poll + 1, "rollout complete");
                return RolloutOutcome::Ready;
            }
            Ok(_) => tracing::debug!(poll = poll + 1, "rollout in progress"),
            Err(e) => tracing::debug!("rollout status query failed: {}", e),
        }
    }

    diag.warn(Warning::rollout(format!(
        "rollout did not finish within {}s; check `kubectl rollout status -n {namespace}`",
        wait.timeout.as_secs()
    )));
    RolloutOutcome::TimedOut
}

/// How to reach the service, one line per service.
pub async fn access_instructions(
    workloads: &dyn WorkloadOps,
    selector: &str,
    namespace: &str,
) -> Vec<String> {
    match workloads.services(selector, namespace).await {
        Ok(services) => services
            .iter()
            .map(|service| instruction(service, namespace))
            .collect(),
        Err(e) => {
            tracing::debug!("could not list services: {}", e);
            Vec::new()
        }
    }
}

pub fn instruction(service: &ServiceExposure, namespace: &str) -> String {
    match service {
        ServiceExposure::LoadBalancer {
            address: Some(address),
            port,
            ..
        } => format!("Service available at http://{address}:{port}"),
        ServiceExposure::LoadBalancer {
            name, address: None, ..
        } => format!(
            "Load balancer for {name} is still provisioning; check later with \
             `kubectl get svc {name} -n {namespace}`"
        ),
        ServiceExposure::Internal { name, port } => format!(
            "Reach the service with `kubectl port-forward svc/{name} {LOCAL_FORWARD_PORT}:{port} -n {namespace}`"
        ),
    }
}
