// ABOUTME: Drives a deployment from provisioner facts to verified rollout.
// ABOUTME: Also exposes the facts-only and diagnose-only entry points.

use super::context::DeploymentContext;
use super::deployment::{Deployment, DeploymentSummary};
use super::error::DeployError;
use super::facts;
use super::image::Interaction;
use super::report::{self, DiagnosticReport, Redactor};
use crate::backend::Backends;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::output::Output;
use crate::prompt::OperatorInput;
use crate::types::SecretValue;

/// Read provisioner facts into a fresh deployment context.
pub async fn resolve_context(
    backends: &Backends,
    config: &Config,
    diag: &mut Diagnostics,
) -> Result<DeploymentContext, DeployError> {
    let facts = facts::extract(
        backends.provisioner.as_ref(),
        backends.identity.as_ref(),
        config,
        diag,
    )
    .await?;
    Ok(DeploymentContext::new(facts, config))
}

/// Run the full deployment.
pub async fn run(
    backends: &Backends,
    config: &Config,
    supplied_secret: Option<SecretValue>,
    input: &dyn OperatorInput,
    output: &Output,
    diag: &mut Diagnostics,
) -> Result<DeploymentSummary, DeployError> {
    output.progress("Reading infrastructure outputs...");
    let context = resolve_context(backends, config, diag).await?;
    output.progress(&format!(
        "Cluster {} in {} (region from {})",
        context.cluster_name, context.region, context.region_source
    ));
    let deployment = Deployment::new(context);

    output.progress("Authenticating...");
    let deployment = deployment
        .authenticate(backends.identity.as_ref(), backends.workloads.as_ref())
        .await?;
    output.progress(&format!(
        "Authenticated as account {}",
        deployment.state().identity().masked_account()
    ));

    output.progress("Preparing database secret...");
    let deployment = deployment
        .prepare_secret(backends.secrets.as_ref(), config, supplied_secret, input)
        .await?;
    if let Some(secret) = &deployment.context().secret {
        output.progress(&format!("Database secret {} {}", secret.name, secret.outcome));
    }

    output.progress("Resolving image...");
    let deployment = {
        let mut io = Interaction {
            input,
            output,
            diag: &mut *diag,
        };
        deployment
            .resolve_image(
                backends.registry.as_ref(),
                backends.secrets.as_ref(),
                config,
                &mut io,
            )
            .await?
    };
    if let Some(image) = &deployment.context().image {
        let redacted = deployment.redactor.apply(&image.to_string());
        output.progress(&format!("Deploying {redacted}"));
    }

    output.progress(&format!(
        "Releasing {} (timeout {}s)...",
        deployment.context().release_name,
        config.release_timeout.as_secs()
    ));
    let deployment = match deployment.release(backends.release.as_ref(), config).await {
        Ok(released) => released,
        Err((failed, failure)) => {
            output.error(&format!(
                "Release failed after {}s; collecting diagnostics",
                failure.elapsed.as_secs()
            ));
            return Err(failed
                .diagnose(backends.workloads.as_ref(), backends.release.as_ref(), failure)
                .await);
        }
    };

    output.progress("Restarting workloads and waiting for rollout...");
    let completed = deployment
        .verify_rollout(backends.workloads.as_ref(), config, diag)
        .await;

    Ok(completed.finish())
}

/// Collect a diagnostic report on demand.
pub async fn diagnose(backends: &Backends, config: &Config) -> DiagnosticReport {
    let mut redactor = Redactor::new();
    match backends.identity.caller_identity().await {
        Ok(caller) => redactor = redactor.account(&caller.account),
        Err(e) => tracing::debug!("caller identity unavailable for redaction: {}", e),
    }

    report::collect(
        backends.workloads.as_ref(),
        backends.release.as_ref(),
        config.release.as_str(),
        config.namespace.as_str(),
        &config.release_selector(),
        &redactor,
    )
    .await
}
