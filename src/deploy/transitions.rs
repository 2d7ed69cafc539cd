// ABOUTME: State transition methods for the deployment pipeline.
// ABOUTME: Each method consumes self and returns the next state on success.

use super::auth;
use super::deployment::Deployment;
use super::error::DeployError;
use super::image::{self, ImageTarget, Interaction};
use super::release::{self, ReleaseFailure};
use super::report;
use super::rollout::{self, RolloutWait};
use super::secret;
use super::state::{Authenticated, Completed, FactsResolved, ImageResolved, Released, SecretReady};
use crate::backend::{
    IdentityOps, RegistryOps, ReleaseOps, SecretOps, WorkloadOps,
};
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::prompt::OperatorInput;
use crate::types::SecretValue;

/// Result of a release attempt. On failure the deployment stays in
/// `ImageResolved` so diagnostics can still be collected from it.
pub type ReleaseResult =
    Result<Deployment<Released>, (Deployment<ImageResolved>, ReleaseFailure)>;

impl Deployment<FactsResolved> {
    /// Verify credentials, bind the cluster context, and probe the cluster.
    pub async fn authenticate(
        self,
        identity: &dyn IdentityOps,
        workloads: &dyn WorkloadOps,
    ) -> Result<Deployment<Authenticated>, DeployError> {
        let caller = auth::authenticate(
            identity,
            workloads,
            &self.context.cluster_name,
            &self.context.region,
        )
        .await?;

        let mut next = self.transition(Authenticated { identity: caller });
        next.redactor = next.redactor.account(&next.state.identity.account);
        Ok(next)
    }
}

impl Deployment<Authenticated> {
    /// Make sure the database secret exists and is owned by the release.
    ///
    /// `supplied` comes from the environment; without it the operator is
    /// asked, with wording that depends on whether a secret already exists.
    pub async fn prepare_secret(
        mut self,
        secrets: &dyn SecretOps,
        config: &Config,
        supplied: Option<SecretValue>,
        input: &dyn OperatorInput,
    ) -> Result<Deployment<SecretReady>, DeployError> {
        let observed = secret::inspect(
            secrets,
            &config.secret_name,
            &config.namespace,
            &self.context.release_name,
        )
        .await?;

        let value = match supplied.filter(|v| !v.is_empty()) {
            Some(value) => Some(value),
            None => input.secret(secret::prompt_for(observed.0)),
        };
        if let Some(value) = &value {
            self.redactor = self.redactor.secret(value);
        }

        let reference = secret::reconcile(
            secrets,
            &config.secret_name,
            &config.namespace,
            &self.context.release_name,
            observed,
            value.as_ref(),
        )
        .await?;
        self.context.secret = Some(reference);

        let identity = self.state.identity.clone();
        Ok(self.transition(SecretReady { identity }))
    }
}

impl Deployment<SecretReady> {
    /// Choose the image, provision pull access, and build the release request.
    pub async fn resolve_image(
        mut self,
        registry: &dyn RegistryOps,
        secrets: &dyn SecretOps,
        config: &Config,
        io: &mut Interaction<'_>,
    ) -> Result<Deployment<ImageResolved>, DeployError> {
        let resolved = {
            let target = ImageTarget::new(
                Some(&self.state.identity),
                &self.context.region,
                &self.context.namespace,
                &self.context.release_name,
            );
            image::resolve(registry, secrets, config, &target, io).await?
        };
        self.context.image = Some(resolved.image);
        self.context.pull_secret = resolved.pull_secret;

        let request = self.context.release_request()?;
        Ok(self.transition(ImageResolved { request }))
    }
}

impl Deployment<ImageResolved> {
    /// Run the release once. Never retried.
    pub async fn release(
        self,
        release_ops: &dyn ReleaseOps,
        config: &Config,
    ) -> ReleaseResult {
        match release::execute(release_ops, &self.state.request, config.release_timeout).await {
            Ok(outcome) => Ok(self.transition(Released { outcome })),
            Err(failure) => Err((self, failure)),
        }
    }

    /// Collect the diagnostic report for a failed release and turn the
    /// failure into the final error.
    pub async fn diagnose(
        self,
        workloads: &dyn WorkloadOps,
        release_ops: &dyn ReleaseOps,
        failure: ReleaseFailure,
    ) -> DeployError {
        let report = report::collect(
            workloads,
            release_ops,
            &self.context.release_name,
            &self.context.namespace,
            &self.context.selector(),
            &self.redactor,
        )
        .await;

        let source = failure.source.map_text(|text| self.redactor.apply(text));
        DeployError::Release {
            release: self.context.release_name,
            elapsed: failure.elapsed,
            source,
            report: Some(Box::new(report)),
        }
    }
}

impl Deployment<Released> {
    /// Force a rollout and wait for it; failures here are warnings only.
    pub async fn verify_rollout(
        self,
        workloads: &dyn WorkloadOps,
        config: &Config,
        diag: &mut Diagnostics,
    ) -> Deployment<Completed> {
        let selector = self.context.selector();
        let wait = RolloutWait {
            timeout: config.rollout_timeout,
            interval: config.poll_interval,
        };
        let outcome = rollout::restart_and_wait(
            workloads,
            &selector,
            &self.context.namespace,
            wait,
            diag,
        )
        .await;
        let access =
            rollout::access_instructions(workloads, &selector, &self.context.namespace).await;

        let release = self.state.outcome;
        self.transition(Completed {
            release,
            rollout: outcome,
            access,
        })
    }
}
