// ABOUTME: Generic deployment struct parameterized by state.
// ABOUTME: Owns the deployment context and the redactor for everything it reports.

use super::context::DeploymentContext;
use super::report::Redactor;
use super::state::{Completed, FactsResolved};
use crate::types::SecretOutcome;

/// A deployment in progress, parameterized by its current state.
///
/// Transitions consume the deployment and return the next state, so the
/// pipeline's order is enforced by the compiler.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) context: DeploymentContext,
    pub(crate) redactor: Redactor,
    pub(crate) state: S,
}

impl Deployment<FactsResolved> {
    pub fn new(context: DeploymentContext) -> Self {
        Deployment {
            context,
            redactor: Redactor::new(),
            state: FactsResolved,
        }
    }
}

impl<S> Deployment<S> {
    pub fn context(&self) -> &DeploymentContext {
        &self.context
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Move to the next state, keeping context and redactor.
    pub(crate) fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            context: self.context,
            redactor: self.redactor,
            state,
        }
    }
}

/// What a finished deployment reports.
#[derive(Debug, Clone)]
pub struct DeploymentSummary {
    pub context: DeploymentContext,
    pub secret_outcome: Option<SecretOutcome>,
    pub release_elapsed: std::time::Duration,
    pub rollout: super::rollout::RolloutOutcome,
    pub access: Vec<String>,
}

impl Deployment<Completed> {
    pub fn finish(self) -> DeploymentSummary {
        DeploymentSummary {
            secret_outcome: self.context.secret.as_ref().map(|s| s.outcome),
            release_elapsed: self.state.release.elapsed,
            rollout: self.state.rollout,
            access: self.state.access,
            context: self.context,
        }
    }
}
