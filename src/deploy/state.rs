// ABOUTME: Deployment state types for the type state pattern.
// ABOUTME: Each state carries what the previous steps established.

use crate::backend::{CallerIdentity, ReleaseRequest};

use super::release::ReleaseOutcome;
use super::rollout::RolloutOutcome;

/// Facts read from the provisioner.
/// Available actions: `authenticate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct FactsResolved;

/// Credentials verified and cluster context bound.
/// Available actions: `prepare_secret()`
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub(crate) identity: CallerIdentity,
}

/// Database secret exists and is owned by the release.
/// Available actions: `resolve_image()`
#[derive(Debug, Clone)]
pub struct SecretReady {
    pub(crate) identity: CallerIdentity,
}

/// Image chosen; the release request is complete.
/// Available actions: `release()`, `diagnose()` after a failed release
#[derive(Debug, Clone)]
pub struct ImageResolved {
    pub(crate) request: ReleaseRequest,
}

/// Release manager reported success.
/// Available actions: `verify_rollout()`
#[derive(Debug, Clone, Copy)]
pub struct Released {
    pub(crate) outcome: ReleaseOutcome,
}

/// Rollout verified (or given up on with a warning).
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) release: ReleaseOutcome,
    pub(crate) rollout: RolloutOutcome,
    pub(crate) access: Vec<String>,
}

impl Authenticated {
    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }
}
