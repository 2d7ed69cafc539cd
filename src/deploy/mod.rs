// ABOUTME: Deployment pipeline using the type state pattern.
// ABOUTME: Facts, authentication, secret, image, release, rollout, and failure diagnostics.

pub mod auth;
mod context;
mod deployment;
mod error;
pub mod facts;
pub mod image;
mod pipeline;
pub mod release;
pub mod report;
pub mod rollout;
pub mod secret;
mod state;
mod transitions;

pub use context::DeploymentContext;
pub use deployment::{Deployment, DeploymentSummary};
pub use error::{DeployError, DeployErrorKind};
pub use facts::{Facts, RegionSource};
pub use pipeline::{diagnose, resolve_context, run};
pub use report::{DiagnosticReport, Redactor};
pub use rollout::RolloutOutcome;
pub use state::{Authenticated, Completed, FactsResolved, ImageResolved, Released, SecretReady};
pub use transitions::ReleaseResult;
