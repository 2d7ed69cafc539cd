// ABOUTME: Backend implementations that drive terraform, aws, kubectl, and helm.
// ABOUTME: Every query asks the tool for JSON and decodes it into typed values.

mod aws;
mod helm;
mod kubectl;
mod terraform;

pub use aws::AwsCli;
pub use helm::Helm;
pub use kubectl::Kubectl;
pub use terraform::Terraform;

use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;

use super::{BackendError, Backends};
use crate::exec::{CommandOutput, CommandRunner, CommandSpec};

impl Backends {
    /// Backends over the real command-line tools.
    pub fn from_cli<R>(runner: R, provisioner_dir: impl Into<PathBuf>) -> Self
    where
        R: CommandRunner + Clone + 'static,
    {
        let aws = Arc::new(AwsCli::new(runner.clone()));
        let kubectl = Arc::new(Kubectl::new(runner.clone()));
        Self {
            provisioner: Arc::new(Terraform::new(runner.clone(), provisioner_dir)),
            identity: aws.clone(),
            secrets: kubectl.clone(),
            workloads: kubectl,
            registry: aws,
            release: Arc::new(Helm::new(runner)),
        }
    }
}

/// Run a command and turn a non-zero exit into `CommandFailed`.
async fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    spec: &CommandSpec,
) -> Result<CommandOutput, BackendError> {
    let output = runner.run(spec).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(command_failed(spec, &output))
    }
}

fn command_failed(spec: &CommandSpec, output: &CommandOutput) -> BackendError {
    BackendError::CommandFailed {
        command: spec.display_line(),
        stderr: output.stderr.trim().to_string(),
    }
}

fn parse_json<T: DeserializeOwned>(spec: &CommandSpec, stdout: &str) -> Result<T, BackendError> {
    serde_json::from_str(stdout).map_err(|e| BackendError::Parse {
        command: spec.display_line(),
        reason: e.to_string(),
    })
}
