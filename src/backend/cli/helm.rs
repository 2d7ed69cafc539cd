// ABOUTME: Release backend over the helm CLI.
// ABOUTME: Runs `upgrade --install --wait` under helm's own timeout plus a process-level bound.

use async_trait::async_trait;
use std::time::Duration;

use super::run_checked;
use crate::backend::{BackendError, ReleaseOps, ReleaseRequest};
use crate::exec::{CommandRunner, CommandSpec};

/// Extra time granted to the helm process beyond its own `--timeout`.
const PROCESS_GRACE: Duration = Duration::from_secs(30);

pub struct Helm<R> {
    runner: R,
}

impl<R: CommandRunner> Helm<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn upgrade_command(request: &ReleaseRequest, timeout: Duration) -> CommandSpec {
        let mut spec = CommandSpec::new("helm")
            .args([
                "upgrade",
                "--install",
                request.release.as_str(),
                request.chart.as_str(),
                "--namespace",
                request.namespace.as_str(),
                "--create-namespace",
                "--wait",
                "--timeout",
            ])
            .arg(format!("{}s", timeout.as_secs()))
            .timeout(timeout + PROCESS_GRACE)
            .show_args(4);

        for (key, value) in &request.values {
            spec = spec.arg("--set-string").arg(format!("{key}={value}"));
        }
        spec
    }
}

#[async_trait]
impl<R: CommandRunner> ReleaseOps for Helm<R> {
    async fn upgrade_or_install(
        &self,
        request: &ReleaseRequest,
        timeout: Duration,
    ) -> Result<(), BackendError> {
        let spec = Self::upgrade_command(request, timeout);
        run_checked(&self.runner, &spec).await?;
        Ok(())
    }

    async fn status(&self, release: &str, namespace: &str) -> Result<String, BackendError> {
        let spec = CommandSpec::new("helm").args(["status", release, "--namespace", namespace]);
        Ok(run_checked(&self.runner, &spec).await?.stdout)
    }
}
