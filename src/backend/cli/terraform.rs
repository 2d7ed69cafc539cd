// ABOUTME: Provisioner backend over the terraform CLI.
// ABOUTME: Reads `terraform output -json` once and serves key lookups from it.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::OnceCell;

use super::{parse_json, run_checked};
use crate::backend::{BackendError, OutputKey, ProvisionerOps};
use crate::exec::{CommandRunner, CommandSpec};

pub struct Terraform<R> {
    runner: R,
    dir: PathBuf,
    outputs: OnceCell<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct OutputEntry {
    value: serde_json::Value,
}

impl<R: CommandRunner> Terraform<R> {
    pub fn new(runner: R, dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            dir: dir.into(),
            outputs: OnceCell::new(),
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new("terraform").arg(format!("-chdir={}", self.dir.display()))
    }

    async fn load_outputs(&self) -> Result<HashMap<String, String>, BackendError> {
        let spec = self.command().args(["output", "-json"]);
        let output = run_checked(&self.runner, &spec).await?;
        let raw: HashMap<String, OutputEntry> = parse_json(&spec, &output.stdout)?;

        Ok(raw
            .into_iter()
            .filter_map(|(key, entry)| scalar_to_string(entry.value).map(|v| (key, v)))
            .collect())
    }
}

/// Flatten a scalar output value; structured outputs are not facts we read.
fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl<R: CommandRunner> ProvisionerOps for Terraform<R> {
    async fn is_initialized(&self) -> Result<bool, BackendError> {
        Ok(tokio::fs::metadata(self.dir.join(".terraform"))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn tracked_resources(&self) -> Result<usize, BackendError> {
        let spec = self.command().args(["state", "list"]);
        let output = self.runner.run(&spec).await?;

        if !output.success() {
            if output.stderr.contains("No state file was found") {
                return Ok(0);
            }
            return Err(super::command_failed(&spec, &output));
        }

        Ok(output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count())
    }

    async fn output(&self, key: OutputKey) -> Result<Option<String>, BackendError> {
        let outputs = self
            .outputs
            .get_or_try_init(|| self.load_outputs())
            .await?;

        Ok(outputs
            .get(key.as_str())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}
