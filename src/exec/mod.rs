// ABOUTME: Subprocess execution for the external tools the pipeline drives.
// ABOUTME: Bounded timeouts, stdin piping for secret payloads, and a swappable runner trait.

mod error;

pub use error::ExecError;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::types::SecretValue;

/// Default upper bound for a single tool invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// A command line to run, with optional stdin payload.
#[derive(Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub current_dir: Option<PathBuf>,
    /// Written to the child's stdin. Never logged.
    pub stdin: Option<SecretValue>,
    pub timeout: Duration,
    /// Arguments shown in messages and logs; the rest are elided.
    pub shown_args: Option<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            current_dir: None,
            stdin: None,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            shown_args: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stdin(mut self, payload: SecretValue) -> Self {
        self.stdin = Some(payload);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Show only the first `count` arguments in messages and logs.
    pub fn show_args(mut self, count: usize) -> Self {
        self.shown_args = Some(count);
        self
    }

    fn visible_args(&self) -> &[String] {
        let shown = self.shown_args.unwrap_or(self.args.len());
        &self.args[..shown.min(self.args.len())]
    }

    /// Program and visible arguments joined for messages.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in self.visible_args() {
            line.push(' ');
            line.push_str(arg);
        }
        if self.visible_args().len() < self.args.len() {
            line.push_str(" ...");
        }
        line
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.visible_args())
            .field("current_dir", &self.current_dir)
            .field("stdin", &self.stdin.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Output from a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (None if killed by a signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs commands. The CLI backends are generic over this so they can be
/// exercised against scripted output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// Runs commands as local child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        tracing::debug!(command = %spec.display_line(), "running command");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        if let (Some(payload), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            stdin
                .write_all(payload.expose().as_bytes())
                .await
                .map_err(|source| ExecError::Io {
                    program: spec.program.clone(),
                    source,
                })?;
            // Close stdin so the child sees EOF
            drop(stdin);
        }

        let output = tokio::time::timeout(spec.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecError::Timeout {
                program: spec.program.clone(),
                timeout: spec.timeout,
            })?
            .map_err(|source| ExecError::Io {
                program: spec.program.clone(),
                source,
            })?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            tracing::debug!(
                program = %spec.program,
                exit_code = ?result.exit_code,
                "command exited unsuccessfully"
            );
        }

        Ok(result)
    }
}
