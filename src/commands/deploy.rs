// ABOUTME: Deploy command implementation.
// ABOUTME: Runs the pipeline, prints the diagnostic report on failure, then warnings and access hints.

use super::system_backends;
use crate::cli::DeployArgs;
use stevedore::config::Config;
use stevedore::deploy::{self, RolloutOutcome};
use stevedore::diagnostics::Diagnostics;
use stevedore::error::{Error, Result};
use stevedore::output::Output;
use stevedore::prompt::{NonInteractive, OperatorInput, TerminalInput};
use stevedore::types::SecretValue;

pub async fn deploy(config: Config, args: &DeployArgs, mut output: Output) -> Result<()> {
    output.start_timer();
    let backends = system_backends(&config);
    let mut diag = Diagnostics::default();

    let supplied = password_from_env(args.db_password_env.as_deref())?;
    let input: Box<dyn OperatorInput> = if args.non_interactive {
        Box::new(NonInteractive)
    } else {
        Box::new(TerminalInput)
    };

    output.progress(&format!(
        "Deploying release {} to namespace {}",
        config.release, config.namespace
    ));

    let result = deploy::run(
        &backends,
        &config,
        supplied,
        input.as_ref(),
        &output,
        &mut diag,
    )
    .await;

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(report) = e.report() {
                output.report(report, true);
            }
            return Err(Error::Deploy(e));
        }
    };

    if summary.rollout == RolloutOutcome::TimedOut {
        output.progress("Rollout still in progress; the release itself succeeded.");
    }
    for line in &summary.access {
        output.progress(line);
    }
    output.success(&format!(
        "Deployed {} (release took {}s)",
        summary
            .context
            .image
            .as_ref()
            .map(|i| i.repository().to_string())
            .unwrap_or_else(|| summary.context.release_name.clone()),
        summary.release_elapsed.as_secs()
    ));
    Ok(())
}

fn password_from_env(var: Option<&str>) -> Result<Option<SecretValue>> {
    let Some(var) = var else {
        return Ok(None);
    };
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(Some(SecretValue::new(value))),
        Ok(_) => Ok(None),
        Err(_) => Err(Error::InvalidConfig(format!(
            "environment variable {var} is not set"
        ))),
    }
}
