// ABOUTME: Diagnose command implementation.
// ABOUTME: Collects the release's diagnostic report without deploying.

use super::system_backends;
use stevedore::config::Config;
use stevedore::deploy;
use stevedore::error::Result;
use stevedore::output::Output;

pub async fn diagnose(config: Config, output: Output) -> Result<()> {
    let backends = system_backends(&config);
    output.progress(&format!(
        "Collecting diagnostics for release {} in {}...",
        config.release, config.namespace
    ));
    let report = deploy::diagnose(&backends, &config).await;
    output.report(&report, false);
    Ok(())
}
