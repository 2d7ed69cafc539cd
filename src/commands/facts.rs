// ABOUTME: Facts command implementation.
// ABOUTME: Reads provisioner outputs and prints the resolved deployment context.

use super::system_backends;
use stevedore::config::Config;
use stevedore::deploy;
use stevedore::diagnostics::Diagnostics;
use stevedore::error::Result;
use stevedore::output::{Output, OutputMode};

pub async fn facts(config: Config, output: Output) -> Result<()> {
    let backends = system_backends(&config);
    let mut diag = Diagnostics::default();

    let context = deploy::resolve_context(&backends, &config, &mut diag).await?;

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    match output.mode() {
        OutputMode::Json => {
            let json = serde_json::to_string(&context)?;
            println!("{json}");
        }
        OutputMode::Normal | OutputMode::Quiet => println!("{}", context.describe()),
    }
    Ok(())
}
