// ABOUTME: Entry point for the stevedore CLI application.
// ABOUTME: Parses arguments, sets up tracing, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use stevedore::config::{self, Config};
use stevedore::error::{Error, Result};
use stevedore::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output);

    let result = tokio::select! {
        result = run(cli.command, output) => result,
        _ = tokio::signal::ctrl_c() => Err(Error::Interrupted),
    };

    if let Err(e) = result {
        let output = Output::new(cli.output);
        output.error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Commands, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;
    match command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Deploy(args) => {
            let config = commands::apply_overrides(Config::discover(&cwd)?, &args)?;
            commands::deploy(config, &args, output).await
        }
        Commands::Facts => {
            let config = Config::discover(&cwd)?;
            commands::facts(config, output).await
        }
        Commands::Diagnose => {
            let config = Config::discover(&cwd)?;
            commands::diagnose(config, output).await
        }
    }
}
