// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use stevedore::output::OutputMode;

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(about = "Deploy the hello-world service to its managed Kubernetes cluster")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputMode::Normal, global = true)]
    pub output: OutputMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a stevedore.yml with the default settings
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Release the service and verify the rollout
    Deploy(DeployArgs),

    /// Show the facts read from the provisioner
    Facts,

    /// Collect a diagnostic report for the release
    Diagnose,
}

#[derive(clap::Args, Debug, Default)]
pub struct DeployArgs {
    /// Namespace to deploy into
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Release name
    #[arg(long)]
    pub release: Option<String>,

    /// Chart reference
    #[arg(long)]
    pub chart: Option<String>,

    /// Full image reference; skips registry discovery
    #[arg(long)]
    pub image: Option<String>,

    /// Image tag ("ask" prompts for it)
    #[arg(long)]
    pub image_tag: Option<String>,

    /// Region to use when the provisioner does not report one
    #[arg(long)]
    pub region: Option<String>,

    /// Environment variable holding the database password
    #[arg(long, value_name = "VAR")]
    pub db_password_env: Option<String>,

    /// Never prompt; take defaults and fail where an answer is required
    #[arg(long, env = "STEVEDORE_NON_INTERACTIVE")]
    pub non_interactive: bool,
}
