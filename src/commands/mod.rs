// ABOUTME: Command module aggregator for the stevedore CLI.
// ABOUTME: Deploy, facts, and diagnose handlers plus CLI-over-config overrides.

mod deploy;
mod diagnose;
mod facts;

pub use deploy::deploy;
pub use diagnose::diagnose;
pub use facts::facts;

use crate::cli::DeployArgs;
use stevedore::backend::Backends;
use stevedore::config::Config;
use stevedore::error::{Error, Result};
use stevedore::exec::SystemRunner;
use stevedore::types::{ImageCoordinate, ResourceName};

/// Apply deploy flags on top of the discovered configuration.
pub fn apply_overrides(mut config: Config, args: &DeployArgs) -> Result<Config> {
    if let Some(namespace) = &args.namespace {
        config.namespace = resource_name("namespace", namespace)?;
    }
    if let Some(release) = &args.release {
        config.release = resource_name("release", release)?;
    }
    if let Some(chart) = &args.chart {
        config.chart = chart.clone();
    }
    if let Some(image) = &args.image {
        let image = ImageCoordinate::parse(image)
            .map_err(|e| Error::InvalidConfig(format!("--image: {e}")))?;
        config.image = Some(image);
    }
    if let Some(tag) = &args.image_tag {
        if tag.trim().is_empty() {
            return Err(Error::InvalidConfig("--image-tag cannot be empty".to_string()));
        }
        config.image_tag = tag.clone();
    }
    if let Some(region) = &args.region {
        config.region = Some(region.clone());
    }
    Ok(config)
}

fn resource_name(flag: &str, value: &str) -> Result<ResourceName> {
    ResourceName::new(value).map_err(|e| Error::InvalidConfig(format!("--{flag}: {e}")))
}

/// Backends over the locally installed tools.
fn system_backends(config: &Config) -> Backends {
    Backends::from_cli(SystemRunner, config.provisioner_dir.clone())
}
