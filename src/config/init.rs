// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a commented stevedore.yml listing every setting and its default.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

/// Write the template to `dir` and return its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, generate_template_yaml(&Config::default()))?;
    Ok(config_path)
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"# Directory containing the provisioner's working state
provisioner_dir: {}

# Release settings
chart: {}
release: {}
namespace: {}

# Database credential secret and image-pull secret
secret_name: {}
pull_secret_name: {}

# Image: repository inside the account's registry, or a full coordinate
repository: {}
# image: registry.example.com/hello-world:v1
# Use "{}" to be asked for the tag on every deploy
image_tag: {}

# Region fallback when the provisioner does not report one
# region: eu-west-1
default_region: {}

database_port: {}

release_timeout: {}s
rollout_timeout: {}s
poll_interval: {}s
"#,
        config.provisioner_dir.display(),
        config.chart,
        config.release,
        config.namespace,
        config.secret_name,
        config.pull_secret_name,
        config.repository,
        super::TAG_PLACEHOLDER,
        config.image_tag,
        config.default_region,
        config.database_port,
        config.release_timeout.as_secs(),
        config.rollout_timeout.as_secs(),
        config.poll_interval.as_secs(),
    )
}
