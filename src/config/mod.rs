// ABOUTME: Project configuration from stevedore.yml.
// ABOUTME: Every field is optional; defaults describe the stock hello-world deployment.

mod init;

pub use init::init_config;

use crate::error::{Error, Result};
use crate::types::{ImageCoordinate, ResourceName};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "stevedore.yml";
pub const CONFIG_FILENAME_ALT: &str = "stevedore.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".stevedore/config.yml";

/// Tag value that asks the operator instead of using a fixed tag.
pub const TAG_PLACEHOLDER: &str = "ask";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the provisioner's working state.
    #[serde(default = "default_provisioner_dir")]
    pub provisioner_dir: PathBuf,

    /// Chart reference passed to the release manager.
    #[serde(default = "default_chart")]
    pub chart: String,

    #[serde(
        default = "default_release",
        deserialize_with = "deserialize_resource_name"
    )]
    pub release: ResourceName,

    #[serde(
        default = "default_namespace",
        deserialize_with = "deserialize_resource_name"
    )]
    pub namespace: ResourceName,

    /// Database credential secret handed to the release.
    #[serde(
        default = "default_secret_name",
        deserialize_with = "deserialize_resource_name"
    )]
    pub secret_name: ResourceName,

    /// Image-pull secret for authenticated registries.
    #[serde(
        default = "default_pull_secret_name",
        deserialize_with = "deserialize_resource_name"
    )]
    pub pull_secret_name: ResourceName,

    /// Repository name inside the derived registry.
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Full image coordinate; skips registry derivation when set.
    #[serde(default, deserialize_with = "deserialize_image")]
    pub image: Option<ImageCoordinate>,

    #[serde(default = "default_image_tag")]
    pub image_tag: String,

    /// Region used when the provisioner does not report one.
    #[serde(default)]
    pub region: Option<String>,

    /// Last-resort region.
    #[serde(default = "default_region")]
    pub default_region: String,

    #[serde(default = "default_database_port")]
    pub database_port: u16,

    #[serde(default = "default_release_timeout", with = "humantime_serde")]
    pub release_timeout: Duration,

    #[serde(default = "default_rollout_timeout", with = "humantime_serde")]
    pub rollout_timeout: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

fn default_provisioner_dir() -> PathBuf {
    PathBuf::from("terraform")
}

fn default_chart() -> String {
    "helm/hello-world".to_string()
}

fn well_known_name(name: &str) -> ResourceName {
    ResourceName::new(name).expect("built-in resource names are valid")
}

fn default_release() -> ResourceName {
    well_known_name("hello-world")
}

fn default_namespace() -> ResourceName {
    well_known_name("hello-world")
}

fn default_secret_name() -> ResourceName {
    well_known_name("hello-world-db")
}

fn default_pull_secret_name() -> ResourceName {
    well_known_name("ecr-registry-secret")
}

fn default_repository() -> String {
    "hello-world".to_string()
}

fn default_image_tag() -> String {
    crate::types::DEFAULT_TAG.to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_database_port() -> u16 {
    3306
}

fn default_release_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_rollout_timeout() -> Duration {
    Duration::from_secs(180)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provisioner_dir: default_provisioner_dir(),
            chart: default_chart(),
            release: default_release(),
            namespace: default_namespace(),
            secret_name: default_secret_name(),
            pull_secret_name: default_pull_secret_name(),
            repository: default_repository(),
            image: None,
            image_tag: default_image_tag(),
            region: None,
            default_region: default_region(),
            database_port: default_database_port(),
            release_timeout: default_release_timeout(),
            rollout_timeout: default_rollout_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first config file found in `dir`, or defaults if there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("loading configuration from {}", path.display());
                let mut config = Self::load(path)?;
                if config.provisioner_dir.is_relative() {
                    config.provisioner_dir = dir.join(&config.provisioner_dir);
                }
                return Ok(config);
            }
        }

        tracing::debug!("no configuration file in {}, using defaults", dir.display());
        let mut config = Self::default();
        config.provisioner_dir = dir.join(&config.provisioner_dir);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.chart.trim().is_empty() {
            return Err(Error::InvalidConfig("chart cannot be empty".to_string()));
        }
        if self.repository.trim().is_empty() {
            return Err(Error::InvalidConfig("repository cannot be empty".to_string()));
        }
        if self.image_tag.trim().is_empty() {
            return Err(Error::InvalidConfig("image_tag cannot be empty".to_string()));
        }
        for (name, value) in [
            ("release_timeout", self.release_timeout),
            ("rollout_timeout", self.rollout_timeout),
            ("poll_interval", self.poll_interval),
        ] {
            if value.is_zero() {
                return Err(Error::InvalidConfig(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }

    /// Label selector matching every object the release owns.
    pub fn release_selector(&self) -> String {
        format!("app.kubernetes.io/instance={}", self.release)
    }

    /// Whether the configured tag asks the operator.
    pub fn tag_is_placeholder(&self) -> bool {
        self.image_tag == TAG_PLACEHOLDER
    }
}

// Custom deserializers

fn deserialize_resource_name<'de, D>(deserializer: D) -> std::result::Result<ResourceName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ResourceName::new(&s).map_err(serde::de::Error::custom)
}

fn deserialize_image<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<ImageCoordinate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    s.map(|s| ImageCoordinate::parse(&s).map_err(serde::de::Error::custom))
        .transpose()
}
