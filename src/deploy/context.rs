// ABOUTME: The single record of resolved deployment facts threaded through the pipeline.
// ABOUTME: release_values() is the only way to build release parameters and rejects gaps.

use serde::Serialize;

use super::error::DeployError;
use super::facts::{Facts, RegionSource};
use crate::backend::ReleaseRequest;
use crate::config::Config;
use crate::types::{ImageCoordinate, SecretReference};

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentContext {
    pub cluster_name: String,
    pub region: String,
    pub region_source: RegionSource,
    pub database_host: String,
    pub database_port: u16,
    pub database_name: String,
    pub database_user: String,
    pub namespace: String,
    pub release_name: String,
    pub chart: String,
    #[serde(serialize_with = "serialize_image")]
    pub image: Option<ImageCoordinate>,
    #[serde(skip)]
    pub secret: Option<SecretReference>,
    pub pull_secret: Option<String>,
}

fn serialize_image<S>(image: &Option<ImageCoordinate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match image {
        Some(image) => serializer.serialize_some(&image.to_string()),
        None => serializer.serialize_none(),
    }
}

impl DeploymentContext {
    pub fn new(facts: Facts, config: &Config) -> Self {
        Self {
            cluster_name: facts.cluster_name,
            region: facts.region,
            region_source: facts.region_source,
            database_host: facts.database_host,
            database_port: facts.database_port,
            database_name: facts.database_name,
            database_user: facts.database_user,
            namespace: config.namespace.to_string(),
            release_name: config.release.to_string(),
            chart: config.chart.clone(),
            image: None,
            secret: None,
            pull_secret: None,
        }
    }

    /// Label selector matching the release's objects.
    pub fn selector(&self) -> String {
        format!("app.kubernetes.io/instance={}", self.release_name)
    }

    /// Ordered release parameters.
    ///
    /// Fails naming the first required field that is missing or empty.
    pub fn release_values(&self) -> Result<Vec<(String, String)>, DeployError> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| missing("image"))?;
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| missing("database secret"))?;

        let required = [
            ("image.repository", image.repository_url()),
            ("image.tag", image.tag().to_string()),
            ("database.host", self.database_host.clone()),
            ("database.port", self.database_port.to_string()),
            ("database.name", self.database_name.clone()),
            ("database.user", self.database_user.clone()),
            ("database.existingSecret", secret.name.to_string()),
        ];

        let mut values = Vec::with_capacity(required.len() + 1);
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(missing(key));
            }
            values.push((key.to_string(), value));
        }
        if self.database_port == 0 {
            return Err(missing("database.port"));
        }

        if let Some(pull_secret) = self.pull_secret.as_ref().filter(|s| !s.is_empty()) {
            values.push(("imagePullSecrets[0].name".to_string(), pull_secret.clone()));
        }
        Ok(values)
    }

    /// Release invocation for the release manager.
    pub fn release_request(&self) -> Result<ReleaseRequest, DeployError> {
        if self.release_name.is_empty() || self.chart.is_empty() || self.namespace.is_empty() {
            return Err(missing("release, chart, or namespace"));
        }
        Ok(ReleaseRequest {
            release: self.release_name.clone(),
            chart: self.chart.clone(),
            namespace: self.namespace.clone(),
            values: self.release_values()?,
        })
    }

    /// Plain-text summary for `stevedore facts`.
    pub fn describe(&self) -> String {
        let mut lines = vec![
            format!("cluster:   {}", self.cluster_name),
            format!("region:    {} (from {})", self.region, self.region_source),
            format!("database:  {}:{}", self.database_host, self.database_port),
            format!("db name:   {}", self.database_name),
            format!("db user:   {}", self.database_user),
            format!("namespace: {}", self.namespace),
            format!("release:   {}", self.release_name),
            format!("chart:     {}", self.chart),
        ];
        if let Some(image) = &self.image {
            lines.push(format!("image:     {image}"));
        }
        lines.join("\n")
    }
}

fn missing(field: &str) -> DeployError {
    DeployError::validation(format!(
        "release parameter {field} is not set; refusing to release with partial values"
    ))
}
