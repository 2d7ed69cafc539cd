// ABOUTME: Resolves the image coordinate to release and provisions registry pull access.
// ABOUTME: Confirms with the operator when the image cannot be found or verified.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::error::DeployError;
use super::secret::ownership_metadata;
use crate::backend::{CallerIdentity, RegistryOps, SecretManifest, SecretOps};
use crate::config::{Config, TAG_PLACEHOLDER};
use crate::diagnostics::{Diagnostics, Warning};
use crate::output::Output;
use crate::prompt::OperatorInput;
use crate::types::{DEFAULT_TAG, ImageCoordinate, SecretValue};

/// Secret type the kubelet reads registry credentials from.
const DOCKER_CONFIG_TYPE: &str = "kubernetes.io/dockerconfigjson";
const DOCKER_CONFIG_KEY: &str = ".dockerconfigjson";
const ECR_USERNAME: &str = "AWS";

/// Where image resolution is allowed to ask and report.
pub struct Interaction<'a> {
    pub input: &'a dyn OperatorInput,
    pub output: &'a Output,
    pub diag: &'a mut Diagnostics,
}

/// Outcome of image resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub image: ImageCoordinate,
    /// Name of the image-pull secret, when one is in place.
    pub pull_secret: Option<String>,
}

/// Inputs that shape the coordinate.
#[derive(Debug, Clone)]
pub struct ImageTarget<'a> {
    pub account: Option<&'a str>,
    pub region: &'a str,
    pub namespace: &'a str,
    pub release: &'a str,
}

impl<'a> ImageTarget<'a> {
    pub fn new(
        identity: Option<&'a CallerIdentity>,
        region: &'a str,
        namespace: &'a str,
        release: &'a str,
    ) -> Self {
        Self {
            account: identity.map(|i| i.account.as_str()),
            region,
            namespace,
            release,
        }
    }
}

pub async fn resolve(
    registry: &dyn RegistryOps,
    secrets: &dyn SecretOps,
    config: &Config,
    target: &ImageTarget<'_>,
    io: &mut Interaction<'_>,
) -> Result<ResolvedImage, DeployError> {
    let image = match &config.image {
        Some(image) => image.clone(),
        None => derive(registry, config, target, io).await?,
    };
    tracing::info!(image = %image, "resolved image");

    let pull_secret = match image.ecr_region() {
        Some(region) => {
            ensure_pull_secret(registry, secrets, config, &image, region, target, io).await
        }
        None => None,
    };

    verify(registry, &image, io).await?;

    Ok(ResolvedImage { image, pull_secret })
}

async fn derive(
    registry: &dyn RegistryOps,
    config: &Config,
    target: &ImageTarget<'_>,
    io: &mut Interaction<'_>,
) -> Result<ImageCoordinate, DeployError> {
    let account = target.account.filter(|a| !a.is_empty());
    let region = Some(target.region).filter(|r| !r.is_empty());

    let (Some(account), Some(region)) = (account, region) else {
        return ask_full_coordinate(io);
    };

    let mut repository = config.repository.clone();
    match registry.repository_exists(&repository, region).await {
        Ok(true) => {}
        Ok(false) => {
            let message = format!(
                "repository {repository} does not exist in {region}; create it with \
                 `aws ecr create-repository --repository-name {repository} --region {region}`"
            );
            io.output.warning(&message);
            io.diag.warn(Warning::repository_missing(message));
            if let Some(alternate) = io.input.ask("Repository to deploy from", Some(&repository)) {
                repository = alternate;
            }
        }
        Err(e) => {
            tracing::debug!("repository lookup failed: {}", e);
            io.diag.warn(Warning::image_unverified(format!(
                "could not check repository {repository}: {e}"
            )));
        }
    }

    let tag = resolve_tag(config, io.input);
    ImageCoordinate::ecr(account, region, &repository, &tag)
        .map_err(|e| DeployError::validation(format!("invalid image coordinate: {e}")))
}

fn ask_full_coordinate(io: &mut Interaction<'_>) -> Result<ImageCoordinate, DeployError> {
    let answer = io
        .input
        .ask("Full image reference (registry/repository:tag)", None)
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| DeployError::Discovery {
            message: "registry account or region unknown and no image reference given".to_string(),
        })?;
    ImageCoordinate::parse(&answer).map_err(|e| DeployError::Discovery {
        message: format!("image reference {answer} is not usable: {e}"),
    })
}

/// Configured tag, or the operator's answer when the placeholder is set.
pub fn resolve_tag(config: &Config, input: &dyn OperatorInput) -> String {
    if config.image_tag == TAG_PLACEHOLDER {
        input
            .ask("Image tag", Some(DEFAULT_TAG))
            .unwrap_or_else(|| DEFAULT_TAG.to_string())
    } else {
        config.image_tag.clone()
    }
}

async fn ensure_pull_secret(
    registry: &dyn RegistryOps,
    secrets: &dyn SecretOps,
    config: &Config,
    image: &ImageCoordinate,
    region: &str,
    target: &ImageTarget<'_>,
    io: &mut Interaction<'_>,
) -> Option<String> {
    let name = config.pull_secret_name.as_str();

    match secrets.get_secret(name, target.namespace).await {
        Ok(Some(_)) => {
            tracing::debug!(secret = name, "image-pull secret already present");
            return Some(name.to_string());
        }
        Ok(None) => {}
        Err(e) => {
            io.diag.warn(Warning::pull_secret(format!(
                "could not read image-pull secret {name}: {e}"
            )));
            return None;
        }
    }

    let token = match registry.mint_login_token(region).await {
        Ok(token) => token,
        Err(e) => {
            io.diag.warn(Warning::pull_secret(format!(
                "could not obtain a registry login token; pods may fail to pull the image: {e}"
            )));
            return None;
        }
    };

    let (labels, annotations) = ownership_metadata(target.release, target.namespace);
    let manifest = SecretManifest {
        name: name.to_string(),
        namespace: target.namespace.to_string(),
        secret_type: DOCKER_CONFIG_TYPE.to_string(),
        labels,
        annotations,
        data: BTreeMap::from([(
            DOCKER_CONFIG_KEY.to_string(),
            docker_config(image.registry_host(), &token),
        )]),
    };

    match secrets.apply_secret(&manifest).await {
        Ok(()) => {
            tracing::info!(secret = name, "created image-pull secret");
            Some(name.to_string())
        }
        Err(e) => {
            io.diag.warn(Warning::pull_secret(format!(
                "could not create image-pull secret {name}: {e}"
            )));
            None
        }
    }
}

/// Registry credentials in the format the kubelet expects.
pub fn docker_config(registry_host: &str, token: &SecretValue) -> SecretValue {
    let auth = BASE64.encode(format!("{ECR_USERNAME}:{}", token.expose()));
    let config = serde_json::json!({
        "auths": {
            registry_host: {
                "username": ECR_USERNAME,
                "password": token.expose(),
                "auth": auth,
            }
        }
    });
    SecretValue::new(config.to_string())
}

async fn verify(
    registry: &dyn RegistryOps,
    image: &ImageCoordinate,
    io: &mut Interaction<'_>,
) -> Result<(), DeployError> {
    let Some(region) = image.ecr_region() else {
        let message = format!("cannot verify {image} in a non-ECR registry");
        io.diag.warn(Warning::image_unverified(message));
        return confirm_or_cancel(io, &format!("Deploy {image} without verifying it?"), true);
    };

    match registry
        .image_exists(image.repository(), image.tag(), region)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => {
            let tags = registry
                .list_tags(image.repository(), region)
                .await
                .unwrap_or_default();
            let listing = if tags.is_empty() {
                "  (no tagged images)".to_string()
            } else {
                tags.iter()
                    .map(|t| format!("  {t}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            io.output.block(
                &format!("Tag {} not found in {}. Available tags:", image.tag(), image.repository()),
                &listing,
            );
            confirm_or_cancel(io, &format!("Deploy {image} anyway?"), false)
        }
        Err(e) => {
            io.diag.warn(Warning::image_unverified(format!(
                "could not verify {image}: {e}"
            )));
            confirm_or_cancel(io, &format!("Deploy {image} without verifying it?"), true)
        }
    }
}

fn confirm_or_cancel(
    io: &mut Interaction<'_>,
    question: &str,
    default: bool,
) -> Result<(), DeployError> {
    if io.input.confirm(question, default) {
        Ok(())
    } else {
        Err(DeployError::Cancelled {
            reason: "operator declined to deploy an unverified image".to_string(),
        })
    }
}
