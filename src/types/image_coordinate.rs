// ABOUTME: Fully-qualified container image coordinates (registry, repository, tag).
// ABOUTME: Parses operator input and recognizes ECR registry hosts.

use std::fmt;
use thiserror::Error;

/// Tag used when none is given.
pub const DEFAULT_TAG: &str = "latest";

/// Registry assumed for references without an explicit host.
const DEFAULT_REGISTRY: &str = "docker.io";

const ECR_MARKER: &str = ".dkr.ecr.";
const ECR_SUFFIX: &str = ".amazonaws.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// A `(registry_host, repository, tag)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCoordinate {
    registry_host: String,
    repository: String,
    tag: String,
}

impl ImageCoordinate {
    pub fn new(
        registry_host: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self, ParseImageError> {
        let registry_host = registry_host.into();
        let repository = repository.into();
        let tag = tag.into();

        if registry_host.is_empty() || repository.is_empty() {
            return Err(ParseImageError::Empty);
        }
        if tag.is_empty() || tag.contains('/') || tag.contains(':') {
            return Err(ParseImageError::InvalidFormat(tag));
        }

        Ok(Self {
            registry_host,
            repository,
            tag,
        })
    }

    /// Coordinate in the private ECR registry of `account` in `region`.
    pub fn ecr(
        account: &str,
        region: &str,
        repository: &str,
        tag: &str,
    ) -> Result<Self, ParseImageError> {
        Self::new(ecr_registry_host(account, region), repository, tag)
    }

    /// Parse `[registry/]repository[:tag]`.
    pub fn parse(input: &str) -> Result<Self, ParseImageError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageError::Empty);
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_') {
                return Err(ParseImageError::InvalidChar(c));
            }
        }

        // A colon followed by a slash belongs to a registry port, not a tag
        let (without_tag, tag) = match input.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, after),
            _ => (input, DEFAULT_TAG),
        };

        let (registry, repository) = match without_tag.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (first, rest)
            }
            _ => (DEFAULT_REGISTRY, without_tag),
        };

        if repository.is_empty() || repository.starts_with('/') || repository.ends_with('/') {
            return Err(ParseImageError::InvalidFormat(input.to_string()));
        }

        Self::new(registry, repository, tag)
    }

    pub fn registry_host(&self) -> &str {
        &self.registry_host
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `registry/repository` without the tag, as charts expect it.
    pub fn repository_url(&self) -> String {
        format!("{}/{}", self.registry_host, self.repository)
    }

    /// Whether pulls from this registry need a login token.
    pub fn is_ecr(&self) -> bool {
        self.ecr_region().is_some()
    }

    /// Region encoded in an ECR registry host.
    pub fn ecr_region(&self) -> Option<&str> {
        let host = self.registry_host.strip_suffix(ECR_SUFFIX)?;
        let (_, region) = host.split_once(ECR_MARKER)?;
        (!region.is_empty() && !region.contains('.')).then_some(region)
    }
}

impl fmt::Display for ImageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry_host, self.repository, self.tag)
    }
}

/// Registry host for an account's private ECR registry.
pub fn ecr_registry_host(account: &str, region: &str) -> String {
    format!("{account}{ECR_MARKER}{region}{ECR_SUFFIX}")
}
