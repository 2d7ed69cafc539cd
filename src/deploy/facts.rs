// ABOUTME: Reads infrastructure facts from the provisioner and resolves the target region.
// ABOUTME: Checks provisioner preconditions before any output is read; never writes.

use std::fmt;

use serde::Serialize;

use snafu::ResultExt;

use super::error::{BackendSnafu, DeployError};
use crate::backend::{IdentityOps, OutputKey, ProvisionerOps};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};

/// Where the resolved region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    /// The provisioner's `region` output.
    Output,
    /// Parsed from the managed database hostname.
    DatabaseHost,
    /// `region` in the project configuration or `--region`.
    LocalConfig,
    /// The cloud CLI's configured default.
    CliDefault,
    /// Nothing else matched.
    Fallback,
}

impl fmt::Display for RegionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegionSource::Output => "provisioner output",
            RegionSource::DatabaseHost => "database hostname",
            RegionSource::LocalConfig => "local configuration",
            RegionSource::CliDefault => "cloud CLI default",
            RegionSource::Fallback => "built-in default",
        };
        f.write_str(s)
    }
}

/// Everything the provisioner tells us about the target environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facts {
    pub cluster_name: String,
    pub region: String,
    pub region_source: RegionSource,
    pub database_host: String,
    pub database_port: u16,
    pub database_name: String,
    pub database_user: String,
}

/// Extract deployment facts.
///
/// Fails with a precondition error when the provisioner has not been
/// initialized or applied, or when a required output is missing. Region
/// resolution never fails; the last resort is `config.default_region`.
pub async fn extract(
    provisioner: &dyn ProvisionerOps,
    identity: &dyn IdentityOps,
    config: &Config,
    diag: &mut Diagnostics,
) -> Result<Facts, DeployError> {
    check_preconditions(provisioner).await?;

    let cluster_name = required(provisioner, OutputKey::ClusterName).await?;

    let endpoint = match output(provisioner, OutputKey::RdsEndpoint).await? {
        Some(endpoint) => Some(endpoint),
        None => output(provisioner, OutputKey::RdsAddress).await?,
    };
    let (database_host, embedded_port) = match endpoint {
        Some(endpoint) => split_endpoint(&endpoint),
        None => {
            return Err(DeployError::precondition(
                "provisioner output rds_endpoint (or rds_address) is missing",
                "terraform apply",
            ));
        }
    };

    let database_port = match output(provisioner, OutputKey::RdsPort).await? {
        Some(port) => port.trim().parse().map_err(|_| {
            DeployError::precondition(
                format!("provisioner output rds_port is not a port: {port}"),
                "terraform apply",
            )
        })?,
        None => embedded_port.unwrap_or(config.database_port),
    };

    let database_name = required(provisioner, OutputKey::RdsDatabaseName).await?;
    let database_user = required(provisioner, OutputKey::RdsUsername).await?;

    let explicit = output(provisioner, OutputKey::Region).await?;
    let (region, region_source) =
        resolve_region(explicit, &database_host, identity, config, diag).await;

    tracing::debug!(
        cluster = %cluster_name,
        region = %region,
        source = %region_source,
        "resolved deployment facts"
    );

    Ok(Facts {
        cluster_name,
        region,
        region_source,
        database_host,
        database_port,
        database_name,
        database_user,
    })
}

async fn check_preconditions(provisioner: &dyn ProvisionerOps) -> Result<(), DeployError> {
    let initialized = provisioner
        .is_initialized()
        .await
        .context(BackendSnafu {
            action: "inspect the provisioner directory",
        })?;
    if !initialized {
        return Err(DeployError::precondition(
            "the provisioner has not been initialized",
            "terraform init",
        ));
    }

    let resources = provisioner
        .tracked_resources()
        .await
        .context(BackendSnafu {
            action: "list provisioner state",
        })?;
    if resources == 0 {
        return Err(DeployError::precondition(
            "the provisioner state tracks no resources",
            "terraform apply",
        ));
    }
    Ok(())
}

async fn output(
    provisioner: &dyn ProvisionerOps,
    key: OutputKey,
) -> Result<Option<String>, DeployError> {
    let value = provisioner.output(key).await.context(BackendSnafu {
        action: "read provisioner outputs",
    })?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

async fn required(provisioner: &dyn ProvisionerOps, key: OutputKey) -> Result<String, DeployError> {
    output(provisioner, key).await?.ok_or_else(|| {
        DeployError::precondition(
            format!("provisioner output {key} is missing"),
            "terraform apply",
        )
    })
}

async fn resolve_region(
    explicit: Option<String>,
    database_host: &str,
    identity: &dyn IdentityOps,
    config: &Config,
    diag: &mut Diagnostics,
) -> (String, RegionSource) {
    if let Some(region) = explicit {
        return (region, RegionSource::Output);
    }
    if let Some(region) = region_from_database_host(database_host) {
        return (region, RegionSource::DatabaseHost);
    }
    if let Some(region) = config.region.as_ref().filter(|r| !r.trim().is_empty()) {
        return (region.clone(), RegionSource::LocalConfig);
    }
    match identity.configured_region().await {
        Ok(Some(region)) if !region.trim().is_empty() => {
            return (region, RegionSource::CliDefault);
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("could not read the CLI default region: {}", e),
    }

    diag.warn(Warning::region_fallback(format!(
        "no region found in provisioner outputs, database hostname, or local configuration; using {}",
        config.default_region
    )));
    (config.default_region.clone(), RegionSource::Fallback)
}

/// Split `host:port`. The port is only taken when the suffix after the last
/// `:` is numeric.
pub fn split_endpoint(endpoint: &str) -> (String, Option<u16>) {
    let endpoint = endpoint.trim();
    match endpoint.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            match port.parse::<u16>() {
                Ok(port) => (host.to_string(), Some(port)),
                Err(_) => (endpoint.to_string(), None),
            }
        }
        _ => (endpoint.to_string(), None),
    }
}

/// Region embedded in a managed database hostname, e.g.
/// `db.abc123.eu-west-1.rds.amazonaws.com` gives `eu-west-1`.
pub fn region_from_database_host(host: &str) -> Option<String> {
    let host = host.trim().trim_end_matches('.');
    let prefix = host
        .strip_suffix(".rds.amazonaws.com")
        .or_else(|| host.strip_suffix(".rds.amazonaws.com.cn"))?;
    let region = prefix.rsplit('.').next()?;
    looks_like_region(region).then(|| region.to_string())
}

fn looks_like_region(candidate: &str) -> bool {
    let parts: Vec<&str> = candidate.split('-').collect();
    parts.len() >= 3
        && parts[..parts.len() - 1]
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_lowercase()))
        && parts[parts.len() - 1].parse::<u8>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_with_port_is_split() {
        assert_eq!(
            split_endpoint("db.x.us-west-2.rds.amazonaws.com:3307"),
            ("db.x.us-west-2.rds.amazonaws.com".to_string(), Some(3307))
        );
    }

    #[test]
    fn endpoint_without_port_is_kept() {
        assert_eq!(split_endpoint("db.internal"), ("db.internal".to_string(), None));
        assert_eq!(split_endpoint("db.internal:abc"), ("db.internal:abc".to_string(), None));
    }

    #[test]
    fn region_parsed_from_database_host() {
        assert_eq!(
            region_from_database_host("hello.c9akciq32.eu-central-1.rds.amazonaws.com"),
            Some("eu-central-1".to_string())
        );
        assert_eq!(
            region_from_database_host("hello.c9akciq32.cn-north-1.rds.amazonaws.com.cn"),
            Some("cn-north-1".to_string())
        );
        assert_eq!(
            region_from_database_host("hello.c9akciq32.us-gov-west-1.rds.amazonaws.com"),
            Some("us-gov-west-1".to_string())
        );
    }

    #[test]
    fn unrelated_hosts_have_no_region() {
        assert_eq!(region_from_database_host("localhost"), None);
        assert_eq!(region_from_database_host("rds.amazonaws.com"), None);
        assert_eq!(region_from_database_host("db.notaregion.rds.amazonaws.com"), None);
    }
}
