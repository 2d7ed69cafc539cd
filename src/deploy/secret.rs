// ABOUTME: Reconciles the database credential secret so the release can own it.
// ABOUTME: Pure planning over the observed state, then apply/label/annotate through SecretOps.

use std::collections::BTreeMap;

use snafu::ResultExt;

use super::error::{BackendSnafu, DeployError};
use crate::backend::{SecretManifest, SecretObject, SecretOps};
use crate::types::{ResourceName, SecretOutcome, SecretReference, SecretValue};

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "Helm";
pub const RELEASE_NAME_ANNOTATION: &str = "meta.helm.sh/release-name";
pub const RELEASE_NAMESPACE_ANNOTATION: &str = "meta.helm.sh/release-namespace";

/// Key under which the password is stored in the secret.
pub const PASSWORD_KEY: &str = "password";

/// Observed state of the database secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretState {
    Absent,
    /// Exists without (complete) ownership metadata for this release.
    PresentUnmanaged,
    PresentManaged,
}

/// What reconciliation will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretAction {
    Create,
    /// Replace the stored value and ownership metadata.
    Overwrite,
    /// Keep the value; add missing ownership metadata.
    Adopt,
}

/// Decide the action for an observed state.
pub fn plan(state: SecretState, value_supplied: bool) -> Result<SecretAction, DeployError> {
    match (state, value_supplied) {
        (SecretState::Absent, true) => Ok(SecretAction::Create),
        (SecretState::Absent, false) => Err(DeployError::validation(
            "the database secret does not exist and no password was supplied; \
             pass --db-password-env or enter a password when prompted",
        )),
        (_, true) => Ok(SecretAction::Overwrite),
        (_, false) => Ok(SecretAction::Adopt),
    }
}

/// Classify an existing secret against the ownership metadata for `release`.
pub fn classify(object: Option<&SecretObject>, release: &str, namespace: &str) -> SecretState {
    let Some(object) = object else {
        return SecretState::Absent;
    };
    if missing_ownership(object, release, namespace).is_empty() {
        SecretState::PresentManaged
    } else {
        SecretState::PresentUnmanaged
    }
}

/// Question shown when asking for the password in a given state.
pub fn prompt_for(state: SecretState) -> &'static str {
    match state {
        SecretState::Absent => "Database password (required; stored in a new cluster secret)",
        SecretState::PresentUnmanaged | SecretState::PresentManaged => {
            "Database password (leave empty to keep the existing value)"
        }
    }
}

enum Ownership {
    Label,
    ReleaseName,
    ReleaseNamespace,
}

fn missing_ownership(object: &SecretObject, release: &str, namespace: &str) -> Vec<Ownership> {
    let mut missing = Vec::new();
    if object.labels.get(MANAGED_BY_LABEL).map(String::as_str) != Some(MANAGED_BY_VALUE) {
        missing.push(Ownership::Label);
    }
    if object.annotations.get(RELEASE_NAME_ANNOTATION).map(String::as_str) != Some(release) {
        missing.push(Ownership::ReleaseName);
    }
    if object
        .annotations
        .get(RELEASE_NAMESPACE_ANNOTATION)
        .map(String::as_str)
        != Some(namespace)
    {
        missing.push(Ownership::ReleaseNamespace);
    }
    missing
}

/// Ensure the namespace exists and read the current secret state.
pub async fn inspect(
    secrets: &dyn SecretOps,
    name: &ResourceName,
    namespace: &ResourceName,
    release: &str,
) -> Result<(SecretState, Option<SecretObject>), DeployError> {
    secrets
        .ensure_namespace(namespace.as_str())
        .await
        .context(BackendSnafu {
            action: "ensure the namespace exists",
        })?;

    let object = secrets
        .get_secret(name.as_str(), namespace.as_str())
        .await
        .context(BackendSnafu {
            action: "read the database secret",
        })?;
    let state = classify(object.as_ref(), release, namespace.as_str());
    tracing::debug!(secret = %name, ?state, "inspected database secret");
    Ok((state, object))
}

/// Bring the secret to the managed state.
///
/// Never deletes. Reusing an existing secret leaves its stored value untouched.
pub async fn reconcile(
    secrets: &dyn SecretOps,
    name: &ResourceName,
    namespace: &ResourceName,
    release: &str,
    observed: (SecretState, Option<SecretObject>),
    value: Option<&SecretValue>,
) -> Result<SecretReference, DeployError> {
    let (state, object) = observed;
    let action = plan(state, value.is_some())?;

    let outcome = match (action, value) {
        (SecretAction::Create, Some(value)) | (SecretAction::Overwrite, Some(value)) => {
            let manifest = manifest(name, namespace, release, value);
            secrets.apply_secret(&manifest).await.context(BackendSnafu {
                action: "write the database secret",
            })?;
            if action == SecretAction::Create {
                SecretOutcome::Created
            } else {
                SecretOutcome::Updated
            }
        }
        _ => {
            let missing = object
                .as_ref()
                .map(|o| missing_ownership(o, release, namespace.as_str()))
                .unwrap_or_default();
            for item in &missing {
                adopt(secrets, name, namespace, release, item).await?;
            }
            if !missing.is_empty() {
                tracing::info!(secret = %name, added = missing.len(), "adopted existing secret");
            }
            SecretOutcome::Reused
        }
    };

    tracing::info!(secret = %name, %outcome, "database secret ready");
    Ok(SecretReference {
        name: name.clone(),
        namespace: namespace.clone(),
        managed_by_release: true,
        outcome,
    })
}

async fn adopt(
    secrets: &dyn SecretOps,
    name: &ResourceName,
    namespace: &ResourceName,
    release: &str,
    item: &Ownership,
) -> Result<(), DeployError> {
    let result = match item {
        Ownership::Label => {
            secrets
                .label_secret(
                    name.as_str(),
                    namespace.as_str(),
                    MANAGED_BY_LABEL,
                    MANAGED_BY_VALUE,
                )
                .await
        }
        Ownership::ReleaseName => {
            secrets
                .annotate_secret(
                    name.as_str(),
                    namespace.as_str(),
                    RELEASE_NAME_ANNOTATION,
                    release,
                )
                .await
        }
        Ownership::ReleaseNamespace => {
            secrets
                .annotate_secret(
                    name.as_str(),
                    namespace.as_str(),
                    RELEASE_NAMESPACE_ANNOTATION,
                    namespace.as_str(),
                )
                .await
        }
    };
    result.context(BackendSnafu {
        action: "mark the database secret as owned by the release",
    })
}

/// Ownership label and annotations for an object the release will adopt.
pub fn ownership_metadata(
    release: &str,
    namespace: &str,
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let labels = BTreeMap::from([(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string())]);
    let annotations = BTreeMap::from([
        (RELEASE_NAME_ANNOTATION.to_string(), release.to_string()),
        (RELEASE_NAMESPACE_ANNOTATION.to_string(), namespace.to_string()),
    ]);
    (labels, annotations)
}

fn manifest(
    name: &ResourceName,
    namespace: &ResourceName,
    release: &str,
    value: &SecretValue,
) -> SecretManifest {
    let (labels, annotations) = ownership_metadata(release, namespace.as_str());
    SecretManifest {
        name: name.to_string(),
        namespace: namespace.to_string(),
        secret_type: "Opaque".to_string(),
        labels,
        annotations,
        data: BTreeMap::from([(PASSWORD_KEY.to_string(), value.clone())]),
    }
}
