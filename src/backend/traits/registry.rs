// ABOUTME: Container registry interface.
// ABOUTME: Repository and tag existence checks, tag listing, and login token minting.

use crate::backend::BackendError;
use crate::types::SecretValue;
use async_trait::async_trait;

#[async_trait]
pub trait RegistryOps: Send + Sync {
    async fn repository_exists(&self, repository: &str, region: &str)
    -> Result<bool, BackendError>;

    async fn image_exists(
        &self,
        repository: &str,
        tag: &str,
        region: &str,
    ) -> Result<bool, BackendError>;

    /// Tags present in the repository, sorted.
    async fn list_tags(&self, repository: &str, region: &str) -> Result<Vec<String>, BackendError>;

    /// Short-lived registry password for image pulls.
    async fn mint_login_token(&self, region: &str) -> Result<SecretValue, BackendError>;
}
