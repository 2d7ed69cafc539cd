// ABOUTME: Identity and registry backend over the aws CLI.
// ABOUTME: STS caller identity, EKS kubeconfig binding, and ECR repository/image queries.

use async_trait::async_trait;
use serde::Deserialize;

use super::{command_failed, parse_json, run_checked};
use crate::backend::{BackendError, CallerIdentity, IdentityOps, RegistryOps};
use crate::exec::{CommandRunner, CommandSpec};
use crate::types::SecretValue;

pub struct AwsCli<R> {
    runner: R,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CallerIdentityResponse {
    account: String,
    arn: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListImagesResponse {
    #[serde(default)]
    image_ids: Vec<ImageId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageId {
    #[serde(default)]
    image_tag: Option<String>,
}

const REPOSITORY_NOT_FOUND: &str = "RepositoryNotFoundException";
const IMAGE_NOT_FOUND: &str = "ImageNotFoundException";

impl<R: CommandRunner> AwsCli<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new("aws")
    }

    /// Run a query where specific error codes mean "does not exist".
    async fn exists(&self, spec: CommandSpec, not_found: &[&str]) -> Result<bool, BackendError> {
        let output = self.runner.run(&spec).await?;
        if output.success() {
            return Ok(true);
        }
        if not_found.iter().any(|code| output.stderr.contains(code)) {
            return Ok(false);
        }
        Err(command_failed(&spec, &output))
    }
}

#[async_trait]
impl<R: CommandRunner> IdentityOps for AwsCli<R> {
    async fn caller_identity(&self) -> Result<CallerIdentity, BackendError> {
        let spec = self
            .command()
            .args(["sts", "get-caller-identity", "--output", "json"]);
        let output = run_checked(&self.runner, &spec).await?;
        let response: CallerIdentityResponse = parse_json(&spec, &output.stdout)?;

        Ok(CallerIdentity {
            account: response.account,
            arn: response.arn,
        })
    }

    async fn configured_region(&self) -> Result<Option<String>, BackendError> {
        let spec = self.command().args(["configure", "get", "region"]);
        let output = self.runner.run(&spec).await?;

        // Exits 1 with empty output when the key is unset
        if !output.success() {
            return Ok(None);
        }
        let region = output.stdout.trim();
        Ok((!region.is_empty()).then(|| region.to_string()))
    }

    async fn bind_cluster_context(&self, region: &str, cluster: &str) -> Result<(), BackendError> {
        let spec = self.command().args([
            "eks",
            "update-kubeconfig",
            "--region",
            region,
            "--name",
            cluster,
        ]);
        run_checked(&self.runner, &spec).await?;
        Ok(())
    }
}

#[async_trait]
impl<R: CommandRunner> RegistryOps for AwsCli<R> {
    async fn repository_exists(
        &self,
        repository: &str,
        region: &str,
    ) -> Result<bool, BackendError> {
        let spec = self.command().args([
            "ecr",
            "describe-repositories",
            "--repository-names",
            repository,
            "--region",
            region,
            "--output",
            "json",
        ]);
        self.exists(spec, &[REPOSITORY_NOT_FOUND]).await
    }

    async fn image_exists(
        &self,
        repository: &str,
        tag: &str,
        region: &str,
    ) -> Result<bool, BackendError> {
        let image_ids = format!("imageTag={tag}");
        let spec = self.command().args([
            "ecr",
            "describe-images",
            "--repository-name",
            repository,
            "--image-ids",
            image_ids.as_str(),
            "--region",
            region,
            "--output",
            "json",
        ]);
        self.exists(spec, &[IMAGE_NOT_FOUND, REPOSITORY_NOT_FOUND])
            .await
    }

    async fn list_tags(&self, repository: &str, region: &str) -> Result<Vec<String>, BackendError> {
        let spec = self.command().args([
            "ecr",
            "list-images",
            "--repository-name",
            repository,
            "--filter",
            "tagStatus=TAGGED",
            "--region",
            region,
            "--output",
            "json",
        ]);
        let output = run_checked(&self.runner, &spec).await?;
        let response: ListImagesResponse = parse_json(&spec, &output.stdout)?;

        let mut tags: Vec<String> = response
            .image_ids
            .into_iter()
            .filter_map(|id| id.image_tag)
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    async fn mint_login_token(&self, region: &str) -> Result<SecretValue, BackendError> {
        let spec = self
            .command()
            .args(["ecr", "get-login-password", "--region", region]);
        let output = run_checked(&self.runner, &spec).await?;

        let token = output.stdout.trim();
        if token.is_empty() {
            return Err(BackendError::Unavailable(
                "registry returned an empty login token".to_string(),
            ));
        }
        Ok(SecretValue::new(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cli::testing::ScriptedRunner;
    use crate::exec::CommandOutput;

    #[tokio::test]
    async fn caller_identity_is_decoded() {
        let runner = ScriptedRunner::new([CommandOutput::ok(
            r#"{"UserId": "AIDA", "Account": "123456789012", "Arn": "arn:aws:iam::123456789012:user/ci"}"#,
        )]);
        let aws = AwsCli::new(runner);
        let identity = aws.caller_identity().await.unwrap();
        assert_eq!(identity.account, "123456789012");
        assert_eq!(identity.masked_account(), "********9012");
    }

    #[tokio::test]
    async fn expired_credentials_are_an_error() {
        let runner = ScriptedRunner::new([CommandOutput::failed(
            255,
            "An error occurred (ExpiredToken) when calling the GetCallerIdentity operation",
        )]);
        let aws = AwsCli::new(runner);
        let err = aws.caller_identity().await.unwrap_err();
        assert!(err.to_string().contains("ExpiredToken"));
    }

    #[tokio::test]
    async fn missing_image_is_not_an_error() {
        let runner = ScriptedRunner::new([CommandOutput::failed(
            254,
            "An error occurred (ImageNotFoundException) when calling the DescribeImages operation",
        )]);
        let aws = AwsCli::new(runner);
        assert!(
            !aws.image_exists("hello-world", "v9", "us-east-1")
                .await
                .unwrap()
        );
        assert_eq!(
            aws.runner.lines()[0],
            "aws ecr describe-images --repository-name hello-world --image-ids imageTag=v9 --region us-east-1 --output json"
        );
    }

    #[tokio::test]
    async fn tags_are_sorted_and_untagged_skipped() {
        let runner = ScriptedRunner::new([CommandOutput::ok(
            r#"{"imageIds": [
                {"imageDigest": "sha256:1", "imageTag": "v2"},
                {"imageDigest": "sha256:2"},
                {"imageDigest": "sha256:3", "imageTag": "latest"},
                {"imageDigest": "sha256:1", "imageTag": "v2"}
            ]}"#,
        )]);
        let aws = AwsCli::new(runner);
        let tags = aws.list_tags("hello-world", "us-east-1").await.unwrap();
        assert_eq!(tags, vec!["latest", "v2"]);
    }

    #[tokio::test]
    async fn unset_region_is_none() {
        let runner = ScriptedRunner::new([CommandOutput::failed(1, "")]);
        let aws = AwsCli::new(runner);
        assert_eq!(aws.configured_region().await.unwrap(), None);
    }
}
