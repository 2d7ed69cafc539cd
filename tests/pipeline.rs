// ABOUTME: End-to-end tests of the deployment pipeline against in-memory backends.
// ABOUTME: Covers the happy path, missing infrastructure, failed releases, and operator cancellation.

mod support;

use stevedore::deploy::{self, DeployErrorKind, RolloutOutcome};
use stevedore::diagnostics::{Diagnostics, WarningKind};
use stevedore::error::{EXIT_CANCELLED, EXIT_FAILURE, Error};
use stevedore::output::{Output, OutputMode};
use stevedore::prompt::{Answer, NonInteractive, ScriptedInput};
use stevedore::types::{SecretOutcome, SecretValue};
use support::*;

const PASSWORD: &str = "Sup3rSecret!";

fn quiet() -> Output {
    Output::new(OutputMode::Quiet)
}

fn password() -> Option<SecretValue> {
    Some(SecretValue::new(PASSWORD))
}

mod happy_path {
    use super::*;

    #[tokio::test]
    async fn fresh_environment_deploys_and_waits_for_rollout() {
        init_tracing();
        let world = World::healthy();
        let config = fast_config();
        let input = ScriptedInput::default();
        let mut diag = Diagnostics::default();

        let summary = deploy::run(
            &world.backends(),
            &config,
            password(),
            &input,
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap();

        assert_eq!(summary.secret_outcome, Some(SecretOutcome::Created));
        assert_eq!(summary.rollout, RolloutOutcome::Ready);
        assert_eq!(
            summary.access,
            vec!["Service available at http://a1b2.elb.amazonaws.com:80".to_string()]
        );
        assert!(input.questions().is_empty(), "no prompts expected");

        let stored = world.cluster.secret("hello-world-db", "hello-world").unwrap();
        assert_eq!(stored.values.get("password").map(String::as_str), Some(PASSWORD));
        assert_eq!(
            stored.object.labels.get("app.kubernetes.io/managed-by").map(String::as_str),
            Some("Helm")
        );
        assert_eq!(
            stored.object.annotations.get("meta.helm.sh/release-name").map(String::as_str),
            Some("hello-world")
        );

        assert!(world.log.contains("workloads.restart hello-world"));
        assert!(!world.log.calls().iter().any(|c| c.contains(PASSWORD)));
    }

    #[tokio::test]
    async fn release_receives_complete_parameters() {
        let world = World::healthy();
        let config = fast_config();
        let mut diag = Diagnostics::default();

        deploy::run(
            &world.backends(),
            &config,
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap();

        let requests = world.release.requests.lock();
        assert_eq!(requests.len(), 1);
        let (request, timeout) = &requests[0];
        assert_eq!(*timeout, config.release_timeout);
        assert_eq!(request.release, "hello-world");
        assert_eq!(request.chart, "helm/hello-world");

        let value = |key: &str| {
            request
                .values
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(
            value("image.repository").as_deref(),
            Some("123456789012.dkr.ecr.us-west-2.amazonaws.com/hello-world")
        );
        assert_eq!(value("image.tag").as_deref(), Some("latest"));
        assert_eq!(value("database.host").as_deref(), Some(DB_HOST));
        assert_eq!(value("database.port").as_deref(), Some("3306"));
        assert_eq!(value("database.name").as_deref(), Some("hello_world"));
        assert_eq!(value("database.user").as_deref(), Some("admin"));
        assert_eq!(value("database.existingSecret").as_deref(), Some("hello-world-db"));
        assert_eq!(
            value("imagePullSecrets[0].name").as_deref(),
            Some("ecr-registry-secret")
        );
        assert!(!request.values.iter().any(|(_, v)| v.contains(PASSWORD)));
    }

    #[tokio::test]
    async fn pull_secret_holds_registry_credentials() {
        let world = World::healthy();
        let mut diag = Diagnostics::default();

        deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap();

        let pull = world
            .cluster
            .secret("ecr-registry-secret", "hello-world")
            .unwrap();
        let config: serde_json::Value =
            serde_json::from_str(&pull.values[".dockerconfigjson"]).unwrap();
        let entry = &config["auths"]["123456789012.dkr.ecr.us-west-2.amazonaws.com"];
        assert_eq!(entry["username"], "AWS");
        assert_eq!(entry["password"], "ecr-login-token");
    }

    #[tokio::test]
    async fn rollout_timeout_is_only_a_warning() {
        let world = World::healthy();
        *world.cluster.deployment_polls.lock() =
            std::collections::VecDeque::from([vec![rolling("hello-world")]]);
        let mut diag = Diagnostics::default();

        let summary = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap();

        assert_eq!(summary.rollout, RolloutOutcome::TimedOut);
        assert!(diag.has(WarningKind::Rollout));
    }

    #[tokio::test]
    async fn missing_deployments_are_reported() {
        let world = World::healthy();
        *world.cluster.deployment_polls.lock() = std::collections::VecDeque::from([vec![]]);
        let mut diag = Diagnostics::default();

        let summary = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap();

        assert_eq!(summary.rollout, RolloutOutcome::NothingToRestart);
        assert!(diag.has(WarningKind::Rollout));
        assert_eq!(world.log.count("workloads.restart"), 0);
    }

    #[tokio::test]
    async fn unlistable_deployments_leave_rollout_unverified() {
        let world = World::healthy();
        *world.cluster.deployments_listable.lock() = false;
        let mut diag = Diagnostics::default();

        let summary = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap();

        assert_eq!(summary.rollout, RolloutOutcome::Unverified);
        assert!(diag.has(WarningKind::Rollout));
    }

    #[tokio::test]
    async fn token_failure_is_a_warning() {
        let world = World::healthy();
        *world.registry.token.lock() = None;
        let mut diag = Diagnostics::default();

        let summary = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap();

        assert!(diag.has(WarningKind::PullSecret));
        assert!(summary.context.pull_secret.is_none());
        let requests = world.release.requests.lock();
        assert!(
            !requests[0]
                .0
                .values
                .iter()
                .any(|(k, _)| k == "imagePullSecrets[0].name")
        );
    }
}

mod missing_infrastructure {
    use super::*;

    #[tokio::test]
    async fn empty_state_stops_before_authentication() {
        let world = World::healthy();
        *world.provisioner.resources.lock() = 0;
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Precondition);
        assert!(err.to_string().contains("terraform apply"));
        assert!(!world.log.contains("identity."));
        assert!(!world.log.contains("provisioner.output"));
        assert_eq!(Error::Deploy(err).exit_code(), EXIT_FAILURE);
    }

    #[tokio::test]
    async fn uninitialized_provisioner_asks_for_init() {
        let world = World::healthy();
        *world.provisioner.initialized.lock() = false;
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Precondition);
        assert!(err.to_string().contains("terraform init"));
    }

    #[tokio::test]
    async fn expired_credentials_stop_before_binding() {
        let world = World::healthy();
        *world.identity.account.lock() = None;
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Credential);
        assert!(!world.log.contains("identity.bind"));
    }

    #[tokio::test]
    async fn bind_failure_is_a_context_error() {
        let world = World::healthy();
        *world.identity.bind_fails.lock() = true;
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::ContextBind);
        assert_eq!(world.log.count("identity.bind"), 1);
        assert!(!world.log.contains("workloads.probe"));
    }

    #[tokio::test]
    async fn unreachable_cluster_is_a_connectivity_error() {
        let world = World::healthy();
        *world.cluster.reachable.lock() = false;
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Connectivity);
        assert!(!world.log.contains("secrets."));
    }

    #[tokio::test]
    async fn missing_password_for_new_secret_is_rejected() {
        let world = World::healthy();
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            None,
            &NonInteractive,
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Validation);
        assert!(!world.log.contains("secrets.apply"));
        assert!(!world.log.contains("release."));
    }
}

mod failed_release {
    use super::*;
    use stevedore::backend::EventSummary;
    use stevedore::deploy::report::SectionBody;

    fn failing_world() -> World {
        let world = World::healthy();
        *world.release.behavior.lock() = ReleaseBehavior::TimeOut;
        *world.release.status.lock() = "STATUS: pending-install".to_string();
        world.cluster.events.lock().push(EventSummary {
            last_seen: "2026-10-17T10:00:00Z".to_string(),
            event_type: "Warning".to_string(),
            reason: "Failed".to_string(),
            object: "Pod/hello-world-7d9f-abcde".to_string(),
            message: "ImagePullBackOff for 123456789012.dkr.ecr.us-west-2.amazonaws.com/hello-world"
                .to_string(),
        });
        *world.cluster.logs.lock() =
            format!("connecting with password={PASSWORD}\nconnection refused");
        world
    }

    #[tokio::test]
    async fn timeout_produces_report_and_skips_rollout() {
        init_tracing();
        let world = failing_world();
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Release);
        assert_eq!(world.log.count("release.upgrade"), 1, "never retried");
        assert!(!world.log.contains("workloads.restart"));

        let report = err.report().expect("report attached");
        let status = report.section("Release status").unwrap();
        assert_eq!(
            status.body,
            SectionBody::Content("STATUS: pending-install".to_string())
        );
        assert!(matches!(
            &report.section("Recent events").unwrap().body,
            SectionBody::Content(text) if text.contains("ImagePullBackOff")
        ));
        assert!(report.section("Pod logs (hello-world-7d9f-abcde").is_some());
        assert!(world.log.contains("workloads.logs hello-world-7d9f-abcde 100"));
        assert!(world.log.contains("workloads.events 20"));
    }

    #[tokio::test]
    async fn report_never_contains_sensitive_values() {
        let world = failing_world();
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        let report = err.report().unwrap();
        let rendered = report.render();
        assert!(!rendered.contains(PASSWORD));
        assert!(!rendered.contains(ACCOUNT));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("********9012"));

        let json = serde_json::to_string(report).unwrap();
        assert!(!json.contains(PASSWORD));
    }

    #[tokio::test]
    async fn release_error_masks_account() {
        let world = failing_world();
        *world.release.behavior.lock() = ReleaseBehavior::Fail;
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("UPGRADE FAILED"));
        assert!(message.contains("********9012.dkr.ecr"));
        assert!(!message.contains(ACCOUNT));
    }

    #[tokio::test]
    async fn report_without_pods_marks_sections_unavailable() {
        let world = failing_world();
        world.cluster.pods.lock().clear();
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &fast_config(),
            password(),
            &ScriptedInput::default(),
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        let report = err.report().unwrap();
        assert!(matches!(
            report.section("Pod logs").unwrap().body,
            SectionBody::Unavailable(_)
        ));
        assert!(!world.log.contains("workloads.logs"));
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn declining_missing_tag_never_releases() {
        let world = World::healthy();
        let config = stevedore::config::Config {
            image_tag: "v9".to_string(),
            ..fast_config()
        };
        let input = ScriptedInput::new([Answer::No]);
        let mut diag = Diagnostics::default();

        let err = deploy::run(
            &world.backends(),
            &config,
            password(),
            &input,
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), DeployErrorKind::Cancelled);
        assert!(world.log.contains("registry.list_tags hello-world"));
        assert!(!world.log.contains("release."));
        assert_eq!(Error::Deploy(err).exit_code(), EXIT_CANCELLED);
    }

    #[tokio::test]
    async fn accepting_missing_tag_releases_it() {
        let world = World::healthy();
        let config = stevedore::config::Config {
            image_tag: "v9".to_string(),
            ..fast_config()
        };
        let input = ScriptedInput::new([Answer::Yes]);
        let mut diag = Diagnostics::default();

        deploy::run(
            &world.backends(),
            &config,
            password(),
            &input,
            &quiet(),
            &mut diag,
        )
        .await
        .unwrap();

        let requests = world.release.requests.lock();
        assert!(
            requests[0]
                .0
                .values
                .contains(&("image.tag".to_string(), "v9".to_string()))
        );
    }
}
