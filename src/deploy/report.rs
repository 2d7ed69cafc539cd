// ABOUTME: Collects a best-effort diagnostic bundle after a failed release.
// ABOUTME: Sections are independent; known sensitive strings are redacted from all of them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

use crate::backend::{BackendError, EventSummary, PodSummary, ReleaseOps, WorkloadOps, mask};
use crate::types::SecretValue;

/// Number of recent namespace events included.
pub const EVENT_LIMIT: usize = 20;
/// Log lines included from the first pod.
pub const LOG_TAIL: u32 = 100;

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub generated_at: DateTime<Utc>,
    pub release: String,
    pub namespace: String,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub title: String,
    #[serde(flatten)]
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SectionBody {
    Content(String),
    /// Why the section could not be gathered.
    Unavailable(String),
}

impl DiagnosticReport {
    pub fn section(&self, title_prefix: &str) -> Option<&ReportSection> {
        self.sections
            .iter()
            .find(|s| s.title.starts_with(title_prefix))
    }

    /// Human-readable rendering, one block per section.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Diagnostic report for release {} in namespace {} ({})",
            self.release,
            self.namespace,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for section in &self.sections {
            let _ = writeln!(out, "\n=== {} ===", section.title);
            match &section.body {
                SectionBody::Content(text) if text.trim().is_empty() => {
                    let _ = writeln!(out, "(empty)");
                }
                SectionBody::Content(text) => {
                    let _ = writeln!(out, "{}", text.trim_end());
                }
                SectionBody::Unavailable(reason) => {
                    let _ = writeln!(out, "(unavailable: {reason})");
                }
            }
        }
        out
    }
}

/// Replaces sensitive strings before anything leaves the process.
#[derive(Debug, Default, Clone)]
pub struct Redactor {
    secrets: Vec<SecretValue>,
    accounts: Vec<String>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secret(mut self, value: &SecretValue) -> Self {
        if !value.is_empty() {
            self.secrets.push(value.clone());
        }
        self
    }

    /// Account identifiers are replaced by their masked form.
    pub fn account(mut self, account: &str) -> Self {
        if !account.is_empty() {
            self.accounts.push(account.to_string());
        }
        self
    }

    pub fn apply(&self, text: &str) -> String {
        let mut text = text.to_string();
        for secret in &self.secrets {
            text = text.replace(secret.expose(), REDACTED);
        }
        for account in &self.accounts {
            text = text.replace(account.as_str(), &mask(account));
        }
        text
    }
}

/// Gather the report. Never fails; each section records its own problem.
pub async fn collect(
    workloads: &dyn WorkloadOps,
    release_ops: &dyn ReleaseOps,
    release: &str,
    namespace: &str,
    selector: &str,
    redactor: &Redactor,
) -> DiagnosticReport {
    let mut sections = Vec::new();
    let mut push = |title: String, result: Result<String, String>| {
        let body = match result {
            Ok(text) => SectionBody::Content(redactor.apply(&text)),
            Err(reason) => SectionBody::Unavailable(redactor.apply(&reason)),
        };
        sections.push(ReportSection { title, body });
    };

    push(
        "Release status".to_string(),
        release_ops
            .status(release, namespace)
            .await
            .map_err(describe_error),
    );

    let pods = workloads.pods(selector, namespace).await;
    let first_pod = pods
        .as_ref()
        .ok()
        .and_then(|pods| pods.first())
        .map(|p| p.name.clone());
    push(
        "Pods".to_string(),
        pods.as_deref()
            .map(render_pods)
            .map_err(describe_error_ref),
    );

    push(
        "Recent events".to_string(),
        workloads
            .events(namespace, EVENT_LIMIT)
            .await
            .map(|events| render_events(&events))
            .map_err(describe_error),
    );

    match first_pod {
        Some(pod) => {
            push(
                format!("Pod description ({pod})"),
                workloads
                    .describe_pod(&pod, namespace)
                    .await
                    .map_err(describe_error),
            );
            push(
                format!("Pod logs ({pod}, last {LOG_TAIL} lines)"),
                workloads
                    .pod_logs(&pod, namespace, LOG_TAIL)
                    .await
                    .map_err(describe_error),
            );
        }
        None => {
            let reason = format!("no pods match {selector}");
            push("Pod description".to_string(), Err(reason.clone()));
            push("Pod logs".to_string(), Err(reason));
        }
    }

    DiagnosticReport {
        generated_at: Utc::now(),
        release: release.to_string(),
        namespace: namespace.to_string(),
        sections,
    }
}

fn describe_error(e: BackendError) -> String {
    describe_error_ref(&e)
}

fn describe_error_ref(e: &BackendError) -> String {
    if e.is_timeout() {
        format!("query timed out: {e}")
    } else {
        e.to_string()
    }
}

fn render_pods(pods: &[PodSummary]) -> String {
    if pods.is_empty() {
        return "no pods".to_string();
    }
    let mut out = format!("{:<50} {:<10} {:<7} {}\n", "NAME", "PHASE", "READY", "RESTARTS");
    for pod in pods {
        let _ = writeln!(
            out,
            "{:<50} {:<10} {:<7} {}",
            pod.name,
            pod.phase,
            format!("{}/{}", pod.ready_containers, pod.total_containers),
            pod.restarts
        );
    }
    out
}

fn render_events(events: &[EventSummary]) -> String {
    if events.is_empty() {
        return "no events".to_string();
    }
    let mut out = String::new();
    for event in events {
        let _ = writeln!(
            out,
            "{} {} {} {}: {}",
            event.last_seen, event.event_type, event.reason, event.object, event.message
        );
    }
    out
}
