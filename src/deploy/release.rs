// ABOUTME: Runs the release manager's upgrade-or-install once under a fixed timeout.
// ABOUTME: Records elapsed time; failures are returned for diagnosis, never retried.

use std::time::{Duration, Instant};

use crate::backend::{BackendError, ReleaseOps, ReleaseRequest};

/// A completed release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub elapsed: Duration,
}

/// A failed release with the time spent before it failed.
#[derive(Debug)]
pub struct ReleaseFailure {
    pub source: BackendError,
    pub elapsed: Duration,
}

pub async fn execute(
    release: &dyn ReleaseOps,
    request: &ReleaseRequest,
    timeout: Duration,
) -> Result<ReleaseOutcome, ReleaseFailure> {
    tracing::info!(
        release = %request.release,
        chart = %request.chart,
        namespace = %request.namespace,
        timeout_secs = timeout.as_secs(),
        "starting release"
    );
    let started = Instant::now();
    let result = release.upgrade_or_install(request, timeout).await;
    let elapsed = started.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(elapsed_secs = elapsed.as_secs(), "release finished");
            Ok(ReleaseOutcome { elapsed })
        }
        Err(source) => {
            tracing::warn!(
                elapsed_secs = elapsed.as_secs(),
                timed_out = source.is_timeout(),
                "release failed"
            );
            Err(ReleaseFailure { source, elapsed })
        }
    }
}
