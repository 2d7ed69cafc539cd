// ABOUTME: Diagnostics accumulator for non-fatal warnings during a deployment.
// ABOUTME: Collects warnings that shouldn't fail a deployment but should be shown to users.

/// Collects non-fatal warnings during deployment operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether a warning of the given kind was recorded.
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Region resolution fell through to the fixed default.
    pub fn region_fallback(message: impl Into<String>) -> Self {
        Self::new(WarningKind::RegionFallback, message)
    }

    /// Expected image repository does not exist.
    pub fn repository_missing(message: impl Into<String>) -> Self {
        Self::new(WarningKind::RepositoryMissing, message)
    }

    /// Image-pull secret could not be provisioned.
    pub fn pull_secret(message: impl Into<String>) -> Self {
        Self::new(WarningKind::PullSecret, message)
    }

    /// Image presence could not be confirmed in the registry.
    pub fn image_unverified(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ImageUnverified, message)
    }

    /// Forced rollout did not finish or could not be started.
    pub fn rollout(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Rollout, message)
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    RegionFallback,
    RepositoryMissing,
    PullSecret,
    ImageUnverified,
    Rollout,
}
