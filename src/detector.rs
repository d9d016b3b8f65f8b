//! Language detection strategies.
//!
//! Two interchangeable [`LanguageDetector`]s: [`PlatformDetector`] delegates to
//! the host detection capability, [`HeuristicDetector`] runs the built-in
//! classifier. The orchestrator picks the platform one when the prober says it
//! is usable and drops back to the heuristic one on any failure.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::capability::{
    CapabilityError, CapabilityStatus, DetectionCapability, DownloadMonitor, PlatformDetection,
};
use crate::i18n::{DetectionCandidate, DetectionMethod, HeuristicClassifier, LanguageRegistry};
use crate::progress::{self, ProgressSink};

const DETECTION_SUBJECT: &str = "language detection";

/// Tuning for multi-candidate detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
    /// Maximum number of candidates returned
    pub max_results: usize,
    /// Heuristic candidates below `min(confidence_threshold, 0.2)` are dropped
    pub confidence_threshold: f64,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            max_results: 3,
            confidence_threshold: 0.3,
        }
    }
}

impl DetectOptions {
    pub(crate) fn heuristic_floor(&self) -> f64 {
        self.confidence_threshold.min(0.2)
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("platform language detection failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("platform language detector returned no candidates")]
    NoCandidates,
}

#[async_trait]
pub trait LanguageDetector: Send + Sync {
    fn method(&self) -> DetectionMethod;

    /// Ranked candidates, best first, without duplicate codes.
    async fn detect(
        &self,
        text: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<Vec<DetectionCandidate>, DetectionError>;
}

/// Detection through the host capability.
pub struct PlatformDetector {
    capability: Arc<dyn DetectionCapability>,
    status: CapabilityStatus,
    registry: Arc<LanguageRegistry>,
}

impl PlatformDetector {
    /// `status` is the probe result; `Downloadable` turns on progress reporting.
    /// Codes present in `registry` rank ahead of codes that are not.
    pub fn new(
        capability: Arc<dyn DetectionCapability>,
        status: CapabilityStatus,
        registry: Arc<LanguageRegistry>,
    ) -> Self {
        Self {
            capability,
            status,
            registry,
        }
    }

    fn monitor(&self, progress: Option<&ProgressSink>) -> DownloadMonitor {
        match (self.status, progress) {
            (CapabilityStatus::Downloadable, Some(sink)) => {
                sink.report(progress::download_started_message(DETECTION_SUBJECT));
                let sink = sink.clone();
                DownloadMonitor::new(move |fraction| {
                    sink.report(progress::download_progress_message(DETECTION_SUBJECT, fraction));
                })
            }
            _ => DownloadMonitor::noop(),
        }
    }
}

#[async_trait]
impl LanguageDetector for PlatformDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Platform
    }

    async fn detect(
        &self,
        text: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<Vec<DetectionCandidate>, DetectionError> {
        let handle = self.capability.create(self.monitor(progress)).await?;
        let raw = handle.detect(text).await?;
        debug!("Platform detector returned {} raw results", raw.len());

        let candidates = rank_platform_results(raw, &self.registry);
        if candidates.is_empty() {
            return Err(DetectionError::NoCandidates);
        }
        Ok(candidates)
    }
}

/// Detection through the built-in classifier. Never fails.
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    classifier: HeuristicClassifier,
}

impl HeuristicDetector {
    pub fn new(classifier: HeuristicClassifier) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl LanguageDetector for HeuristicDetector {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Heuristic
    }

    async fn detect(
        &self,
        text: &str,
        _progress: Option<&ProgressSink>,
    ) -> Result<Vec<DetectionCandidate>, DetectionError> {
        Ok(self.classifier.classify(text))
    }
}

/// Sort platform guesses by confidence, clamp them to `[0, 1]`, drop
/// non-finite scores and blank codes, and keep the first occurrence of each
/// code.
///
/// Registered codes come first. Unregistered ones follow in confidence
/// order, so they only lead when the platform named nothing registered.
fn rank_platform_results(
    raw: Vec<PlatformDetection>,
    registry: &LanguageRegistry,
) -> Vec<DetectionCandidate> {
    let mut results: Vec<PlatformDetection> = raw
        .into_iter()
        .filter(|r| r.confidence.is_finite() && !r.language_code.trim().is_empty())
        .collect();

    results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut seen = HashSet::new();
    let (registered, unregistered): (Vec<_>, Vec<_>) = results
        .into_iter()
        .filter(|r| seen.insert(r.language_code.trim().to_string()))
        .map(|r| {
            DetectionCandidate::new(
                r.language_code.trim(),
                r.confidence.clamp(0.0, 1.0),
                DetectionMethod::Platform,
            )
        })
        .partition(|c| registry.contains(&c.language_code));

    if !unregistered.is_empty() {
        debug!(
            "Platform named unregistered languages: {:?}",
            unregistered.iter().map(|c| &c.language_code).collect::<Vec<_>>()
        );
    }

    registered.into_iter().chain(unregistered).collect()
}
