//! Contracts for the host-provided translation and detection capabilities.
//!
//! The engine never implements translation itself. It talks to whatever the
//! host offers through these traits: first asking whether a capability is
//! usable, then creating a handle (which may trigger a one-time model
//! download), then using the handle.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Tri-state availability reported by an external capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityStatus {
    /// Ready to use immediately.
    Available,
    /// Usable after a one-time asynchronous fetch.
    Downloadable,
    Unavailable,
}

impl CapabilityStatus {
    pub fn is_usable(self) -> bool {
        matches!(self, Self::Available | Self::Downloadable)
    }
}

impl fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "available",
            Self::Downloadable => "downloadable",
            Self::Unavailable => "unavailable",
        };
        f.write_str(label)
    }
}

/// Failure raised by an external capability.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("language pair {from}->{to} is not supported")]
    UnsupportedPair { from: String, to: String },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One language guess returned by a platform detector.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformDetection {
    pub language_code: String,
    pub confidence: f64,
}

/// Receives model download progress as a fraction in `[0, 1]`.
#[derive(Clone)]
pub struct DownloadMonitor {
    on_progress: Arc<dyn Fn(f64) + Send + Sync>,
}

impl DownloadMonitor {
    pub fn new(on_progress: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            on_progress: Arc::new(on_progress),
        }
    }

    /// A monitor that discards every update.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn loaded(&self, fraction: f64) {
        (self.on_progress)(fraction.clamp(0.0, 1.0));
    }
}

impl fmt::Debug for DownloadMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadMonitor").finish_non_exhaustive()
    }
}

/// Host translation facility.
#[async_trait]
pub trait TranslationCapability: Send + Sync {
    async fn availability(&self, source: &str, target: &str)
        -> Result<CapabilityStatus, CapabilityError>;

    /// Create a translator for the pair. Resolves only once the translator is
    /// usable, reporting any download through `monitor`.
    async fn create(
        &self,
        source: &str,
        target: &str,
        monitor: DownloadMonitor,
    ) -> Result<Box<dyn TranslatorHandle>, CapabilityError>;
}

#[async_trait]
pub trait TranslatorHandle: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, CapabilityError>;
}

/// Host language detection facility.
#[async_trait]
pub trait DetectionCapability: Send + Sync {
    async fn availability(&self) -> Result<CapabilityStatus, CapabilityError>;

    async fn create(
        &self,
        monitor: DownloadMonitor,
    ) -> Result<Box<dyn DetectorHandle>, CapabilityError>;
}

#[async_trait]
pub trait DetectorHandle: Send + Sync {
    /// Ranked guesses, best first.
    async fn detect(&self, text: &str) -> Result<Vec<PlatformDetection>, CapabilityError>;
}
