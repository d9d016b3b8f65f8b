//! Capability prober: asks the external capabilities whether they can be used.
//!
//! Probing never fails. A missing capability, an explicit "unavailable" and
//! any error raised while asking all collapse into
//! [`CapabilityStatus::Unavailable`] with a reason attached. Results are not
//! cached; probing is cheap, creating a capability is not.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::capability::{CapabilityStatus, DetectionCapability, TranslationCapability};

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: CapabilityStatus,
    /// Why the capability cannot be used; set when `status` is `Unavailable`.
    pub reason: Option<String>,
}

impl ProbeResult {
    fn usable(status: CapabilityStatus) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            status: CapabilityStatus::Unavailable,
            reason: Some(reason.into()),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.status.is_usable()
    }
}

/// Holds the (possibly absent) host capabilities.
#[derive(Clone, Default)]
pub struct CapabilityProber {
    translation: Option<Arc<dyn TranslationCapability>>,
    detection: Option<Arc<dyn DetectionCapability>>,
}

impl CapabilityProber {
    pub fn new(
        translation: Option<Arc<dyn TranslationCapability>>,
        detection: Option<Arc<dyn DetectionCapability>>,
    ) -> Self {
        Self {
            translation,
            detection,
        }
    }

    pub fn translation_capability(&self) -> Option<&Arc<dyn TranslationCapability>> {
        self.translation.as_ref()
    }

    pub fn detection_capability(&self) -> Option<&Arc<dyn DetectionCapability>> {
        self.detection.as_ref()
    }

    pub async fn probe_translation(&self, source: &str, target: &str) -> ProbeResult {
        let Some(capability) = &self.translation else {
            return ProbeResult::unavailable("Translator capability is not available on this host");
        };

        let result = match capability.availability(source, target).await {
            Ok(CapabilityStatus::Unavailable) => ProbeResult::unavailable(format!(
                "Translation {}->{} is not available",
                source, target
            )),
            Ok(status) => ProbeResult::usable(status),
            Err(e) => {
                warn!("Translator availability check for {}->{} failed: {}", source, target, e);
                ProbeResult::unavailable(format!(
                    "Language pair {}->{} not supported: {}",
                    source, target, e
                ))
            }
        };

        debug!("Translation probe {}->{}: {}", source, target, result.status);
        result
    }

    pub async fn probe_detection(&self) -> ProbeResult {
        let Some(capability) = &self.detection else {
            return ProbeResult::unavailable(
                "Language detector capability is not available on this host",
            );
        };

        let result = match capability.availability().await {
            Ok(CapabilityStatus::Unavailable) => {
                ProbeResult::unavailable("Language detection is not available")
            }
            Ok(status) => ProbeResult::usable(status),
            Err(e) => {
                warn!("Language detector availability check failed: {}", e);
                ProbeResult::unavailable(format!("Language detector check failed: {}", e))
            }
        };

        debug!("Detection probe: {}", result.status);
        result
    }
}
