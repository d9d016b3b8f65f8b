//! Language detection and translation orchestration for selected text.
//!
//! [`TranslationEngine`] decides, per request, whether the host's translation
//! and detection capabilities can be used, falls back to the offline
//! [`HeuristicClassifier`](i18n::HeuristicClassifier) for detection, and
//! streams model download progress through a [`ProgressSink`].

pub mod capability;
pub mod config;
pub mod detector;
pub mod i18n;
pub mod openai;
pub mod prober;
pub mod progress;
pub mod retry;
pub mod translation;

pub use capability::{
    CapabilityError, CapabilityStatus, DetectionCapability, DetectorHandle, DownloadMonitor,
    PlatformDetection, TranslationCapability, TranslatorHandle,
};
pub use config::Config;
pub use detector::DetectOptions;
pub use i18n::{DetectionCandidate, DetectionMethod, LanguageRegistry};
pub use prober::{CapabilityProber, ProbeResult};
pub use progress::{ProgressReceiver, ProgressSink};
pub use translation::{
    determine_target_language, TranslationEngine, TranslationError, TranslationRequest,
    TranslationResult,
};
