//! Translation orchestrator.
//!
//! [`TranslationEngine`] is the entry point used by the UI layer. One call runs
//! through `detecting (auto path only) -> probing -> downloading (optional) ->
//! translating` and ends with either a complete [`TranslationResult`] or
//! exactly one [`TranslationError`]. Nothing is retried and nothing is kept
//! between calls, so concurrent calls never interfere.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capability::{
    CapabilityStatus, DetectionCapability, DownloadMonitor, TranslationCapability,
};
use crate::config::Config;
use crate::detector::{DetectOptions, HeuristicDetector, LanguageDetector, PlatformDetector};
use crate::i18n::{DetectionCandidate, DetectionMethod, HeuristicClassifier, LanguageRegistry};
use crate::openai::OpenAiCapability;
use crate::prober::CapabilityProber;
use crate::progress::{self, ProgressSink};

/// Terminal failure of one orchestration call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("Translation text cannot be empty")]
    EmptyInput,

    #[error("Translation not available: {0}")]
    CapabilityUnavailable(String),

    #[error("Unable to detect source language reliably")]
    LanguageNotDetected,

    #[error("Translation pair {from}->{to} is not supported")]
    UnsupportedLanguage { from: String, to: String },

    #[error("Translation failed: {0}")]
    TranslationFailed(String),
}

/// Input of [`TranslationEngine::translate_request`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub text: String,
    /// Detected automatically when absent
    #[serde(default)]
    pub source_lang: Option<String>,
    pub target_lang: String,
    #[serde(skip)]
    pub progress: Option<ProgressSink>,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: None,
            target_lang: target_lang.into(),
            progress: None,
        }
    }

    pub fn with_source(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub target_lang: String,
    pub source_lang: String,
    pub origin_text: String,
    pub translated_text: String,
}

impl TranslationResult {
    /// Result for a call that needed no translation; echoes the input.
    pub fn unchanged(text: &str, source_lang: &str, target_lang: &str) -> Self {
        Self {
            target_lang: target_lang.to_string(),
            source_lang: source_lang.to_string(),
            origin_text: text.to_string(),
            translated_text: text.to_string(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.source_lang == self.target_lang
    }
}

/// Pick a target language. `"auto"` means English for text containing CJK
/// ideographs and Chinese for everything else.
pub fn determine_target_language(text: &str, default_lang: &str) -> String {
    if default_lang != "auto" {
        return default_lang.to_string();
    }

    let has_cjk = text.chars().any(|c| ('\u{4E00}'..='\u{9FFF}').contains(&c));
    if has_cjk { "en" } else { "zh" }.to_string()
}

/// Detection and translation orchestrator.
pub struct TranslationEngine {
    registry: Arc<LanguageRegistry>,
    heuristic: HeuristicDetector,
    prober: CapabilityProber,
    detect_options: DetectOptions,
    platform_detection: bool,
}

impl TranslationEngine {
    /// Engine over the global registry with the given host capabilities.
    pub fn new(prober: CapabilityProber) -> Self {
        Self::with_registry(prober, LanguageRegistry::global())
    }

    pub fn with_registry(prober: CapabilityProber, registry: Arc<LanguageRegistry>) -> Self {
        Self {
            heuristic: HeuristicDetector::new(HeuristicClassifier::new(registry.clone())),
            registry,
            prober,
            detect_options: DetectOptions::default(),
            platform_detection: true,
        }
    }

    /// Engine backed by the OpenAI-compatible capability described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let capability = Arc::new(OpenAiCapability::from_config(config));
        let translation: Arc<dyn TranslationCapability> = capability.clone();
        let detection: Arc<dyn DetectionCapability> = capability;

        Self::new(CapabilityProber::new(Some(translation), Some(detection)))
            .with_detect_options(config.detect_options())
            .with_platform_detection(config.platform_detection)
    }

    pub fn with_detect_options(mut self, options: DetectOptions) -> Self {
        self.detect_options = options;
        self
    }

    /// When disabled, detection always uses the heuristic classifier.
    pub fn with_platform_detection(mut self, enabled: bool) -> Self {
        self.platform_detection = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    /// Dispatch a UI request: explicit source when given, auto-detection
    /// otherwise. Blank text is rejected on both paths.
    pub async fn translate_request(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResult, TranslationError> {
        if request.text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        let progress = request.progress.as_ref();
        match request.source_lang.as_deref() {
            Some(source) => {
                self.translate(&request.text, &request.target_lang, source, progress)
                    .await
            }
            None => {
                self.translate_with_auto_detection(&request.text, &request.target_lang, progress)
                    .await
            }
        }
    }

    /// Translate with an explicit source language.
    ///
    /// Blank text and `source == target` return the input unchanged without
    /// touching the capability.
    pub async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<TranslationResult, TranslationError> {
        if text.trim().is_empty() {
            debug!("Blank text, returning it unchanged");
            return Ok(TranslationResult::unchanged(text, source_lang, target_lang));
        }
        if source_lang == target_lang {
            debug!("Source and target are both {}, nothing to translate", source_lang);
            return Ok(TranslationResult::unchanged(text, source_lang, target_lang));
        }

        let probe = self.prober.probe_translation(source_lang, target_lang).await;
        let capability = match (probe.status, self.prober.translation_capability()) {
            (CapabilityStatus::Unavailable, _) | (_, None) => {
                let reason = probe
                    .reason
                    .unwrap_or_else(|| "Translation not available".to_string());
                warn!("Translation {}->{} unavailable: {}", source_lang, target_lang, reason);
                return Err(TranslationError::CapabilityUnavailable(reason));
            }
            (_, Some(capability)) => capability,
        };

        let pair = format!("{}->{}", source_lang, target_lang);
        let monitor = match (probe.status, progress) {
            (CapabilityStatus::Downloadable, Some(sink)) => {
                info!("Translation model for {} needs downloading", pair);
                sink.report(progress::download_started_message(&pair));
                let sink = sink.clone();
                let subject = pair.clone();
                DownloadMonitor::new(move |fraction| {
                    sink.report(progress::download_progress_message(&subject, fraction));
                })
            }
            _ => DownloadMonitor::noop(),
        };

        let translator = capability
            .create(source_lang, target_lang, monitor)
            .await
            .map_err(|e| {
                warn!("Creating translator for {} failed: {}", pair, e);
                TranslationError::TranslationFailed(e.to_string())
            })?;

        let translated_text = translator.translate(text).await.map_err(|e| {
            warn!("Translation {} failed: {}", pair, e);
            TranslationError::TranslationFailed(e.to_string())
        })?;

        info!("Translated {} characters ({})", text.chars().count(), pair);

        Ok(TranslationResult {
            target_lang: target_lang.to_string(),
            source_lang: source_lang.to_string(),
            origin_text: text.to_string(),
            translated_text,
        })
    }

    /// Detect the source language, then translate.
    ///
    /// Only the top detection candidate is considered.
    pub async fn translate_with_auto_detection(
        &self,
        text: &str,
        target_lang: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<TranslationResult, TranslationError> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        let detected = self.detect_primary_language(text, progress).await;
        if detected.is_unknown() {
            return Err(TranslationError::LanguageNotDetected);
        }

        let source_lang = detected.language_code;
        if !self.registry.contains(&source_lang) || !self.registry.contains(target_lang) {
            return Err(TranslationError::UnsupportedLanguage {
                from: source_lang,
                to: target_lang.to_string(),
            });
        }

        if source_lang == target_lang {
            debug!("Detected language equals target {}, skipping translation", target_lang);
            return Ok(TranslationResult::unchanged(text, &source_lang, target_lang));
        }

        self.translate(text, target_lang, &source_lang, progress).await
    }

    /// Ranked candidates using the engine's [`DetectOptions`].
    pub async fn detect_language(
        &self,
        text: &str,
        progress: Option<&ProgressSink>,
    ) -> Vec<DetectionCandidate> {
        self.detect_language_with(text, self.detect_options, progress).await
    }

    /// Best candidate, or `{unknown, 0.0}` when nothing qualifies.
    pub async fn detect_primary_language(
        &self,
        text: &str,
        progress: Option<&ProgressSink>,
    ) -> DetectionCandidate {
        let options = DetectOptions {
            max_results: 1,
            ..self.detect_options
        };
        self.detect_language_with(text, options, progress)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| DetectionCandidate::unknown(0.0, DetectionMethod::Heuristic))
    }

    /// Ranked candidates: platform detector first when usable, heuristic
    /// classifier otherwise. Detection never fails outright.
    pub async fn detect_language_with(
        &self,
        text: &str,
        options: DetectOptions,
        progress: Option<&ProgressSink>,
    ) -> Vec<DetectionCandidate> {
        if text.trim().is_empty() {
            return vec![DetectionCandidate::unknown(0.0, DetectionMethod::Heuristic)];
        }

        if let Some(platform) = self.platform_detector().await {
            match platform.detect(text, progress).await {
                Ok(candidates) => {
                    debug!(
                        "{:?} detection picked {:?}",
                        platform.method(),
                        candidates.first()
                    );
                    return candidates.into_iter().take(options.max_results).collect();
                }
                Err(e) => warn!("{}, falling back to heuristic detection", e),
            }
        }

        let floor = options.heuristic_floor();
        let candidates = match self.heuristic.detect(text, progress).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Heuristic detection failed: {}", e);
                Vec::new()
            }
        };
        let candidates: Vec<DetectionCandidate> = candidates
            .into_iter()
            .filter(|c| c.confidence >= floor)
            .take(options.max_results)
            .collect();

        debug!(
            "{:?} detection picked {:?}",
            self.heuristic.method(),
            candidates.first()
        );
        candidates
    }

    /// The platform strategy, if enabled and the prober says it can be used.
    async fn platform_detector(&self) -> Option<PlatformDetector> {
        if !self.platform_detection {
            return None;
        }

        let probe = self.prober.probe_detection().await;
        if !probe.is_usable() {
            debug!(
                "Platform detection skipped: {}",
                probe.reason.as_deref().unwrap_or("unavailable")
            );
            return None;
        }

        let capability = self.prober.detection_capability()?.clone();
        Some(PlatformDetector::new(
            capability,
            probe.status,
            self.registry.clone(),
        ))
    }
}
