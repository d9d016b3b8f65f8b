//! Heuristic language classifier.
//!
//! Scores text against every profile in the registry using two signals:
//! the share of characters belonging to the profile's script, and the share
//! of whitespace-separated tokens that are common function words. Chinese and
//! English get an extra script-ratio rule evaluated on the raw input.
//!
//! The constants below are part of the scoring contract; changing any of them
//! changes the confidences callers observe.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

use super::registry::{LanguageRegistry, ScriptOverride};

/// Sentinel language code for "could not tell".
pub const UNKNOWN_LANGUAGE: &str = "unknown";

const MIN_TEXT_CHARS: usize = 3;
const UNKNOWN_CONFIDENCE: f64 = 0.1;
const PATTERN_WEIGHT: f64 = 0.6;
const KEYWORD_WEIGHT: f64 = 0.4;
const KEYWORD_WINDOW: usize = 10;
const CJK_WEIGHT: f64 = 0.9;
const ASCII_LATIN_WEIGHT: f64 = 0.8;
const MIN_CANDIDATE_SCORE: f64 = 0.1;
const MIN_TOP_SCORE: f64 = 0.2;
const MAX_CANDIDATES: usize = 5;

/// Which detector produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    Platform,
    Heuristic,
}

/// One ranked guess about the language of a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionCandidate {
    pub language_code: String,
    /// In `[0, 1]`
    pub confidence: f64,
    pub method: DetectionMethod,
}

impl DetectionCandidate {
    pub fn new(language_code: impl Into<String>, confidence: f64, method: DetectionMethod) -> Self {
        Self {
            language_code: language_code.into(),
            confidence,
            method,
        }
    }

    pub fn unknown(confidence: f64, method: DetectionMethod) -> Self {
        Self::new(UNKNOWN_LANGUAGE, confidence, method)
    }

    pub fn is_unknown(&self) -> bool {
        self.language_code == UNKNOWN_LANGUAGE
    }
}

/// Deterministic pattern/keyword scorer over a [`LanguageRegistry`].
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    registry: Arc<LanguageRegistry>,
}

impl HeuristicClassifier {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    /// Rank registry languages for `text`, best first.
    ///
    /// Always returns at least one candidate; `{unknown, 0.1}` when the text is
    /// shorter than three characters or nothing scores convincingly. At most
    /// five candidates are returned, all tagged [`DetectionMethod::Heuristic`].
    pub fn classify(&self, text: &str) -> Vec<DetectionCandidate> {
        let normalized = text.trim().to_lowercase();
        let length = normalized.chars().count();

        if length < MIN_TEXT_CHARS {
            return vec![unknown_candidate()];
        }

        let words: Vec<&str> = normalized.split_whitespace().collect();
        let keyword_window = words.len().min(KEYWORD_WINDOW);

        let mut scored: Vec<(&str, f64)> = Vec::new();

        for profile in self.registry.all() {
            let matches = profile.count_matches(&normalized);
            let pattern_score = ratio(matches, length).min(1.0) * PATTERN_WEIGHT;

            let hits = words.iter().filter(|w| profile.is_keyword(w)).count();
            let keyword_score = ratio(hits, keyword_window).min(1.0) * KEYWORD_WEIGHT;

            let mut score = pattern_score + keyword_score;

            if let Some(rule) = profile.script_override() {
                if let Some(script_score) = script_override_score(rule, text) {
                    score = score.max(script_score);
                }
            }

            if score > MIN_CANDIDATE_SCORE {
                scored.push((profile.code(), score));
            }
        }

        // Stable: ties keep registry order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let top = scored.first().map(|&(_, score)| score).unwrap_or(0.0);
        if top < MIN_TOP_SCORE {
            return vec![unknown_candidate()];
        }

        scored
            .into_iter()
            .take(MAX_CANDIDATES)
            .map(|(code, score)| {
                DetectionCandidate::new(code, score.min(1.0), DetectionMethod::Heuristic)
            })
            .collect()
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new(LanguageRegistry::global())
    }
}

fn unknown_candidate() -> DetectionCandidate {
    DetectionCandidate::unknown(UNKNOWN_CONFIDENCE, DetectionMethod::Heuristic)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Score from a script rule, evaluated on the raw (not lower-cased, not
/// trimmed) text. `None` when the rule does not apply.
///
/// The ASCII rule divides by the non-whitespace count while the generic
/// pattern score divides by the full normalized length.
fn script_override_score(rule: ScriptOverride, text: &str) -> Option<f64> {
    match rule {
        ScriptOverride::CjkIdeographs => {
            let cjk = text.chars().filter(|&c| is_cjk_ideograph(c)).count();
            if cjk == 0 {
                return None;
            }
            Some(ratio(cjk, text.chars().count()) * CJK_WEIGHT)
        }
        ScriptOverride::AsciiLatin => {
            let has_non_latin = text.chars().any(|c| !c.is_ascii() && !c.is_whitespace());
            let letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
            if has_non_latin || letters == 0 {
                return None;
            }
            let visible = text.chars().filter(|c| !c.is_whitespace()).count();
            Some(ratio(letters, visible) * ASCII_LATIN_WEIGHT)
        }
    }
}
