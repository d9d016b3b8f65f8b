//! Language registry: Single source of truth for all supported languages.
//!
//! Every language the engine can detect or translate is declared here as a
//! [`LanguageProfile`]. Profiles are validated once by [`RegistryBuilder`] and
//! the resulting [`LanguageRegistry`] is immutable. The process-wide instance
//! is created lazily behind a `OnceLock` and shared as an `Arc`.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use super::classifier::UNKNOWN_LANGUAGE;

/// Errors raised while building or querying the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown language code: '{0}'")]
    NotFound(String),

    #[error("Language code '{0}' is registered twice")]
    DuplicateCode(String),

    #[error("Language code '{0}' is reserved")]
    ReservedCode(String),

    #[error("Invalid character class for '{code}': {reason}")]
    InvalidPattern { code: String, reason: String },
}

/// Script-specific scoring rule applied by the heuristic classifier after the
/// generic pattern/keyword score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOverride {
    /// Ratio of CJK unified ideographs (U+4E00..U+9FFF) in the raw text.
    CjkIdeographs,
    /// Ratio of ASCII letters for text made only of Basic Latin characters.
    AsciiLatin,
}

/// A single supported language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    /// Short identifier (e.g. "zh", "en")
    code: String,

    /// Human-readable name (e.g. "Chinese")
    display_name: String,

    /// Single-character class; every match counts as one script character
    char_pattern: Regex,

    /// Lower-cased function words, in declaration order, without duplicates
    keywords: Vec<String>,

    script_override: Option<ScriptOverride>,
}

impl LanguageProfile {
    /// Create a profile from the body of a regex character class.
    ///
    /// `char_class` is wrapped in `[...]`, so `"a-z"` matches one lower-case
    /// ASCII letter. Keywords are lower-cased and de-duplicated.
    pub fn new(
        code: &str,
        display_name: &str,
        char_class: &str,
        keywords: &[&str],
    ) -> Result<Self, RegistryError> {
        let char_pattern =
            Regex::new(&format!("[{}]", char_class)).map_err(|e| RegistryError::InvalidPattern {
                code: code.to_string(),
                reason: e.to_string(),
            })?;

        let mut ordered: Vec<String> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = keyword.to_lowercase();
            if !ordered.contains(&keyword) {
                ordered.push(keyword);
            }
        }

        Ok(Self {
            code: code.to_string(),
            display_name: display_name.to_string(),
            char_pattern,
            keywords: ordered,
            script_override: None,
        })
    }

    /// Attach a script-specific scoring rule.
    pub fn with_override(mut self, rule: ScriptOverride) -> Self {
        self.script_override = Some(rule);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn script_override(&self) -> Option<ScriptOverride> {
        self.script_override
    }

    /// Number of characters in `text` that belong to this profile's script.
    pub fn count_matches(&self, text: &str) -> usize {
        self.char_pattern.find_iter(text).count()
    }

    /// Whether `token` (already lower-cased) is one of this profile's keywords.
    pub fn is_keyword(&self, token: &str) -> bool {
        self.keywords.iter().any(|k| k == token)
    }
}

/// Entry of the `code -> display name` export consumed by language pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOption {
    pub code: String,
    pub display_name: String,
}

/// Immutable, ordered collection of language profiles indexed by code.
#[derive(Debug)]
pub struct LanguageRegistry {
    profiles: Vec<LanguageProfile>,
    index: HashMap<String, usize>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<Arc<LanguageRegistry>> = OnceLock::new();

impl LanguageRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Get the process-wide registry built from [`default_profiles`].
    ///
    /// # Panics
    /// Panics if the built-in table is invalid, which is a programming error
    /// caught by the tests in this module.
    pub fn global() -> Arc<LanguageRegistry> {
        REGISTRY
            .get_or_init(|| Arc::new(default_registry().expect("built-in language table is valid")))
            .clone()
    }

    /// All profiles in declaration order.
    pub fn all(&self) -> &[LanguageProfile] {
        &self.profiles
    }

    /// Look up a profile by code.
    pub fn get(&self, code: &str) -> Result<&LanguageProfile, RegistryError> {
        self.index
            .get(code)
            .map(|&i| &self.profiles[i])
            .ok_or_else(|| RegistryError::NotFound(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// `code -> display name` pairs in declaration order.
    pub fn language_options(&self) -> Vec<LanguageOption> {
        self.profiles
            .iter()
            .map(|p| LanguageOption {
                code: p.code.clone(),
                display_name: p.display_name.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Append-only builder; the registry cannot change once built.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    profiles: Vec<LanguageProfile>,
}

impl RegistryBuilder {
    pub fn register(mut self, profile: LanguageProfile) -> Result<Self, RegistryError> {
        if profile.code == UNKNOWN_LANGUAGE {
            return Err(RegistryError::ReservedCode(profile.code));
        }
        if self.profiles.iter().any(|p| p.code == profile.code) {
            return Err(RegistryError::DuplicateCode(profile.code));
        }
        self.profiles.push(profile);
        Ok(self)
    }

    pub fn build(self) -> LanguageRegistry {
        let index = self
            .profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.code.clone(), i))
            .collect();
        LanguageRegistry {
            profiles: self.profiles,
            index,
        }
    }
}

/// Build a registry holding the built-in language table.
pub fn default_registry() -> Result<LanguageRegistry, RegistryError> {
    default_profiles()?
        .into_iter()
        .try_fold(LanguageRegistry::builder(), |builder, profile| {
            builder.register(profile)
        })
        .map(RegistryBuilder::build)
}

// Latin punctuation and digits shared by every Latin-script class.
const LATIN_COMMON: &str = r#"\s.,!?;:'"()\-0-9"#;

/// Built-in language table, in picker order.
pub fn default_profiles() -> Result<Vec<LanguageProfile>, RegistryError> {
    Ok(vec![
        LanguageProfile::new(
            "zh",
            "Chinese",
            r"\x{4E00}-\x{9FFF}\x{3400}-\x{4DBF}\x{F900}-\x{FAFF}",
            &[
                "的", "了", "在", "是", "我", "有", "他", "这", "中", "一", "国", "和", "大",
                "会", "也", "不", "能", "说", "要", "以", "上",
            ],
        )?
        .with_override(ScriptOverride::CjkIdeographs),
        LanguageProfile::new(
            "en",
            "English",
            &format!("a-zA-Z{}", LATIN_COMMON),
            &[
                "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for",
                "not", "on", "with", "he", "as", "you", "do", "at",
            ],
        )?
        .with_override(ScriptOverride::AsciiLatin),
        LanguageProfile::new(
            "ja",
            "Japanese",
            r"\x{3040}-\x{309F}\x{30A0}-\x{30FF}\x{4E00}-\x{9FFF}",
            &[
                "の", "に", "は", "を", "た", "が", "で", "て", "と", "し", "れ", "さ", "ある",
                "いる", "も", "する", "から", "な", "こと", "として",
            ],
        )?,
        LanguageProfile::new(
            "ko",
            "Korean",
            r"\x{AC00}-\x{D7AF}\x{1100}-\x{11FF}\x{3130}-\x{318F}",
            &[
                "이", "그", "에", "의", "는", "가", "을", "를", "로", "으로", "와", "과", "도",
                "만", "부터", "까지", "에서", "한", "하다", "있다",
            ],
        )?,
        LanguageProfile::new(
            "ru",
            "Russian",
            r"\x{0400}-\x{04FF}",
            &[
                "в", "и", "не", "на", "я", "быть", "тот", "он", "весь", "а", "как", "она",
                "так", "его", "но", "да", "ты", "к", "у", "же",
            ],
        )?,
        LanguageProfile::new(
            "de",
            "German",
            &format!("a-zA-ZäöüßÄÖÜ{}", LATIN_COMMON),
            &[
                "der", "die", "und", "in", "den", "von", "zu", "das", "mit", "sich", "des",
                "auf", "für", "ist", "im", "dem", "nicht", "ein", "eine", "als",
            ],
        )?,
        LanguageProfile::new(
            "fr",
            "French",
            &format!("a-zA-ZàâäéèêëîïôöùûüÿçÀÂÄÉÈÊËÎÏÔÖÙÛÜŸÇ{}", LATIN_COMMON),
            &[
                "de", "le", "et", "à", "un", "il", "être", "en", "avoir", "que", "pour",
                "dans", "ce", "son", "une", "sur", "avec", "ne", "se",
            ],
        )?,
        LanguageProfile::new(
            "es",
            "Spanish",
            &format!("a-zA-ZñáéíóúüÑÁÉÍÓÚÜ{}", LATIN_COMMON),
            &[
                "de", "la", "que", "el", "en", "y", "a", "es", "se", "no", "te", "lo", "le",
                "da", "su", "por", "son", "con", "para", "al",
            ],
        )?,
        LanguageProfile::new(
            "it",
            "Italian",
            &format!("a-zA-ZàèéìíîòóùúÀÈÉÌÍÎÒÓÙÚ{}", LATIN_COMMON),
            &[
                "di", "a", "da", "in", "con", "su", "per", "tra", "fra", "il", "lo", "la", "i",
                "gli", "le", "un", "una", "e", "che", "non",
            ],
        )?,
        LanguageProfile::new(
            "pt",
            "Portuguese",
            &format!("a-zA-ZãâáàçêéèíîõôóòúûüÃÂÁÀÇÊÉÈÍÎÕÔÓÒÚÛÜ{}", LATIN_COMMON),
            &[
                "de", "a", "o", "e", "do", "da", "em", "um", "para", "é", "com", "não", "uma",
                "os", "no", "se", "na", "por", "mais", "as",
            ],
        )?,
    ])
}
