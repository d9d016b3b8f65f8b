//! Language knowledge used for detection.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for the supported languages, their
//!   character classes and their keyword lists
//! - `classifier`: Offline heuristic classifier scoring text against the registry
//!
//! # Example
//!
//! ```rust,ignore
//! use selection_translator::i18n::{HeuristicClassifier, LanguageRegistry};
//!
//! let classifier = HeuristicClassifier::new(LanguageRegistry::global());
//! let best = &classifier.classify("你好世界")[0];
//! assert_eq!(best.language_code, "zh");
//! ```

mod classifier;
mod registry;

pub use classifier::{DetectionCandidate, DetectionMethod, HeuristicClassifier, UNKNOWN_LANGUAGE};
pub use registry::{
    default_profiles, default_registry, LanguageOption, LanguageProfile, LanguageRegistry, RegistryBuilder,
    RegistryError, ScriptOverride,
};
