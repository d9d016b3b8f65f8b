use anyhow::{Context, Result};

use crate::detector::DetectOptions;

#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI-compatible platform capability
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub openai_temperature: f32,

    // Translation defaults
    pub target_language: String,

    // Detection
    pub detection_max_results: usize,
    pub detection_confidence_threshold: f64,
    pub platform_detection: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // An absent key leaves the platform capability unavailable
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            openai_temperature: parse_or("OPENAI_TEMPERATURE", 0.3)?,

            target_language: std::env::var("TARGET_LANGUAGE").unwrap_or_else(|_| "en".to_string()),

            detection_max_results: parse_or("DETECTION_MAX_RESULTS", 3)?,
            detection_confidence_threshold: parse_or("DETECTION_CONFIDENCE_THRESHOLD", 0.3)?,
            platform_detection: parse_or("PLATFORM_DETECTION", true)?,
        })
    }

    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            max_results: self.detection_max_results.max(1),
            confidence_threshold: self.detection_confidence_threshold,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            openai_temperature: 0.3,
            target_language: "en".to_string(),
            detection_max_results: 3,
            detection_confidence_threshold: 0.3,
            platform_detection: true,
        }
    }
}

/// Parse an optional variable, falling back to `default` when unset.
/// A set but malformed value is an error rather than a silent default.
fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "OPENAI_API_KEY",
        "OPENAI_MODEL",
        "OPENAI_API_URL",
        "OPENAI_TEMPERATURE",
        "TARGET_LANGUAGE",
        "DETECTION_MAX_RESULTS",
        "DETECTION_CONFIDENCE_THRESHOLD",
        "PLATFORM_DETECTION",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        let config = Config::from_env().expect("Should load defaults");

        assert!(config.openai_api_key.is_none());
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.target_language, "en");
        assert_eq!(config.detection_max_results, 3);
        assert!(config.platform_detection);
        assert_eq!(config.detect_options(), DetectOptions::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("TARGET_LANGUAGE", "auto");
        std::env::set_var("DETECTION_MAX_RESULTS", "5");
        std::env::set_var("PLATFORM_DETECTION", "false");

        let config = Config::from_env().expect("Should load overrides");
        clear_env();

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.target_language, "auto");
        assert_eq!(config.detection_max_results, 5);
        assert!(!config.platform_detection);
    }

    #[test]
    #[serial]
    fn test_blank_api_key_is_none() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "   ");

        let config = Config::from_env().expect("Should load");
        clear_env();

        assert!(config.openai_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_error() {
        clear_env();
        std::env::set_var("DETECTION_CONFIDENCE_THRESHOLD", "high");

        let result = Config::from_env();
        clear_env();

        let err = result.unwrap_err().to_string();
        assert!(err.contains("DETECTION_CONFIDENCE_THRESHOLD"));
    }

    #[test]
    fn test_detect_options_never_zero_results() {
        let config = Config {
            detection_max_results: 0,
            ..Config::default()
        };
        assert_eq!(config.detect_options().max_results, 1);
    }
}
