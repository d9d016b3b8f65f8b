//! Translate or identify a piece of selected text from the command line.
//!
//! Usage:
//!   selection-translator [--from <code>] [--to <code>] <text>
//!   selection-translator --detect <text>
//!   selection-translator --languages
//!
//! Without `--from` the source language is detected. Without `--to` the
//! `TARGET_LANGUAGE` variable is used; `auto` picks English for CJK text and
//! Chinese otherwise.
//!
//! Optional environment variables:
//! - OPENAI_API_KEY (without it translation is unavailable and detection is heuristic only)
//! - OPENAI_MODEL (defaults to gpt-4o-mini)
//! - OPENAI_API_URL
//! - TARGET_LANGUAGE (defaults to en)
//! - DETECTION_MAX_RESULTS (defaults to 3)
//! - DETECTION_CONFIDENCE_THRESHOLD (defaults to 0.3)
//! - PLATFORM_DETECTION (defaults to true)

use anyhow::{bail, Context, Result};
use selection_translator::{
    determine_target_language, progress, Config, TranslationEngine, TranslationRequest,
};
use tracing::info;

#[derive(Debug, Default)]
struct Args {
    from: Option<String>,
    to: Option<String>,
    detect: bool,
    languages: bool,
    text: String,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut words = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--from" => parsed.from = Some(args.next().context("--from needs a language code")?),
            "--to" => parsed.to = Some(args.next().context("--to needs a language code")?),
            "--detect" => parsed.detect = true,
            "--languages" => parsed.languages = true,
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            _ => words.push(arg),
        }
    }

    parsed.text = words.join(" ");
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout only carries the result
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("selection_translator=info".parse()?),
        )
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = Config::from_env()?;
    let engine = TranslationEngine::from_config(&config);

    if args.languages {
        let options = engine.registry().language_options();
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    if args.detect {
        let candidates = engine.detect_language(&args.text, None).await;
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    let default_target = args.to.as_deref().unwrap_or(&config.target_language);
    let target_lang = determine_target_language(&args.text, default_target);

    let (sink, mut receiver) = progress::channel();
    let reporter = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            eprintln!("{}", message);
        }
    });

    let mut request = TranslationRequest::new(args.text, target_lang).with_progress(sink);
    request.source_lang = args.from;

    let result = engine.translate_request(request).await;
    // The request owned the only sink; once it is gone the reporter drains and exits
    reporter.await?;

    let result = result?;
    info!(
        "Translated {} -> {}",
        result.source_lang, result.target_lang
    );
    println!("{}", result.translated_text);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_translate_args() {
        let parsed = parse_args(args(&["--from", "en", "--to", "zh", "hello", "world"])).unwrap();

        assert_eq!(parsed.from.as_deref(), Some("en"));
        assert_eq!(parsed.to.as_deref(), Some("zh"));
        assert_eq!(parsed.text, "hello world");
        assert!(!parsed.detect);
    }

    #[test]
    fn test_parse_flags() {
        let parsed = parse_args(args(&["--detect", "bonjour"])).unwrap();
        assert!(parsed.detect);
        assert_eq!(parsed.text, "bonjour");

        let parsed = parse_args(args(&["--languages"])).unwrap();
        assert!(parsed.languages);
        assert!(parsed.text.is_empty());
    }

    #[test]
    fn test_parse_missing_value() {
        let err = parse_args(args(&["hello", "--to"])).unwrap_err();
        assert!(err.to_string().contains("--to"));
    }

    #[test]
    fn test_parse_unknown_option() {
        assert!(parse_args(args(&["--verbose", "hi"])).is_err());
    }
}
