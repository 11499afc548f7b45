//! Application-level configuration loading: game rules, rotation schedule and upstream endpoints.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use thiserror::Error;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WORDS_WEAVE_CONFIG_PATH";
/// Environment variable holding the generator API key.
const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_SYSTEM_PROMPT: &str = "Do not ask any questions. You are an autocomplete feature that \
writes about 100 words continuing the given word or words. Do not ask for context, just reply \
with whatever comes to mind.";
const DEFAULT_SEED_PROMPT: &str = "Generate a 100-word paragraph containing a fascinating, \
lesser-known fact from any field of knowledge. Write as if extracted from a random encyclopedia \
page: factual, informative and engaging, with specific details, numbers and concrete examples.";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Number of challenges published per day.
    pub daily_challenges: usize,
    /// Attempts allowed per challenge before it counts as lost.
    pub max_attempts: usize,
    /// Minimum delay between two accepted guesses of the same session.
    pub cooldown: Duration,
    /// Recency window used to count active players.
    pub active_window: Duration,
    /// UTC hour at which the daily rotation fires.
    pub rotation_hour_utc: u8,
    /// Whether the session cookie carries the `Secure` attribute.
    pub secure_cookie: bool,
    /// ZenQuotes-compatible endpoint used to source new quotes.
    pub quotes_url: String,
    /// Text generation backend settings.
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone)]
/// Settings for the OpenAI-compatible text generation backend.
pub struct GeneratorConfig {
    /// Base URL of the API (without the `/chat/completions` suffix).
    pub api_base: String,
    /// Model used for both guesses and seed paragraphs.
    pub model: String,
    /// Token cap for a streamed completion.
    pub max_tokens: u32,
    /// System prompt framing player guesses.
    pub system_prompt: String,
    /// Prompt used to generate each challenge's seed paragraph.
    pub seed_prompt: String,
    /// Bearer token read from the environment.
    pub api_key: Option<String>,
}

/// Reasons a parsed configuration is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// At least one challenge per day is required.
    #[error("daily_challenges must be at least 1")]
    NoChallenges,
    /// At least one attempt per challenge is required.
    #[error("max_attempts must be at least 1")]
    NoAttempts,
    /// Hour outside `0..24`.
    #[error("rotation_hour_utc must be below 24 (got {0})")]
    InvalidHour(u8),
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        daily_challenges = config.daily_challenges,
                        max_attempts = config.max_attempts,
                        "loaded game configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to load config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.generator.api_key = env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty());
        if config.generator.api_key.is_none() {
            warn!("{API_KEY_ENV} is not set; generation requests will be rejected upstream");
        }
        config
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(contents: &str) -> anyhow::Result<Self> {
        let raw = serde_json::from_str::<RawConfig>(contents)?;
        Ok(Self::try_from(raw)?)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    daily_challenges: usize,
    max_attempts: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "cooldown_secs")]
    cooldown: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "active_window_secs")]
    active_window: Duration,
    rotation_hour_utc: u8,
    secure_cookie: bool,
    quotes_url: String,
    generator: RawGenerator,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            daily_challenges: 5,
            max_attempts: 50,
            cooldown: Duration::from_secs(5),
            active_window: Duration::from_secs(10 * 60),
            rotation_hour_utc: 0,
            secure_cookie: false,
            quotes_url: "https://zenquotes.io/api/quotes".into(),
            generator: RawGenerator::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the generator section.
struct RawGenerator {
    api_base: String,
    model: String,
    max_tokens: u32,
    system_prompt: String,
    seed_prompt: String,
}

impl Default for RawGenerator {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            model: "gpt-3.5-turbo".into(),
            max_tokens: 150,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            seed_prompt: DEFAULT_SEED_PROMPT.into(),
        }
    }
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        if value.daily_challenges == 0 {
            return Err(ConfigError::NoChallenges);
        }
        if value.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if value.rotation_hour_utc >= 24 {
            return Err(ConfigError::InvalidHour(value.rotation_hour_utc));
        }

        Ok(Self::from_raw(value))
    }
}

impl AppConfig {
    fn from_raw(value: RawConfig) -> Self {
        Self {
            daily_challenges: value.daily_challenges,
            max_attempts: value.max_attempts,
            cooldown: value.cooldown,
            active_window: value.active_window,
            rotation_hour_utc: value.rotation_hour_utc,
            secure_cookie: value.secure_cookie,
            quotes_url: value.quotes_url,
            generator: GeneratorConfig {
                api_base: value.generator.api_base,
                model: value.generator.model,
                max_tokens: value.generator.max_tokens,
                system_prompt: value.generator.system_prompt,
                seed_prompt: value.generator.seed_prompt,
                api_key: None,
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.daily_challenges, 5);
        assert_eq!(config.max_attempts, 50);
        assert_eq!(config.cooldown, Duration::from_secs(5));
        assert_eq!(config.active_window, Duration::from_secs(600));
        assert_eq!(config.generator.max_tokens, 150);
        assert!(config.generator.api_key.is_none());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = AppConfig::from_json_str(
            r#"{"daily_challenges": 3, "cooldown_secs": 0, "generator": {"model": "local"}}"#,
        )
        .unwrap();
        assert_eq!(config.daily_challenges, 3);
        assert_eq!(config.cooldown, Duration::ZERO);
        assert_eq!(config.generator.model, "local");
        assert_eq!(config.generator.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn invalid_values_are_refused() {
        assert!(AppConfig::from_json_str(r#"{"daily_challenges": 0}"#).is_err());
        assert!(AppConfig::from_json_str(r#"{"max_attempts": 0}"#).is_err());
        assert!(AppConfig::from_json_str(r#"{"rotation_hour_utc": 24}"#).is_err());
        assert!(AppConfig::from_json_str("not json").is_err());
    }
}
