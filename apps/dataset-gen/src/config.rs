use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::GenerationSettings;

pub const DEFAULT_BASE_URL: &str = "https://api.metisai.ir/openai/v1";
pub const DEFAULT_MODEL: &str = "gpt-5-mini";

/// Application configuration loaded from environment variables.
/// The API key is optional here; commands that call the model require it.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub default_model: String,
    pub generation: GenerationSettings,
    pub seed: Option<u64>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub model_capabilities_path: Option<PathBuf>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = GenerationSettings::default();

        Ok(Config {
            llm_api_key: get("LLM_API_KEY"),
            llm_base_url: get("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: get("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            generation: GenerationSettings {
                temperature: parse_or(&get, "TEMPERATURE", defaults.temperature)?,
                top_p: parse_or(&get, "TOP_P", defaults.top_p)?,
                presence_penalty: parse_or(&get, "PRESENCE_PENALTY", defaults.presence_penalty)?,
                frequency_penalty: parse_or(&get, "FREQUENCY_PENALTY", defaults.frequency_penalty)?,
                max_tokens: parse_opt(&get, "MAX_TOKENS")?,
            },
            seed: parse_opt(&get, "SEED")?,
            retry: RetryPolicy::new(
                parse_or(&get, "RETRY_MAX_ATTEMPTS", 3)?,
                Duration::from_millis(parse_or(&get, "RETRY_BASE_DELAY_MS", 1000)?),
            ),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 120)?),
            model_capabilities_path: get("MODEL_CAPABILITIES_PATH").map(PathBuf::from),
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.llm_api_key
            .as_deref()
            .context("Required environment variable 'LLM_API_KEY' is not set")
    }
}

fn parse_opt<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value '{raw}'"))
        })
        .transpose()
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.llm_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.default_model, "gpt-5-mini");
        assert_eq!(config.generation, GenerationSettings::default());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert!(config.seed.is_none());
        assert!(config.llm_api_key.is_none());
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = config_from(&[
            ("LLM_API_KEY", "sk-test"),
            ("TEMPERATURE", "0.7"),
            ("MAX_TOKENS", "900"),
            ("SEED", "42"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("MODEL_CAPABILITIES_PATH", "caps.json"),
        ])
        .unwrap();
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.generation.temperature, 0.7);
        assert_eq!(config.generation.max_tokens, Some(900));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.model_capabilities_path, Some(PathBuf::from("caps.json")));
    }

    #[test]
    fn test_invalid_value_names_the_variable() {
        let err = config_from(&[("TOP_P", "high")]).unwrap_err();
        assert!(err.to_string().contains("TOP_P"));
    }

    #[test]
    fn test_empty_value_counts_as_unset() {
        let config = config_from(&[("SEED", ""), ("LLM_API_KEY", "  ")]).unwrap();
        assert!(config.seed.is_none());
        assert!(config.llm_api_key.is_none());
    }
}
