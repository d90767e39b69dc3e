use anyhow::{anyhow, Context, Result};
use std::env;

pub const API_KEY_VAR: &str = "DASH_SCOPE_API_KEY";
pub const BASE_URL_VAR: &str = "DASH_SCOPE_URL";
pub const MODEL_VAR: &str = "DASH_SCOPE_MODEL";
pub const TEMPERATURE_VAR: &str = "DASH_SCOPE_TEMPERATURE";
pub const MAX_TOKENS_VAR: &str = "DASH_SCOPE_MAX_TOKENS";

pub trait ProviderConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self>
    where
        Self: Sized;

    /// Helper function to get environment variables with error handling
    fn get_env(key: &str, required: bool, default: Option<String>) -> Result<Option<String>> {
        match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) if !required => Ok(default),
            Err(env::VarError::NotPresent) => Err(anyhow!(
                "Environment variable '{}' is required but not set.",
                key
            )),
            Err(e) => Err(e).with_context(|| format!("Environment variable '{}'", key)),
        }
    }
}

/// Settings for an OpenAI compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    /// Base URL, `/chat/completions` is appended
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    pub fn new(host: String, api_key: String, model: String) -> Self {
        Self {
            host,
            api_key,
            model,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ProviderConfig for OpenAiProviderConfig {
    fn from_env() -> Result<Self> {
        let api_key = Self::get_env(API_KEY_VAR, true, None)?
            .ok_or_else(|| anyhow!("API key should be present"))?;
        let host = Self::get_env(BASE_URL_VAR, true, None)?
            .ok_or_else(|| anyhow!("Base URL should be present"))?;
        let model = Self::get_env(MODEL_VAR, true, None)?
            .ok_or_else(|| anyhow!("Model should be present"))?;

        let temperature = Self::get_env(TEMPERATURE_VAR, false, None)?
            .map(|v| v.parse::<f32>())
            .transpose()
            .with_context(|| format!("{} must be a number", TEMPERATURE_VAR))?;
        let max_tokens = Self::get_env(MAX_TOKENS_VAR, false, None)?
            .map(|v| v.parse::<i32>())
            .transpose()
            .with_context(|| format!("{} must be an integer", MAX_TOKENS_VAR))?;

        Ok(Self {
            host,
            api_key,
            model,
            temperature,
            max_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment is process wide, so everything touching it lives in one test.
    #[test]
    fn test_from_env() {
        for var in [API_KEY_VAR, BASE_URL_VAR, MODEL_VAR, TEMPERATURE_VAR, MAX_TOKENS_VAR] {
            env::remove_var(var);
        }

        let err = OpenAiProviderConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));

        env::set_var(API_KEY_VAR, "sk-test");
        env::set_var(BASE_URL_VAR, "https://example.com/compatible-mode/v1");
        let err = OpenAiProviderConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(MODEL_VAR));

        env::set_var(MODEL_VAR, "qwen-plus");
        let config = OpenAiProviderConfig::from_env().unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.host, "https://example.com/compatible-mode/v1");
        assert_eq!(config.model, "qwen-plus");
        assert_eq!(config.temperature, None);
        assert_eq!(config.max_tokens, None);

        env::set_var(TEMPERATURE_VAR, "0.2");
        env::set_var(MAX_TOKENS_VAR, "512");
        let config = OpenAiProviderConfig::from_env().unwrap();
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(512));

        env::set_var(MAX_TOKENS_VAR, "lots");
        assert!(OpenAiProviderConfig::from_env().is_err());

        for var in [API_KEY_VAR, BASE_URL_VAR, MODEL_VAR, TEMPERATURE_VAR, MAX_TOKENS_VAR] {
            env::remove_var(var);
        }
    }
}
