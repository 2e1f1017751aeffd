//! Provider and strategy configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExtractionError;

/// Provider used when neither the caller nor the strategy names one
pub const DEFAULT_PROVIDER: Provider = Provider::OpenAi;

/// Model used when neither the caller nor the strategy names one
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Retries after the initial attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-call deadline in seconds
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 60.0;

/// The closed set of supported LLM providers
///
/// Dispatch details (endpoint, auth header, wire format) live in the
/// provider layer's dispatch table, keyed by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat completions
    OpenAi,
    /// Anthropic messages
    Anthropic,
    /// OpenRouter (OpenAI-compatible)
    OpenRouter,
    /// Google Gemini through its OpenAI-compatible endpoint
    Google,
    /// Mistral (OpenAI-compatible)
    Mistral,
    /// Local Ollama (OpenAI-compatible)
    Ollama,
    /// Any OpenAI-compatible endpoint at an explicit base URL
    Custom,
}

impl Provider {
    /// Canonical lowercase name, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::OpenRouter => "openrouter",
            Provider::Google => "google",
            Provider::Mistral => "mistral",
            Provider::Ollama => "ollama",
            Provider::Custom => "custom",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "openrouter" => Ok(Provider::OpenRouter),
            "google" => Ok(Provider::Google),
            "mistral" => Ok(Provider::Mistral),
            "ollama" => Ok(Provider::Ollama),
            "custom" => Ok(Provider::Custom),
            other => Err(ExtractionError::Config(format!(
                "Unknown provider '{}' (expected one of: openai, anthropic, openrouter, google, mistral, ollama, custom)",
                other
            ))),
        }
    }
}

/// Declarative strategy configuration as supplied by callers
///
/// Every field is optional. Resolution against strategy-level defaults
/// and the documented global defaults happens at construction time, not
/// here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StrategyConfig {
    /// Provider to call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,

    /// Model identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Credential for the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Base URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Retries after the initial attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Per-call deadline in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<f64>,

    /// Provider-specific extra parameters (temperature, max_tokens, ...)
    #[serde(flatten)]
    pub extra_args: Map<String, Value>,
}

impl StrategyConfig {
    /// Build a configuration from a JSON object
    ///
    /// Both `api_token` and `api_key` spellings are accepted and
    /// normalized to `api_token`; `api_token` wins when both appear.
    /// Keys that are not recognized fields land in `extra_args` and are
    /// forwarded to the provider.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, ExtractionError> {
        let mut config = StrategyConfig::default();
        let mut api_key = None;

        for (key, value) in map {
            match key.as_str() {
                "provider" => {
                    config.provider = Some(expect_string(&key, value)?.parse()?);
                }
                "model" => config.model = Some(expect_string(&key, value)?),
                "api_token" => config.api_token = Some(expect_string(&key, value)?),
                "api_key" => api_key = Some(expect_string(&key, value)?),
                "base_url" => config.base_url = Some(expect_string(&key, value)?),
                "max_retries" => {
                    let retries = value
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| {
                            ExtractionError::Config(format!(
                                "max_retries must be a non-negative integer, got {}",
                                value
                            ))
                        })?;
                    config.max_retries = Some(retries);
                }
                "timeout_seconds" => {
                    let seconds = value.as_f64().ok_or_else(|| {
                        ExtractionError::Config(format!(
                            "timeout_seconds must be a number, got {}",
                            value
                        ))
                    })?;
                    config.timeout_seconds = Some(seconds);
                }
                _ => {
                    config.extra_args.insert(key, value);
                }
            }
        }

        if config.api_token.is_none() {
            config.api_token = api_key;
        }
        Ok(config)
    }
}

impl<'de> Deserialize<'de> for StrategyConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map = Map::deserialize(deserializer)?;
        StrategyConfig::from_map(map).map_err(serde::de::Error::custom)
    }
}

fn expect_string(key: &str, value: Value) -> Result<String, ExtractionError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ExtractionError::Config(format!(
            "{} must be a string, got {}",
            key, other
        ))),
    }
}

/// Resolved provider configuration owned by a strategy instance
///
/// Immutable after construction; reconfiguration builds a new instance
/// rather than mutating this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider to call
    pub provider: Provider,

    /// Model identifier
    pub model: String,

    /// Credential, if the provider needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Base URL override (None uses the provider's default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Retries after the initial attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-call deadline in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,

    /// Provider-specific extra parameters sent with every request
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_args: Map<String, Value>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout_seconds() -> f64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl ProviderConfig {
    /// Get the per-call deadline as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.is_empty() {
            return Err("model must not be empty".to_string());
        }
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err("timeout_seconds must be a positive number".to_string());
        }
        if self.provider == Provider::Custom && self.base_url.is_none() {
            return Err("custom provider requires a base_url".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ProviderConfig {
    /// Default configuration pointing at the documented global defaults
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER,
            model: DEFAULT_MODEL.to_string(),
            api_token: None,
            base_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            extra_args: Map::new(),
        }
    }
}
