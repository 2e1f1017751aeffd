//! Strategy blueprints
//!
//! A blueprint is the registrable unit of extraction behavior: a JSON
//! schema, a natural-language instruction, and optional type-level
//! provider/model defaults. Instances are built by resolving a caller's
//! declarative config over the blueprint's defaults over the documented
//! global defaults.

use serde_json::Value;

use stencil_domain::{
    Provider, ProviderConfig, StrategyConfig, DEFAULT_MAX_RETRIES, DEFAULT_MODEL,
    DEFAULT_PROVIDER, DEFAULT_TIMEOUT_SECONDS,
};

/// Schema + instruction unit from which strategy instances are built
#[derive(Debug, Clone)]
pub struct StrategyBlueprint {
    /// Unique strategy name, used as the registry key
    pub name: String,

    /// Version attached to result metadata
    pub version: String,

    /// Human-readable description
    pub description: String,

    /// Registry category
    pub category: String,

    /// JSON schema of the desired output
    pub schema: Value,

    /// System instruction sent to the provider
    pub instruction: String,

    /// Provider used when the caller's config names none
    pub default_provider: Option<Provider>,

    /// Model used when the caller's config names none
    pub default_model: Option<String>,
}

impl StrategyBlueprint {
    /// Create a blueprint with the given name, schema, and instruction
    pub fn new(name: impl Into<String>, schema: Value, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            description: String::new(),
            category: "general".to_string(),
            schema,
            instruction: instruction.into(),
            default_provider: None,
            default_model: None,
        }
    }

    /// Set the version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the default provider
    pub fn with_default_provider(mut self, provider: Provider) -> Self {
        self.default_provider = Some(provider);
        self
    }

    /// Set the default model
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Resolve a caller's declarative config into the concrete provider
    /// configuration a strategy instance will own
    ///
    /// Precedence per field: caller config, then this blueprint's
    /// defaults, then the global defaults (`DEFAULT_PROVIDER`,
    /// `DEFAULT_MODEL`, `DEFAULT_MAX_RETRIES`, `DEFAULT_TIMEOUT_SECONDS`).
    pub fn resolve_config(&self, config: StrategyConfig) -> ProviderConfig {
        ProviderConfig {
            provider: config
                .provider
                .or(self.default_provider)
                .unwrap_or(DEFAULT_PROVIDER),
            model: config
                .model
                .or_else(|| self.default_model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_token: config.api_token,
            base_url: config.base_url,
            max_retries: config.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            timeout_seconds: config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            extra_args: config.extra_args,
        }
    }
}
