//! Strategy factory over a registry.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use stencil_domain::{ExtractionError, ExtractionStrategy, Provider, StrategyConfig};
use stencil_registry::{RegistryEntry, StrategyRegistry};
use stencil_strategy::{
    BaseExtractionStrategy, CompositeStrategy, StrategyBlueprint, COMPOSITE_STRATEGY_NAME,
};

use crate::sync::SyncStrategy;

static GLOBAL_REGISTRY: Lazy<Arc<StrategyRegistry>> =
    Lazy::new(|| Arc::new(StrategyRegistry::new()));

/// Shared handle to the process-wide default registry.
///
/// [`StrategyFactory::new`] binds this registry; applications populate it
/// once at startup with [`register_blueprint`] or
/// [`StrategyRegistry::register_all`].
pub fn global_registry() -> Arc<StrategyRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}

/// One strategy selection in the JSON configuration format.
///
/// ```json
/// {"strategy": "news", "config": {"provider": "openai", "model": "gpt-4o"}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Registered strategy name.
    pub strategy: String,

    /// Declarative configuration forwarded to the constructor.
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// Builds strategy instances from registered constructors.
pub struct StrategyFactory {
    registry: Arc<StrategyRegistry>,
}

impl StrategyFactory {
    /// Factory over the process-wide default registry.
    pub fn new() -> Self {
        Self {
            registry: global_registry(),
        }
    }

    /// Factory over a specific registry.
    pub fn with_registry(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    /// Shared handle to the registry this factory builds from.
    pub fn registry(&self) -> Arc<StrategyRegistry> {
        Arc::clone(&self.registry)
    }

    /// Creates an instance of the named strategy.
    ///
    /// `config` is a declarative JSON object (provider, model, api_token,
    /// base_url, max_retries, timeout_seconds; unknown keys become extra
    /// provider parameters). An unknown name fails with
    /// [`ExtractionError::StrategyNotFound`], a malformed config with
    /// [`ExtractionError::Config`], and a constructor failure is wrapped
    /// as [`ExtractionError::StrategyCreation`].
    pub fn create(
        &self,
        name: &str,
        config: &Map<String, Value>,
    ) -> Result<Box<dyn ExtractionStrategy>, ExtractionError> {
        let constructor = self.registry.get(name)?;
        let config = StrategyConfig::from_map(config.clone())?;

        debug!("Creating strategy instance: {}", name);
        constructor(config).map_err(|err| ExtractionError::StrategyCreation {
            name: name.to_string(),
            reason: err.to_string(),
        })
    }

    /// Creates a strategy from a parsed configuration document.
    pub fn create_from_config(
        &self,
        document: &ConfigDocument,
    ) -> Result<Box<dyn ExtractionStrategy>, ExtractionError> {
        self.create(&document.strategy, &document.config)
    }

    /// Creates a strategy from configuration JSON text.
    ///
    /// A JSON object selects a single strategy; a JSON array of documents
    /// builds a composite over its members in order. Anything else,
    /// including invalid JSON, fails with
    /// [`ExtractionError::ContentParsing`].
    pub fn create_from_json(
        &self,
        json: &str,
    ) -> Result<Box<dyn ExtractionStrategy>, ExtractionError> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Object(_) => {
                let document: ConfigDocument = serde_json::from_value(value)?;
                self.create_from_config(&document)
            }
            Value::Array(_) => {
                let documents: Vec<ConfigDocument> = serde_json::from_value(value)?;
                let members: Vec<(String, Map<String, Value>)> = documents
                    .into_iter()
                    .map(|document| (document.strategy, document.config))
                    .collect();
                Ok(Box::new(self.create_composite(&members)?))
            }
            other => Err(ExtractionError::ContentParsing {
                message: format!(
                    "strategy configuration must be a JSON object or array, got {}",
                    type_name(&other)
                ),
                raw: Some(json.to_string()),
            }),
        }
    }

    /// Creates a composite over the named member strategies, in order.
    ///
    /// Member creation errors propagate unchanged. An empty member list
    /// fails with [`ExtractionError::StrategyCreation`].
    pub fn create_composite(
        &self,
        members: &[(String, Map<String, Value>)],
    ) -> Result<CompositeStrategy, ExtractionError> {
        if members.is_empty() {
            return Err(ExtractionError::StrategyCreation {
                name: COMPOSITE_STRATEGY_NAME.to_string(),
                reason: "a composite needs at least one member strategy".to_string(),
            });
        }

        let mut built = Vec::with_capacity(members.len());
        for (name, config) in members {
            built.push(self.create(name, config)?);
        }

        info!("Created composite strategy with {} members", built.len());
        Ok(CompositeStrategy::new(built))
    }

    /// Convenience overload naming provider, model and credential directly.
    ///
    /// Omitted values fall through the usual resolution chain down to the
    /// global defaults.
    pub fn create_strategy(
        &self,
        name: &str,
        provider: Option<Provider>,
        model: Option<&str>,
        api_token: Option<&str>,
    ) -> Result<Box<dyn ExtractionStrategy>, ExtractionError> {
        let mut config = Map::new();
        if let Some(provider) = provider {
            config.insert("provider".to_string(), Value::String(provider.to_string()));
        }
        if let Some(model) = model {
            config.insert("model".to_string(), Value::String(model.to_string()));
        }
        if let Some(token) = api_token {
            config.insert("api_token".to_string(), Value::String(token.to_string()));
        }
        self.create(name, &config)
    }

    /// As [`StrategyFactory::create`], returning a blocking wrapper.
    pub fn create_sync(
        &self,
        name: &str,
        config: &Map<String, Value>,
    ) -> Result<SyncStrategy, ExtractionError> {
        Ok(SyncStrategy::new(self.create(name, config)?))
    }

    /// As [`StrategyFactory::create_from_config`], returning a blocking
    /// wrapper.
    pub fn create_from_config_sync(
        &self,
        document: &ConfigDocument,
    ) -> Result<SyncStrategy, ExtractionError> {
        Ok(SyncStrategy::new(self.create_from_config(document)?))
    }

    /// As [`StrategyFactory::create_from_json`], returning a blocking
    /// wrapper.
    pub fn create_from_json_sync(&self, json: &str) -> Result<SyncStrategy, ExtractionError> {
        Ok(SyncStrategy::new(self.create_from_json(json)?))
    }

    /// As [`StrategyFactory::create_composite`], returning a blocking
    /// wrapper.
    pub fn create_composite_sync(
        &self,
        members: &[(String, Map<String, Value>)],
    ) -> Result<SyncStrategy, ExtractionError> {
        Ok(SyncStrategy::new(Box::new(self.create_composite(members)?)))
    }

    /// As [`StrategyFactory::create_strategy`], returning a blocking
    /// wrapper.
    pub fn create_strategy_sync(
        &self,
        name: &str,
        provider: Option<Provider>,
        model: Option<&str>,
        api_token: Option<&str>,
    ) -> Result<SyncStrategy, ExtractionError> {
        Ok(SyncStrategy::new(self.create_strategy(
            name, provider, model, api_token,
        )?))
    }
}

impl Default for StrategyFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a blueprint into a registry entry whose constructor builds an
/// HTTP-backed [`BaseExtractionStrategy`].
pub fn blueprint_entry(blueprint: StrategyBlueprint) -> RegistryEntry {
    let name = blueprint.name.clone();
    let description = blueprint.description.clone();
    let category = blueprint.category.clone();

    RegistryEntry::new(
        name,
        description,
        category,
        Arc::new(move |config| {
            let strategy = BaseExtractionStrategy::new(blueprint.clone(), config)?;
            Ok(Box::new(strategy) as Box<dyn ExtractionStrategy>)
        }),
    )
}

/// Registers a blueprint with `registry`.
pub fn register_blueprint(
    registry: &StrategyRegistry,
    blueprint: StrategyBlueprint,
) -> Result<(), ExtractionError> {
    registry.register(blueprint_entry(blueprint))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
