//! Stencil Rust SDK
//!
//! Caller-facing assembly of the Stencil extraction framework: the
//! strategy factory, the blocking bridge for synchronous callers, and
//! the process-wide default registry.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::{json, Map};
//! use stencil_sdk::{global_registry, register_blueprint, StrategyBlueprint, StrategyFactory};
//!
//! let blueprint = StrategyBlueprint::new(
//!     "news",
//!     json!({
//!         "type": "object",
//!         "properties": {"headline": {"type": "string"}},
//!         "required": ["headline"]
//!     }),
//!     "Extract the headline from the article.",
//! )
//! .with_category("document");
//! register_blueprint(&global_registry(), blueprint).expect("Failed to register strategy");
//!
//! let factory = StrategyFactory::new();
//! let strategy = factory
//!     .create_sync("news", &Map::new())
//!     .expect("Failed to create strategy");
//! ```

#![warn(missing_docs)]

mod factory;
mod sync;

pub use factory::{
    blueprint_entry, global_registry, register_blueprint, ConfigDocument, StrategyFactory,
};
pub use sync::SyncStrategy;

pub use stencil_domain::{
    ConnectionCheck, ExtractionError, ExtractionRequest, ExtractionResult, ExtractionStrategy,
    MemberFailure, Performance, Provider, ProviderConfig, ResultMetadata, StrategyConfig,
    TokenUsage, DEFAULT_MAX_RETRIES, DEFAULT_MODEL, DEFAULT_PROVIDER, DEFAULT_TIMEOUT_SECONDS,
};
pub use stencil_registry::{
    RegistryEntry, StrategyConstructor, StrategyDescriptor, StrategyRegistry,
};
pub use stencil_strategy::{
    BaseExtractionStrategy, CompositeStrategy, StrategyBlueprint, COMPOSITE_STRATEGY_NAME,
};
