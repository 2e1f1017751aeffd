//! Trait definitions for strategy implementations
//!
//! The trait here is the seam between callers and the strategy layer.
//! Concrete implementations (the base provider pipeline, composites)
//! live in other crates.

use std::fmt;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::ExtractionError;
use crate::types::{ConnectionCheck, ExtractionRequest, ExtractionResult};

/// A strategy binds a JSON schema and an instruction to a provider
/// configuration, and exposes one operation: extract structured data
/// from unstructured text.
///
/// Callers usually obtain instances through the factory rather than
/// constructing them directly.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Registered name of this strategy
    fn name(&self) -> &str;

    /// Version string attached to result metadata
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// The resolved provider configuration, when the strategy has one
    ///
    /// Composites return `None`; their members each carry their own.
    fn provider_config(&self) -> Option<&ProviderConfig> {
        None
    }

    /// Run one extraction against the configured provider
    async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractionError>;

    /// Lightweight connectivity/auth check without a full extraction
    async fn validate_provider_connection(&self) -> ConnectionCheck;
}

impl fmt::Debug for dyn ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionStrategy")
            .field("name", &self.name())
            .field("version", &self.version())
            .finish()
    }
}
