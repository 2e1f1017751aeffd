//! Blocking wrapper over async strategies.

use stencil_domain::{
    ConnectionCheck, ExtractionError, ExtractionRequest, ExtractionResult, ExtractionStrategy,
    ProviderConfig,
};

/// Blocking facade over an async strategy.
///
/// Each call builds a fresh current-thread tokio runtime, drives the
/// wrapped call to completion on it, and drops the runtime. Calls are
/// independent, so a wrapper can be shared across threads without
/// coordination.
///
/// Must not be used from inside an async context: `block_on` panics on a
/// thread that is already driving a runtime. Callers in async code should
/// use the wrapped strategy directly.
pub struct SyncStrategy {
    inner: Box<dyn ExtractionStrategy>,
}

impl SyncStrategy {
    /// Wraps an async strategy.
    pub fn new(inner: Box<dyn ExtractionStrategy>) -> Self {
        Self { inner }
    }

    /// Name of the wrapped strategy.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Version of the wrapped strategy.
    pub fn version(&self) -> &str {
        self.inner.version()
    }

    /// Resolved provider configuration of the wrapped strategy, when it
    /// has one.
    pub fn provider_config(&self) -> Option<&ProviderConfig> {
        self.inner.provider_config()
    }

    /// Runs one extraction to completion, blocking the calling thread.
    pub fn extract(&self, request: ExtractionRequest) -> Result<ExtractionResult, ExtractionError> {
        let runtime = build_runtime().map_err(ExtractionError::Runtime)?;
        runtime.block_on(self.inner.extract(request))
    }

    /// Runs the provider connectivity check, blocking the calling thread.
    ///
    /// A runtime construction failure is reported as a failed check
    /// rather than an error, matching the async contract of never
    /// failing.
    pub fn validate_provider_connection(&self) -> ConnectionCheck {
        match build_runtime() {
            Ok(runtime) => runtime.block_on(self.inner.validate_provider_connection()),
            Err(reason) => ConnectionCheck::failed(reason),
        }
    }

    /// Unwraps the inner async strategy.
    pub fn into_inner(self) -> Box<dyn ExtractionStrategy> {
        self.inner
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create runtime: {}", e))
}
