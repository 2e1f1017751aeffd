//! Base extraction strategy: the provider-call pipeline

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use stencil_domain::{
    ConnectionCheck, ExtractionError, ExtractionRequest, ExtractionResult, ExtractionStrategy,
    Performance, ProviderConfig, ResultMetadata, StrategyConfig,
};
use stencil_provider::{ChatMessage, ChatRequest, ChatResponse, ChatTransport, HttpTransport};

use crate::blueprint::StrategyBlueprint;
use crate::schema;

/// Base delay for exponential retry backoff
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Upper bound for a single backoff sleep
pub const RETRY_MAX_DELAY_MS: u64 = 8_000;

/// One strategy bound to one provider
///
/// Executes the full pipeline per call: build request, call provider
/// with retry/backoff under an overall deadline, parse, validate/fill,
/// attach metadata. Generic over the transport so tests can script
/// provider outcomes; production instances use `HttpTransport`.
pub struct BaseExtractionStrategy<T: ChatTransport = HttpTransport> {
    blueprint: StrategyBlueprint,
    config: ProviderConfig,
    validator: jsonschema::Validator,
    transport: T,
}

impl BaseExtractionStrategy<HttpTransport> {
    /// Build a strategy from a blueprint and a caller's declarative config
    pub fn new(
        blueprint: StrategyBlueprint,
        config: StrategyConfig,
    ) -> Result<Self, ExtractionError> {
        let resolved = blueprint.resolve_config(config);
        let transport = HttpTransport::new(&resolved)?;
        Self::with_transport(blueprint, resolved, transport)
    }

    /// Rebuild this strategy from a new declarative config
    ///
    /// Instances are immutable after construction; reconfiguration
    /// resolves the new config and builds a fresh transport.
    pub fn reconfigure(self, config: StrategyConfig) -> Result<Self, ExtractionError> {
        Self::new(self.blueprint, config)
    }
}

impl<T: ChatTransport> BaseExtractionStrategy<T> {
    /// Build a strategy over an explicit transport
    pub fn with_transport(
        blueprint: StrategyBlueprint,
        config: ProviderConfig,
        transport: T,
    ) -> Result<Self, ExtractionError> {
        config.validate().map_err(ExtractionError::Config)?;
        let validator = schema::compile_schema(&blueprint.schema)?;
        Ok(Self {
            blueprint,
            config,
            validator,
            transport,
        })
    }

    /// The schema this strategy validates against
    pub fn schema(&self) -> &Value {
        &self.blueprint.schema
    }

    fn build_chat_request(&self, request: &ExtractionRequest) -> ChatRequest {
        let mut extra = self.config.extra_args.clone();
        for (key, value) in &request.options {
            extra.insert(key.clone(), value.clone());
        }

        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(self.blueprint.instruction.clone()),
                ChatMessage::user(request.content.clone()),
            ],
            response_schema: Some(self.blueprint.schema.clone()),
            extra,
        }
    }

    /// Call the provider, retrying transient failures with exponential
    /// backoff
    ///
    /// Makes at most `max_retries + 1` calls. Returns the response and
    /// the number of attempts made.
    async fn call_provider(
        &self,
        chat_request: &ChatRequest,
    ) -> Result<(ChatResponse, u32), ExtractionError> {
        let mut attempt: u32 = 0;
        loop {
            match self.transport.send(chat_request).await {
                Ok(response) => return Ok((response, attempt + 1)),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "Provider call failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        delay.as_millis(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractionError> {
        let started = Instant::now();

        let chat_request = self.build_chat_request(request);
        let (response, attempts) = self.call_provider(&chat_request).await?;

        debug!("Provider answer length: {} chars", response.content.len());

        let fields = schema::parse_fields(&response.content)?;
        let fields = schema::validate_and_fill(
            &self.blueprint.schema,
            &self.validator,
            fields,
            &response.content,
        )?;

        let performance = Performance {
            duration_seconds: started.elapsed().as_secs_f64(),
            attempts,
            usage: response.usage,
        };
        let metadata = ResultMetadata::new(
            self.blueprint.name.clone(),
            self.blueprint.version.clone(),
            request.source_ref.clone(),
            performance,
        );

        Ok(ExtractionResult { fields, metadata })
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let ms = RETRY_BASE_DELAY_MS
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(RETRY_MAX_DELAY_MS);
    Duration::from_millis(ms)
}

#[async_trait]
impl<T: ChatTransport> ExtractionStrategy for BaseExtractionStrategy<T> {
    fn name(&self) -> &str {
        &self.blueprint.name
    }

    fn version(&self) -> &str {
        &self.blueprint.version
    }

    fn provider_config(&self) -> Option<&ProviderConfig> {
        Some(&self.config)
    }

    async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractionError> {
        info!(
            "Starting extraction '{}' for source '{}', content length {}",
            self.blueprint.name,
            request.source_ref,
            request.content.len()
        );

        // The deadline covers the whole pipeline, backoff sleeps included
        let result = timeout(self.config.timeout(), self.run_pipeline(&request))
            .await
            .map_err(|_| {
                ExtractionError::ApiConnection(format!(
                    "deadline exceeded after {} seconds",
                    self.config.timeout_seconds
                ))
            })??;

        info!(
            "Extraction '{}' complete: {} fields in {:.3}s ({} attempts)",
            self.blueprint.name,
            result.fields.len(),
            result.metadata.performance.duration_seconds,
            result.metadata.performance.attempts
        );

        Ok(result)
    }

    async fn validate_provider_connection(&self) -> ConnectionCheck {
        let mut extra = Map::new();
        extra.insert("max_tokens".to_string(), Value::from(1));
        let probe = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user("ping")],
            response_schema: None,
            extra,
        };

        match timeout(self.config.timeout(), self.transport.send(&probe)).await {
            Ok(Ok(_)) => ConnectionCheck::passed(),
            Ok(Err(err)) => ConnectionCheck::failed(err.to_string()),
            Err(_) => ConnectionCheck::failed(format!(
                "deadline exceeded after {} seconds",
                self.config.timeout_seconds
            )),
        }
    }
}
