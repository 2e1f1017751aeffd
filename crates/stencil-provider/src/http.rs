//! HTTP transport over reqwest
//!
//! One transport is built per strategy instance, with the strategy's
//! resolved deadline baked into the client. The transport performs
//! exactly one provider call per `send`; retry policy lives in the
//! extraction pipeline above it.

use async_trait::async_trait;
use tracing::debug;

use stencil_domain::{ExtractionError, Provider, ProviderConfig};

use crate::dispatch::{self, AuthScheme, Dispatch};
use crate::{ChatRequest, ChatResponse, ChatTransport};

/// Version header required by the Anthropic messages API
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// reqwest-backed transport speaking the configured provider's wire format
#[derive(Debug)]
pub struct HttpTransport {
    provider: Provider,
    base_url: String,
    api_token: Option<String>,
    dispatch: Dispatch,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from a resolved provider configuration
    ///
    /// Fails with a configuration error when the custom provider has no
    /// base URL or the HTTP client cannot be constructed.
    pub fn new(config: &ProviderConfig) -> Result<Self, ExtractionError> {
        let dispatch = dispatch::dispatch_for(config.provider);
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| dispatch.default_base_url.to_string());
        if base_url.is_empty() {
            return Err(ExtractionError::Config(
                "custom provider requires a base_url".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ExtractionError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            dispatch,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.dispatch.endpoint_path)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ExtractionError> {
        let url = self.endpoint();
        let body = dispatch::build_body(self.dispatch.wire, request);

        let mut http_request = self.client.post(&url).json(&body);
        http_request = match self.dispatch.auth {
            AuthScheme::Bearer => match &self.api_token {
                Some(token) => {
                    http_request.header("Authorization", format!("Bearer {}", token))
                }
                None => http_request,
            },
            AuthScheme::XApiKey => http_request
                .header("x-api-key", self.api_token.as_deref().unwrap_or(""))
                .header("anthropic-version", ANTHROPIC_VERSION),
            AuthScheme::None => http_request,
        };

        debug!("POST {} (provider: {})", url, self.provider);

        let response = http_request
            .send()
            .await
            .map_err(|e| ExtractionError::ApiConnection(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ExtractionError::ApiConnection(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(ExtractionError::ApiResponse {
                status: status.as_u16(),
                message: dispatch::error_message(&text),
                body: Some(text),
            });
        }

        let envelope: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ExtractionError::ContentParsing {
                message: format!("Provider returned an invalid JSON envelope: {}", e),
                raw: Some(text.clone()),
            })?;

        dispatch::parse_response(self.dispatch.wire, &envelope)
    }

    fn provider(&self) -> Provider {
        self.provider
    }
}
