//! Stencil Provider Layer
//!
//! Everything needed to talk to an LLM provider: the provider-agnostic
//! chat request/response shapes, the `ChatTransport` seam, a dispatch
//! table mapping each provider to its endpoint/auth/wire format, and two
//! transports:
//!
//! - `HttpTransport`: reqwest-backed, one instance per strategy
//! - `MockTransport`: deterministic scripted double for testing
//!
//! # Examples
//!
//! ```
//! use stencil_provider::MockTransport;
//!
//! let transport = MockTransport::new(r#"{"headline": "hello"}"#);
//! transport.push_content(r#"{"headline": "first call"}"#);
//! ```

#![warn(missing_docs)]

pub mod dispatch;
pub mod http;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stencil_domain::{ExtractionError, Provider, TokenUsage};

pub use dispatch::{AuthScheme, Dispatch, WireFormat};
pub use http::HttpTransport;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instruction to the model
    System,
    /// Caller-supplied content
    User,
    /// Model output (multi-turn payloads)
    Assistant,
}

/// One message in a chat-style provider request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: ChatRole,

    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// A system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Provider-agnostic chat request
///
/// Built once per extraction by the strategy pipeline; the dispatch
/// table translates it into the provider's wire format.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,

    /// Ordered messages (system instruction first, then user content)
    pub messages: Vec<ChatMessage>,

    /// JSON schema of the desired answer; providers with a JSON output
    /// mode switch it on when present
    pub response_schema: Option<Value>,

    /// Provider-specific extra parameters merged into the body
    pub extra: Map<String, Value>,
}

/// Provider answer, reduced to what the extraction pipeline needs
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Assistant message text
    pub content: String,

    /// Model the provider reports having used
    pub model: Option<String>,

    /// Token usage, when reported
    pub usage: Option<TokenUsage>,
}

/// Transport seam between the extraction pipeline and a provider
///
/// `HttpTransport` implements this over the network; `MockTransport`
/// implements it from a script. The pipeline's retry loop sits above
/// this seam, so each `send` is exactly one provider call.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one chat request and return the assistant's answer
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ExtractionError>;

    /// Provider this transport talks to
    fn provider(&self) -> Provider;
}

/// Scripted outcome queued on a `MockTransport`
#[derive(Debug)]
enum MockOutcome {
    Content(String),
    Response(ChatResponse),
    Error(ExtractionError),
}

/// Mock transport for deterministic testing
///
/// Returns pre-configured outcomes without any network traffic. Queued
/// outcomes are consumed front to back; once the queue is drained every
/// call returns the default content. Clones share state, so a test can
/// keep a handle for assertions after handing the transport to a
/// strategy.
///
/// # Examples
///
/// ```
/// use stencil_provider::MockTransport;
///
/// let transport = MockTransport::new("{}");
/// transport.push_content(r#"{"title": "first"}"#);
/// assert_eq!(transport.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    default_content: String,
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockTransport {
    /// Create a mock returning `default_content` once its queue is empty
    pub fn new(default_content: impl Into<String>) -> Self {
        Self {
            default_content: default_content.into(),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue an assistant answer for the next call
    pub fn push_content(&self, content: impl Into<String>) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockOutcome::Content(content.into()));
    }

    /// Queue a full response (content plus model/usage) for the next call
    pub fn push_response(&self, response: ChatResponse) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockOutcome::Response(response));
    }

    /// Queue an error for the next call
    pub fn push_error(&self, error: ExtractionError) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(MockOutcome::Error(error));
    }

    /// Number of times `send` was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every request seen so far, in call order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request, if any call was made
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ExtractionError> {
        *self.call_count.lock().unwrap() += 1;
        self.requests.lock().unwrap().push(request.clone());

        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(MockOutcome::Content(content)) => Ok(ChatResponse {
                content,
                model: Some(request.model.clone()),
                usage: None,
            }),
            Some(MockOutcome::Response(response)) => Ok(response),
            Some(MockOutcome::Error(error)) => Err(error),
            None => Ok(ChatResponse {
                content: self.default_content.clone(),
                model: Some(request.model.clone()),
                usage: None,
            }),
        }
    }

    fn provider(&self) -> Provider {
        Provider::Custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![
                ChatMessage::system("Extract fields."),
                ChatMessage::user("Some text."),
            ],
            response_schema: None,
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_returns_default_when_queue_empty() {
        let transport = MockTransport::new(r#"{"x": 1}"#);
        let response = transport.send(&request()).await.unwrap();
        assert_eq!(response.content, r#"{"x": 1}"#);
        assert_eq!(response.model.as_deref(), Some("test-model"));
    }

    #[tokio::test]
    async fn test_mock_consumes_queue_in_order() {
        let transport = MockTransport::default();
        transport.push_content("first");
        transport.push_content("second");

        assert_eq!(transport.send(&request()).await.unwrap().content, "first");
        assert_eq!(transport.send(&request()).await.unwrap().content, "second");
        assert_eq!(transport.send(&request()).await.unwrap().content, "{}");
    }

    #[tokio::test]
    async fn test_mock_counts_calls_and_records_requests() {
        let transport = MockTransport::default();
        assert_eq!(transport.call_count(), 0);

        transport.send(&request()).await.unwrap();
        transport.send(&request()).await.unwrap();

        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(
            transport.last_request().unwrap().messages[0].content,
            "Extract fields."
        );
    }

    #[tokio::test]
    async fn test_mock_returns_queued_errors() {
        let transport = MockTransport::default();
        transport.push_error(ExtractionError::ApiConnection("refused".to_string()));

        let err = transport.send(&request()).await.unwrap_err();
        assert_eq!(err.kind(), "api_connection");
    }

    #[tokio::test]
    async fn test_mock_clone_shares_state() {
        let transport = MockTransport::default();
        let handle = transport.clone();

        transport.send(&request()).await.unwrap();

        assert_eq!(handle.call_count(), 1);
    }

    #[test]
    fn test_chat_message_serializes_with_lowercase_role() {
        let message = ChatMessage::system("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, json!({"role": "system", "content": "hi"}));
    }
}
