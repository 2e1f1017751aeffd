//! Request and result types for extraction

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Current time as seconds since the Unix epoch
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Request to extract structured data from text
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Source reference (a URL or identifier, informational only)
    pub source_ref: String,

    /// Text to extract from
    pub content: String,

    /// Per-call provider parameters, merged over the instance's
    /// `extra_args` (per-call wins)
    pub options: Map<String, Value>,
}

impl ExtractionRequest {
    /// Create a request with no per-call options
    pub fn new(source_ref: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            content: content.into(),
            options: Map::new(),
        }
    }

    /// Add a per-call provider parameter
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Token consumption reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u64,

    /// Tokens in the completion
    pub completion_tokens: u64,

    /// Total tokens billed
    pub total_tokens: u64,
}

/// Timing and usage details for one extraction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Performance {
    /// Wall-clock time spent in `extract`
    pub duration_seconds: f64,

    /// Attempts made against the provider (1 = no retries)
    pub attempts: u32,

    /// Token usage, when the provider reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// A composite member that failed during partial-success extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFailure {
    /// Name of the failed member strategy
    pub strategy: String,

    /// Stable error-kind name (see `ExtractionError::kind`)
    pub kind: String,

    /// Human-readable failure message
    pub message: String,
}

/// Metadata attached to every extraction result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Name of the strategy that produced the result
    pub strategy: String,

    /// Version of the strategy
    pub strategy_version: String,

    /// UUIDv7 correlation id for this extraction
    pub extraction_id: Uuid,

    /// When the extraction completed (seconds since Unix epoch, UTC)
    pub extracted_at: u64,

    /// Source reference from the request
    pub source_ref: String,

    /// Timing and token usage
    pub performance: Performance,

    /// Failed composite members (empty for single strategies)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member_failures: Vec<MemberFailure>,
}

impl ResultMetadata {
    /// Metadata for a fresh result, with a new extraction id and the
    /// current timestamp
    pub fn new(
        strategy: impl Into<String>,
        strategy_version: impl Into<String>,
        source_ref: impl Into<String>,
        performance: Performance,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            strategy_version: strategy_version.into(),
            extraction_id: Uuid::now_v7(),
            extracted_at: unix_timestamp(),
            source_ref: source_ref.into(),
            performance,
            member_failures: Vec::new(),
        }
    }
}

/// Result of one extraction
///
/// Never mutated after return; a composite merge produces a fresh
/// result rather than editing a member's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted fields, satisfying the strategy schema's required set
    pub fields: Map<String, Value>,

    /// Extraction metadata
    pub metadata: ResultMetadata,
}

/// Result of a provider connectivity pre-flight check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionCheck {
    /// Whether the provider answered
    pub ok: bool,

    /// Failure detail when it did not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionCheck {
    /// A successful check
    pub fn passed() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    /// A failed check with detail
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder_collects_options() {
        let request = ExtractionRequest::new("https://example.com", "some text")
            .with_option("temperature", json!(0.1))
            .with_option("max_tokens", json!(256));

        assert_eq!(request.source_ref, "https://example.com");
        assert_eq!(request.options.len(), 2);
        assert_eq!(request.options.get("temperature"), Some(&json!(0.1)));
    }

    #[test]
    fn test_metadata_gets_fresh_id_and_timestamp() {
        let a = ResultMetadata::new("news", "1.0.0", "src", Performance::default());
        let b = ResultMetadata::new("news", "1.0.0", "src", Performance::default());

        assert_ne!(a.extraction_id, b.extraction_id);
        assert!(a.extracted_at > 0);
        assert!(a.member_failures.is_empty());
    }

    #[test]
    fn test_result_serializes_without_empty_member_failures() {
        let result = ExtractionResult {
            fields: Map::new(),
            metadata: ResultMetadata::new("news", "1.0.0", "src", Performance::default()),
        };
        let text = serde_json::to_string(&result).unwrap();
        assert!(!text.contains("member_failures"));
    }

    #[test]
    fn test_connection_check_constructors() {
        assert!(ConnectionCheck::passed().ok);
        let failed = ConnectionCheck::failed("no route to host");
        assert!(!failed.ok);
        assert_eq!(failed.error.as_deref(), Some("no route to host"));
    }

    #[test]
    fn test_unix_timestamp_is_recent() {
        // 2024-01-01 as a sanity floor
        assert!(unix_timestamp() > 1_704_067_200);
    }
}
