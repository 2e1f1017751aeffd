//! Error taxonomy for extraction operations

use thiserror::Error;

/// HTTP statuses that the retry loop treats as transient
pub const RETRYABLE_STATUS: [u16; 2] = [429, 503];

/// Errors that can occur while resolving, constructing, or running a strategy
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Network-level failure reaching the provider (timeout, DNS, refused)
    #[error("API connection error: {0}")]
    ApiConnection(String),

    /// Provider responded with a non-success status
    #[error("API response error (status {status}): {message}")]
    ApiResponse {
        /// HTTP status code returned by the provider
        status: u16,

        /// Provider-supplied error message, or a fallback description
        message: String,

        /// Raw response body, when one was received
        body: Option<String>,
    },

    /// Provider answer could not be parsed as JSON, or failed schema
    /// validation beyond auto-fillable required fields
    #[error("Content parsing error: {message}")]
    ContentParsing {
        /// What went wrong
        message: String,

        /// Raw provider text, kept for diagnosis
        raw: Option<String>,
    },

    /// No strategy with this name is registered
    #[error("Strategy not found: {0}")]
    StrategyNotFound(String),

    /// A strategy constructor failed
    #[error("Failed to create strategy '{name}': {reason}")]
    StrategyCreation {
        /// Name of the strategy being constructed
        name: String,

        /// Underlying construction failure
        reason: String,
    },

    /// A strategy with this name is already registered
    #[error("Strategy already registered: {0}")]
    DuplicateStrategy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Async runtime could not be created for a blocking call
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ExtractionError {
    /// Stable snake_case name of the error kind
    ///
    /// Used in result metadata (composite member failures) and by UI
    /// surfaces that render errors without matching on the enum.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::ApiConnection(_) => "api_connection",
            ExtractionError::ApiResponse { .. } => "api_response",
            ExtractionError::ContentParsing { .. } => "content_parsing",
            ExtractionError::StrategyNotFound(_) => "strategy_not_found",
            ExtractionError::StrategyCreation { .. } => "strategy_creation",
            ExtractionError::DuplicateStrategy(_) => "duplicate_strategy",
            ExtractionError::Config(_) => "config",
            ExtractionError::Runtime(_) => "runtime",
        }
    }

    /// Whether the base pipeline's retry loop should attempt the call again
    ///
    /// Connection-level failures are always retryable; provider responses
    /// only for the statuses in [`RETRYABLE_STATUS`]. Everything else is
    /// deterministic and surfaces immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionError::ApiConnection(_) => true,
            ExtractionError::ApiResponse { status, .. } => RETRYABLE_STATUS.contains(status),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ExtractionError {
    fn from(e: serde_json::Error) -> Self {
        ExtractionError::ContentParsing {
            message: e.to_string(),
            raw: None,
        }
    }
}
