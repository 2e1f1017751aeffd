//! Stencil Domain Layer
//!
//! This crate contains the core vocabulary of Stencil: the error taxonomy,
//! provider and strategy configuration, extraction request/result shapes,
//! and the `ExtractionStrategy` trait that every concrete strategy
//! implements. All other layers depend on this crate and it depends on
//! none of them.
//!
//! ## Key Concepts
//!
//! - **Strategy**: a JSON schema + instruction + provider binding, capable
//!   of one operation: extract structured data from text
//! - **Provider**: an external LLM API vendor, a closed enum
//! - **StrategyConfig**: the declarative, all-optional configuration a
//!   caller supplies
//! - **ProviderConfig**: the resolved configuration a strategy instance
//!   owns, immutable after construction
//! - **ExtractionResult**: extracted fields plus metadata (timing, token
//!   usage, per-member failures for composites)
//!
//! ## Architecture
//!
//! - Pure types and trait definitions only
//! - No network or disk I/O
//! - Infrastructure implementations (HTTP transport, registry, factory)
//!   live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use config::{
    Provider, ProviderConfig, StrategyConfig, DEFAULT_MAX_RETRIES, DEFAULT_MODEL,
    DEFAULT_PROVIDER, DEFAULT_TIMEOUT_SECONDS,
};
pub use error::{ExtractionError, RETRYABLE_STATUS};
pub use traits::ExtractionStrategy;
pub use types::{
    unix_timestamp, ConnectionCheck, ExtractionRequest, ExtractionResult, MemberFailure,
    Performance, ResultMetadata, TokenUsage,
};
