//! Stencil Strategy Layer
//!
//! The extraction pipeline itself. A `StrategyBlueprint` (schema +
//! instruction + type-level defaults) plus a caller's `StrategyConfig`
//! produce a `BaseExtractionStrategy`, which runs the full pipeline per
//! call:
//!
//! 1. build a provider-agnostic chat request
//! 2. call the provider with bounded retry and exponential backoff
//! 3. parse the answer as JSON (markdown fences stripped)
//! 4. validate against the schema, filling missing root-level required
//!    fields with typed defaults
//! 5. attach metadata and return
//!
//! `CompositeStrategy` fans an input out over an ordered member list and
//! merges the field maps, later member winning a key collision.

pub mod base;
pub mod blueprint;
pub mod composite;
pub mod schema;

pub use base::{BaseExtractionStrategy, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS};
pub use blueprint::StrategyBlueprint;
pub use composite::{CompositeStrategy, COMPOSITE_STRATEGY_NAME};
