//! Strategy registry for the Stencil extraction framework.
//!
//! Holds the process-wide table of registered extraction strategies. Each
//! entry pairs a [`StrategyDescriptor`] (name, description, category) with a
//! [`StrategyConstructor`] closure that builds a fresh strategy instance from
//! a caller-supplied [`stencil_domain::StrategyConfig`].
//!
//! Strategies become available only through explicit registration, either one
//! at a time with [`StrategyRegistry::register`] or in bulk at startup with
//! [`StrategyRegistry::register_all`]. [`StrategyRegistry::reload`] replaces
//! the whole table atomically without touching instances that were already
//! constructed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod registry;

pub use registry::{RegistryEntry, StrategyConstructor, StrategyDescriptor, StrategyRegistry};
