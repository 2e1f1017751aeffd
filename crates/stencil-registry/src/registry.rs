//! Name-keyed table of strategy descriptors and constructors.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use stencil_domain::{unix_timestamp, ExtractionError, ExtractionStrategy, StrategyConfig};

/// Constructor stored for each registered strategy.
///
/// Invoked once per created instance. The instance owns everything it needs,
/// so unregistering or reloading afterwards does not affect it.
pub type StrategyConstructor = Arc<
    dyn Fn(StrategyConfig) -> Result<Box<dyn ExtractionStrategy>, ExtractionError> + Send + Sync,
>;

/// Metadata describing a registered strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyDescriptor {
    /// Unique name the strategy is registered under.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Grouping category, e.g. "document" or "general".
    pub category: String,
    /// Registration time in seconds since the Unix epoch.
    pub registered_at: u64,
}

/// A strategy submitted for registration.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Unique name to register under.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Grouping category.
    pub category: String,
    /// Constructor invoked for every created instance.
    pub constructor: StrategyConstructor,
}

impl RegistryEntry {
    /// Creates an entry with the given name, description, category and
    /// constructor.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        constructor: StrategyConstructor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category: category.into(),
            constructor,
        }
    }
}

struct RegisteredStrategy {
    descriptor: StrategyDescriptor,
    constructor: StrategyConstructor,
}

impl RegisteredStrategy {
    fn from_entry(entry: RegistryEntry) -> Self {
        Self {
            descriptor: StrategyDescriptor {
                name: entry.name,
                description: entry.description,
                category: entry.category,
                registered_at: unix_timestamp(),
            },
            constructor: entry.constructor,
        }
    }
}

/// Thread-safe table mapping strategy names to registered strategies.
pub struct StrategyRegistry {
    strategies: RwLock<HashMap<String, RegisteredStrategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            strategies: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a strategy under its entry name.
    ///
    /// Names are unique. Registering a name that is already present fails
    /// with [`ExtractionError::DuplicateStrategy`] and leaves the existing
    /// registration in place.
    pub fn register(&self, entry: RegistryEntry) -> Result<(), ExtractionError> {
        let mut strategies = self.strategies.write().unwrap();
        if strategies.contains_key(&entry.name) {
            return Err(ExtractionError::DuplicateStrategy(entry.name));
        }

        info!("Registering strategy: {} ({})", entry.name, entry.category);
        strategies.insert(entry.name.clone(), RegisteredStrategy::from_entry(entry));
        Ok(())
    }

    /// Registers a batch of strategies in order.
    ///
    /// Stops at the first duplicate name. Entries registered before the
    /// failure remain registered.
    pub fn register_all(
        &self,
        entries: impl IntoIterator<Item = RegistryEntry>,
    ) -> Result<(), ExtractionError> {
        for entry in entries {
            self.register(entry)?;
        }
        Ok(())
    }

    /// Returns the constructor registered under `name`.
    pub fn get(&self, name: &str) -> Result<StrategyConstructor, ExtractionError> {
        let strategies = self.strategies.read().unwrap();
        strategies
            .get(name)
            .map(|registered| Arc::clone(&registered.constructor))
            .ok_or_else(|| ExtractionError::StrategyNotFound(name.to_string()))
    }

    /// Returns the descriptor registered under `name`.
    pub fn descriptor(&self, name: &str) -> Result<StrategyDescriptor, ExtractionError> {
        let strategies = self.strategies.read().unwrap();
        strategies
            .get(name)
            .map(|registered| registered.descriptor.clone())
            .ok_or_else(|| ExtractionError::StrategyNotFound(name.to_string()))
    }

    /// Returns all descriptors keyed by strategy name, sorted by name.
    pub fn get_all(&self) -> BTreeMap<String, StrategyDescriptor> {
        let strategies = self.strategies.read().unwrap();
        strategies
            .iter()
            .map(|(name, registered)| (name.clone(), registered.descriptor.clone()))
            .collect()
    }

    /// Returns descriptors whose category matches `category`, sorted by name.
    pub fn get_by_category(&self, category: &str) -> BTreeMap<String, StrategyDescriptor> {
        let strategies = self.strategies.read().unwrap();
        strategies
            .iter()
            .filter(|(_, registered)| registered.descriptor.category == category)
            .map(|(name, registered)| (name.clone(), registered.descriptor.clone()))
            .collect()
    }

    /// Returns the distinct categories currently registered, sorted.
    pub fn categories(&self) -> BTreeSet<String> {
        let strategies = self.strategies.read().unwrap();
        strategies
            .values()
            .map(|registered| registered.descriptor.category.clone())
            .collect()
    }

    /// Returns true when a strategy is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.read().unwrap().contains_key(name)
    }

    /// Returns the number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.read().unwrap().len()
    }

    /// Returns true when no strategies are registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.read().unwrap().is_empty()
    }

    /// Removes the strategy registered under `name`.
    ///
    /// Instances already constructed from it keep working.
    pub fn unregister(&self, name: &str) -> Result<(), ExtractionError> {
        let mut strategies = self.strategies.write().unwrap();
        match strategies.remove(name) {
            Some(_) => {
                debug!("Unregistered strategy: {}", name);
                Ok(())
            }
            None => Err(ExtractionError::StrategyNotFound(name.to_string())),
        }
    }

    /// Replaces the whole table with `entries`.
    ///
    /// The replacement table is built first. A duplicate name within the
    /// batch fails with [`ExtractionError::DuplicateStrategy`] and leaves the
    /// current table untouched. On success the swap is a single write under
    /// the lock, so readers never observe a partially reloaded registry.
    pub fn reload(
        &self,
        entries: impl IntoIterator<Item = RegistryEntry>,
    ) -> Result<(), ExtractionError> {
        let mut replacement: HashMap<String, RegisteredStrategy> = HashMap::new();
        for entry in entries {
            if replacement.contains_key(&entry.name) {
                return Err(ExtractionError::DuplicateStrategy(entry.name));
            }
            replacement.insert(entry.name.clone(), RegisteredStrategy::from_entry(entry));
        }

        let mut strategies = self.strategies.write().unwrap();
        info!(
            "Reloading strategy registry: {} -> {} strategies",
            strategies.len(),
            replacement.len()
        );
        *strategies = replacement;
        Ok(())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
