//! Registry of dump engines keyed by their configured identifier.

use super::DumperConfig;
use crate::error::DumpError;
use indexmap::IndexMap;

/// Module path the engine naming convention resolves into.
pub const ENGINE_NAMESPACE: &str = "tabledump::dumpers";

type EngineFactory<E> = Box<dyn Fn(&DumperConfig) -> crate::Result<E> + Send + Sync>;

/// Explicit mapping from engine identifier to constructor.
///
/// Engines are registered once at startup; the configuration's `dumper`
/// value then selects one of them.
///
/// # Example
/// ```rust
/// use tabledump_core::config::{DumperConfig, EngineRegistry};
///
/// let mut registry: EngineRegistry<String> = EngineRegistry::new();
/// registry.register("Sql", |config| Ok(format!("sql dump of {} tables", config.tables().count())));
///
/// let config = DumperConfig::from_yaml_str("dumper: Sql\ntables:\n  users: {}\n").unwrap();
/// assert_eq!(registry.create(&config).unwrap(), "sql dump of 1 tables");
/// ```
pub struct EngineRegistry<E> {
    factories: IndexMap<String, EngineFactory<E>>,
}

impl<E> EngineRegistry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Registers a factory; an existing registration under the same
    /// identifier is replaced.
    pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&DumperConfig) -> crate::Result<E> + Send + Sync + 'static,
    {
        self.factories.insert(identifier.into(), Box::new(factory));
        self
    }

    /// Checks whether an engine is registered under `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Registered identifiers, in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiates the engine registered under `identifier`.
    ///
    /// # Errors
    /// Returns a configuration error for unknown identifiers, or whatever
    /// the factory returns.
    pub fn create_named(&self, identifier: &str, config: &DumperConfig) -> crate::Result<E> {
        let factory = self.factories.get(identifier).ok_or_else(|| {
            let known: Vec<&str> = self.identifiers().collect();
            DumpError::configuration(format!(
                "unknown dumper '{}' (registered: {})",
                identifier,
                known.join(", ")
            ))
        })?;
        factory(config)
    }

    /// Instantiates the engine selected by the configuration's `dumper` key.
    ///
    /// # Errors
    /// Returns a configuration error when no dumper is configured or the
    /// configured one is not registered.
    pub fn create(&self, config: &DumperConfig) -> crate::Result<E> {
        let identifier = config
            .engine()
            .ok_or_else(|| DumpError::configuration("dumper is not configured"))?;
        self.create_named(identifier, config)
    }
}

impl<E> Default for EngineRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EngineRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("identifiers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
