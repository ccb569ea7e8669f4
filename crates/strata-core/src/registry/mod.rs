// crates/strata-core/src/registry/mod.rs
// ============================================================================
// Module: Strata Component Registry
// Description: Constructor lookup for algorithms, tools, and data sources.
// Purpose: Build components from configuration descriptors by class name.
// Dependencies: crate::{core, interfaces, proto}
// ============================================================================

//! ## Overview
//! Each component type registers a constructor under a `(module, class)`
//! pair. A descriptor `{name, class, module, properties}` is resolved by
//! class; when the descriptor names a module it must match the one the class
//! was registered under. Any miss, or a constructor failure, is reported as
//! [`RegistryError::LoadFailed`] with the descriptor name.
//!
//! Once [`ComponentRegistry::lock`] has been called, no further constructors
//! can be registered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::core::Properties;
use crate::core::PropertyError;
use crate::interfaces::Algorithm;
use crate::interfaces::ComponentError;
use crate::interfaces::DataSource;
use crate::interfaces::Tool;
use crate::proto::ComponentConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The component could not be resolved or constructed.
    #[error("failed to load {name}: {reason}")]
    LoadFailed {
        /// Descriptor name.
        name: String,
        /// Failure detail.
        reason: String,
    },
    /// Registration attempted after lock.
    #[error("registry is locked; cannot register {0}")]
    Locked(String),
    /// Descriptor properties were invalid.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// The class is already registered.
    #[error("class {0} is already registered")]
    Duplicate(String),
}

// ============================================================================
// SECTION: Factories
// ============================================================================

/// Algorithm constructor.
pub type AlgorithmFactory = fn(&str, Properties) -> Result<Box<dyn Algorithm>, ComponentError>;

/// Tool constructor.
pub type ToolFactory = fn(&str, Properties) -> Result<Box<dyn Tool>, ComponentError>;

/// Data source constructor.
pub type SourceFactory = fn(&str, Properties) -> Result<Box<dyn DataSource>, ComponentError>;

/// Registered constructor plus its module.
#[derive(Clone)]
struct Entry<F> {
    /// Module the class belongs to.
    module: String,
    /// Constructor.
    factory: F,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Class-keyed component constructors.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    /// Algorithm constructors by class.
    algorithms: BTreeMap<String, Entry<AlgorithmFactory>>,
    /// Tool constructors by class.
    tools: BTreeMap<String, Entry<ToolFactory>>,
    /// Data source constructors by class.
    sources: BTreeMap<String, Entry<SourceFactory>>,
    /// True once sealed.
    locked: bool,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("algorithms", &self.algorithms.keys().collect::<Vec<_>>())
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("locked", &self.locked)
            .finish()
    }
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an algorithm class.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Locked`] after lock and
    /// [`RegistryError::Duplicate`] for a repeated class.
    pub fn register_algorithm(
        &mut self,
        module: &str,
        class: &str,
        factory: AlgorithmFactory,
    ) -> Result<(), RegistryError> {
        self.check_open(class)?;
        insert_entry(&mut self.algorithms, module, class, factory)
    }

    /// Registers a tool class.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Locked`] after lock and
    /// [`RegistryError::Duplicate`] for a repeated class.
    pub fn register_tool(&mut self, module: &str, class: &str, factory: ToolFactory) -> Result<(), RegistryError> {
        self.check_open(class)?;
        insert_entry(&mut self.tools, module, class, factory)
    }

    /// Registers a data source class.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Locked`] after lock and
    /// [`RegistryError::Duplicate`] for a repeated class.
    pub fn register_source(
        &mut self,
        module: &str,
        class: &str,
        factory: SourceFactory,
    ) -> Result<(), RegistryError> {
        self.check_open(class)?;
        insert_entry(&mut self.sources, module, class, factory)
    }

    /// Seals the registry.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// True once sealed.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Registered algorithm classes.
    pub fn algorithm_classes(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }

    /// Registered tool classes.
    pub fn tool_classes(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Registered data source classes.
    pub fn source_classes(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Builds an algorithm from its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LoadFailed`] when the class is unknown, the
    /// module does not match, or construction fails.
    pub fn build_algorithm(&self, config: &ComponentConfig) -> Result<Box<dyn Algorithm>, RegistryError> {
        let factory = resolve(&self.algorithms, config)?;
        construct(factory, config)
    }

    /// Builds a tool from its descriptor.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::build_algorithm`].
    pub fn build_tool(&self, config: &ComponentConfig) -> Result<Box<dyn Tool>, RegistryError> {
        let factory = resolve(&self.tools, config)?;
        construct(factory, config)
    }

    /// Builds a data source from its descriptor.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::build_algorithm`].
    pub fn build_source(&self, config: &ComponentConfig) -> Result<Box<dyn DataSource>, RegistryError> {
        let factory = resolve(&self.sources, config)?;
        construct(factory, config)
    }

    /// Rejects registration after lock.
    fn check_open(&self, class: &str) -> Result<(), RegistryError> {
        if self.locked {
            return Err(RegistryError::Locked(class.to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Inserts a constructor unless the class exists.
fn insert_entry<F>(
    map: &mut BTreeMap<String, Entry<F>>,
    module: &str,
    class: &str,
    factory: F,
) -> Result<(), RegistryError> {
    if map.contains_key(class) {
        return Err(RegistryError::Duplicate(class.to_string()));
    }
    map.insert(class.to_string(), Entry {
        module: module.to_string(),
        factory,
    });
    Ok(())
}

/// Resolves a descriptor's class, checking its module when given.
fn resolve<'a, F>(map: &'a BTreeMap<String, Entry<F>>, config: &ComponentConfig) -> Result<&'a F, RegistryError> {
    let entry = map.get(&config.class).ok_or_else(|| RegistryError::LoadFailed {
        name: config.name.clone(),
        reason: format!("unknown class {}", config.class),
    })?;
    if !config.module.is_empty() && config.module != entry.module {
        return Err(RegistryError::LoadFailed {
            name: config.name.clone(),
            reason: format!("class {} is not in module {}", config.class, config.module),
        });
    }
    Ok(&entry.factory)
}

/// Runs a constructor with the descriptor's decoded properties.
fn construct<T: ?Sized>(
    factory: &fn(&str, Properties) -> Result<Box<T>, ComponentError>,
    config: &ComponentConfig,
) -> Result<Box<T>, RegistryError> {
    let properties = config.properties.as_ref().map(Properties::from_message).unwrap_or_default();
    debug!(name = %config.name, class = %config.class, "constructing component");
    factory(&config.name, properties).map_err(|err| RegistryError::LoadFailed {
        name: config.name.clone(),
        reason: err.to_string(),
    })
}
