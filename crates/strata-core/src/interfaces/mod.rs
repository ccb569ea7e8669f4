// crates/strata-core/src/interfaces/mod.rs
// ============================================================================
// Module: Strata Component Interfaces
// Description: Contracts for algorithms, tools, and input sources.
// Purpose: Define the seams between the runtime and pluggable components.
// Dependencies: crate::{core, metrics, runtime, store}, rand
// ============================================================================

//! ## Overview
//! The runtime never knows concrete component types. Algorithms transform the
//! data at one menu node, tools hold reusable helpers that algorithms look up
//! by name, and data sources enumerate the inputs of a job. All three are
//! constructed by the [`crate::registry`] from configuration descriptors and
//! carry a [`Properties`] map that the controller seals during the lock
//! phase.
//!
//! Components receive the per-job [`JobContext`] explicitly on every call;
//! there is no process-wide state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::core::Properties;
use crate::core::PropertyError;
use crate::metrics::MetricsError;
use crate::runtime::Element;
use crate::runtime::JobContext;
use crate::store::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures raised by components.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Property lookup or write failed.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// A required tool is not loaded or has the wrong type.
    #[error("tool unavailable: {0}")]
    Tool(String),
    /// Input data could not be processed.
    #[error("invalid input: {0}")]
    Input(String),
    /// Arrow conversion failed.
    #[error("arrow error: {0}")]
    Arrow(String),
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(String),
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Metrics failure.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl From<arrow::error::ArrowError> for ComponentError {
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::Arrow(err.to_string())
    }
}

impl From<std::io::Error> for ComponentError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// ============================================================================
// SECTION: Algorithms
// ============================================================================

/// A transformation applied to the data at a menu node.
pub trait Algorithm {
    /// Configured name.
    fn name(&self) -> &str;

    /// Configured properties.
    fn properties(&self) -> &Properties;

    /// Mutable properties; writes fail once locked.
    fn properties_mut(&mut self) -> &mut Properties;

    /// Prepares the algorithm for a job.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] when required tools or properties are absent.
    fn initialize(&mut self, _ctx: &mut JobContext) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Books the algorithm's own histograms.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Metrics`] for invalid bins.
    fn book(&mut self, _ctx: &mut JobContext) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Processes the data at `element` for the block in flight.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] when the block cannot be processed.
    fn execute(&mut self, element: &mut Element, ctx: &mut JobContext) -> Result<(), ComponentError>;

    /// Releases per-job state.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] when final output cannot be produced.
    fn finalize(&mut self, _ctx: &mut JobContext) -> Result<(), ComponentError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// A named helper shared by algorithms.
pub trait Tool: Any {
    /// Configured name.
    fn name(&self) -> &str;

    /// Configured properties.
    fn properties(&self) -> &Properties;

    /// Mutable properties; writes fail once locked.
    fn properties_mut(&mut self) -> &mut Properties;

    /// Prepares the tool for a job.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] when the configuration is unusable.
    fn initialize(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Upcast for typed lookup.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed lookup.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Tools of a job keyed by name.
#[derive(Default)]
pub struct ToolStore {
    /// Tools by configured name.
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl std::fmt::Debug for ToolStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolStore").field("tools", &self.tools.keys().collect::<Vec<_>>()).finish()
    }
}

impl ToolStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, replacing any tool with the same name.
    pub fn insert(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// True when a tool is loaded.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Loaded tool names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tools are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns a tool of concrete type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Tool`] when absent or of another type.
    pub fn get_as<T: Tool>(&self, name: &str) -> Result<&T, ComponentError> {
        self.tools
            .get(name)
            .ok_or_else(|| ComponentError::Tool(format!("{name} is not loaded")))?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| ComponentError::Tool(format!("{name} has an unexpected type")))
    }

    /// Returns a tool of concrete type `T` mutably.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Tool`] when absent or of another type.
    pub fn get_mut_as<T: Tool>(&mut self, name: &str) -> Result<&mut T, ComponentError> {
        self.tools
            .get_mut(name)
            .ok_or_else(|| ComponentError::Tool(format!("{name} is not loaded")))?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| ComponentError::Tool(format!("{name} has an unexpected type")))
    }

    /// Seals every tool's properties.
    pub fn lock(&mut self) {
        for tool in self.tools.values_mut() {
            tool.properties_mut().lock();
        }
    }

    /// Initializes every tool in name order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ComponentError`].
    pub fn initialize(&mut self) -> Result<(), ComponentError> {
        for tool in self.tools.values_mut() {
            tool.initialize()?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Data Sources
// ============================================================================

/// One input of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDatum {
    /// Generated content held in memory.
    Bytes {
        /// Display name used in logs and file descriptions.
        name: String,
        /// File content.
        data: Bytes,
    },
    /// A file on disk.
    Path(PathBuf),
}

impl InputDatum {
    /// Display name of the input.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Bytes { name, .. } => name.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

/// Enumerates the inputs of a job, generated or on disk.
pub trait DataSource {
    /// Configured name.
    fn name(&self) -> &str;

    /// Configured properties.
    fn properties(&self) -> &Properties;

    /// Mutable properties; writes fail once locked.
    fn properties_mut(&mut self) -> &mut Properties;

    /// Prepares the source; called once before booking.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] when inputs cannot be enumerated.
    fn initialize(&mut self) -> Result<(), ComponentError>;

    /// Rewinds to the first input.
    fn reset(&mut self);

    /// Returns the next input, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] when the input cannot be produced.
    fn next_datum(&mut self) -> Result<Option<InputDatum>, ComponentError>;

    /// Draws up to `n` inputs uniformly without replacement.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] when an input cannot be produced.
    fn sample(&mut self, n: usize, rng: &mut StdRng) -> Result<Vec<InputDatum>, ComponentError>;
}
