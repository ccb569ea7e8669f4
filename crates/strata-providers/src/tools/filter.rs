// crates/strata-providers/src/tools/filter.rs
// ============================================================================
// Module: Column Filter Tool
// Description: Name-based column projection of record batches.
// Purpose: Keep or drop a configured set of columns.
// Dependencies: arrow, strata-core, tracing
// ============================================================================

//! ## Overview
//! By default only the columns named in `columns` are kept, in batch order.
//! With `invert` set, the named columns are dropped and the rest kept. With
//! no `columns` property the batch passes through unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeSet;

use arrow::record_batch::RecordBatch;
use strata_core::ComponentError;
use strata_core::Properties;
use strata_core::Tool;
use tracing::warn;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Registered class name.
pub const FILTER_TOOL_CLASS: &str = "filtercoltool";

/// Projects record batches by column name.
#[derive(Debug)]
pub struct FilterColTool {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Named columns; `None` passes batches through.
    columns: Option<BTreeSet<String>>,
    /// Drop the named columns instead of keeping them.
    invert: bool,
}

impl FilterColTool {
    /// Creates the tool from its properties.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Property`] for bad property types.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let columns = if properties.contains("columns") {
            Some(properties.list_or_empty("columns")?.into_iter().collect())
        } else {
            warn!(tool = %name, "no columns configured; batches pass through");
            None
        };
        let invert = properties.bool_or("invert", false)?;
        Ok(Self {
            name: name.to_string(),
            properties,
            columns,
            invert,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`FilterColTool::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn Tool>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }

    /// Applies the projection.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Arrow`] when projection fails.
    pub fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch, ComponentError> {
        let Some(columns) = &self.columns else {
            return Ok(batch.clone());
        };
        let schema = batch.schema();
        let indices: Vec<usize> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| columns.contains(field.name()) != self.invert)
            .map(|(idx, _)| idx)
            .collect();
        Ok(batch.project(&indices)?)
    }
}

impl Tool for FilterColTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
