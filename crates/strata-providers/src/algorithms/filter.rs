// crates/strata-providers/src/algorithms/filter.rs
// ============================================================================
// Module: Filter Algorithm
// Description: Column projection of parsed batches.
// Purpose: Apply the configured column filter tool at a menu node.
// Dependencies: strata-core, crate::tools
// ============================================================================

//! ## Overview
//! Replaces the node's current batch with its projection through the
//! `filtercoltool` named by the `tool` property. Booked timer:
//! `<name>.time.filtercol`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use strata_core::Algorithm;
use strata_core::ComponentError;
use strata_core::Datum;
use strata_core::Element;
use strata_core::JobContext;
use strata_core::Properties;
use strata_core::metrics::Stopwatch;
use strata_core::metrics::float_range;

use crate::tools::FILTER_TOOL_CLASS;
use crate::tools::FilterColTool;

// ============================================================================
// SECTION: Algorithm
// ============================================================================

/// Registered class name.
pub const FILTER_CLASS: &str = "filter";
/// Timer of one projection.
const FILTER_TIMER: &str = "time.filtercol";

/// Projects batches by column name.
#[derive(Debug)]
pub struct FilterAlgo {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Tool name.
    tool: String,
}

impl FilterAlgo {
    /// Creates the algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Property`] for a non-string `tool`.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let tool = properties.str_or("tool", FILTER_TOOL_CLASS)?;
        Ok(Self {
            name: name.to_string(),
            properties,
            tool,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`FilterAlgo::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn Algorithm>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }
}

impl Algorithm for FilterAlgo {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn initialize(&mut self, ctx: &mut JobContext) -> Result<(), ComponentError> {
        ctx.tools().get_as::<FilterColTool>(&self.tool)?;
        Ok(())
    }

    fn book(&mut self, ctx: &mut JobContext) -> Result<(), ComponentError> {
        ctx.hbook_mut().book(&self.name, FILTER_TIMER, float_range(0.0, 100.0, 2.0), "ms", true)?;
        Ok(())
    }

    fn execute(&mut self, element: &mut Element, ctx: &mut JobContext) -> Result<(), ComponentError> {
        let batch = element
            .current_batch()
            .ok_or_else(|| ComponentError::Input(format!("{}: node {} holds no batch", self.name, element.name())))?;
        let watch = Stopwatch::start();
        let filtered = ctx.tools().get_as::<FilterColTool>(&self.tool)?.filter(batch)?;
        ctx.hbook_mut().fill(&self.name, FILTER_TIMER, watch.elapsed_ms())?;
        element.set(Datum::Batch(filtered));
        Ok(())
    }
}
