// crates/strata-providers/src/algorithms/profiler.rs
// ============================================================================
// Module: Profiler Algorithm
// Description: Column-count validation and distribution digests.
// Purpose: Profile parsed batches into the job's t-digest book.
// Dependencies: strata-core, tracing, crate::tools
// ============================================================================

//! ## Overview
//! Checks each batch's column count against the header of the input being
//! processed, then folds a digest of every numeric column into the job's
//! t-digest book under `<name>.<column>`. A count mismatch is logged, or
//! fails the block when `strict` is set. The batch passes through unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use strata_core::Algorithm;
use strata_core::ComponentError;
use strata_core::Datum;
use strata_core::Element;
use strata_core::JobContext;
use strata_core::Properties;
use strata_core::metrics::book::book_key;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::tools::TDIGEST_TOOL_CLASS;
use crate::tools::TDigestTool;

// ============================================================================
// SECTION: Algorithm
// ============================================================================

/// Registered class name.
pub const PROFILER_CLASS: &str = "profiler";

/// Profiles batches.
#[derive(Debug)]
pub struct ProfilerAlgo {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Tool name.
    tool: String,
    /// Fail on column-count mismatch.
    strict: bool,
    /// Batches with an unexpected column count.
    mismatches: u64,
    /// Rows profiled.
    rows: u64,
}

impl ProfilerAlgo {
    /// Creates the algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Property`] for bad property types.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let tool = properties.str_or("tool", TDIGEST_TOOL_CLASS)?;
        let strict = properties.bool_or("strict", false)?;
        Ok(Self {
            name: name.to_string(),
            properties,
            tool,
            strict,
            mismatches: 0,
            rows: 0,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`ProfilerAlgo::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn Algorithm>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }
}

impl Algorithm for ProfilerAlgo {
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
        ctx.tools().get_as::<TDigestTool>(&self.tool)?;
        self.mismatches = 0;
        self.rows = 0;
        Ok(())
    }

    fn execute(&mut self, element: &mut Element, ctx: &mut JobContext) -> Result<(), ComponentError> {
        let batch = element
            .current_batch()
            .cloned()
            .ok_or_else(|| ComponentError::Input(format!("{}: node {} holds no batch", self.name, element.name())))?;
        let expected = ctx.current_columns().len();
        if expected != batch.num_columns() {
            self.mismatches += 1;
            if self.strict {
                return Err(ComponentError::Input(format!(
                    "{}: expected {expected} columns, found {}",
                    self.name,
                    batch.num_columns()
                )));
            }
            warn!(algorithm = %self.name, expected, found = batch.num_columns(), "column count differs from header");
        }
        let digests = ctx.tools().get_as::<TDigestTool>(&self.tool)?.digest_batch(&batch)?;
        for (column, digest) in &digests {
            ctx.tbook_mut().absorb(&book_key(&self.name, column), digest);
        }
        debug!(algorithm = %self.name, rows = batch.num_rows(), digests = digests.len(), "batch profiled");
        self.rows += batch.num_rows() as u64;
        element.set(Datum::Batch(batch));
        Ok(())
    }

    fn finalize(&mut self, ctx: &mut JobContext) -> Result<(), ComponentError> {
        let prefix = format!("{}.", self.name);
        let digests = ctx.tbook().keys().filter(|key| key.starts_with(&prefix)).count();
        info!(algorithm = %self.name, rows = self.rows, digests, mismatches = self.mismatches, "profiling complete");
        Ok(())
    }
}
