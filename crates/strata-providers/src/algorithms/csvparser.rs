// crates/strata-providers/src/algorithms/csvparser.rs
// ============================================================================
// Module: CSV Parser Algorithm
// Description: Raw delimited blocks to Arrow batches.
// Purpose: Parse each block through the configured CSV tool.
// Dependencies: strata-core, tracing, crate::tools
// ============================================================================

//! ## Overview
//! Expects the node's current data to be a raw block and replaces it with the
//! parsed batch. Parse time is booked as the timer `<name>.time.parse`.
//! The `tool` property names the CSV tool (default `csvtool`).

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
use tracing::debug;
use tracing::info;

use crate::tools::CSV_TOOL_CLASS;
use crate::tools::CsvTool;

// ============================================================================
// SECTION: Algorithm
// ============================================================================

/// Registered class name.
pub const CSV_PARSER_CLASS: &str = "csvparser";
/// Timer of one parse.
const PARSE_TIMER: &str = "time.parse";

/// Parses raw CSV blocks.
#[derive(Debug)]
pub struct CsvParserAlgo {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Tool name.
    tool: String,
    /// Blocks parsed.
    blocks: u64,
    /// Rows produced.
    rows: u64,
}

impl CsvParserAlgo {
    /// Creates the algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Property`] for a non-string `tool`.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let tool = properties.str_or("tool", CSV_TOOL_CLASS)?;
        Ok(Self {
            name: name.to_string(),
            properties,
            tool,
            blocks: 0,
            rows: 0,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`CsvParserAlgo::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn Algorithm>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }
}

impl Algorithm for CsvParserAlgo {
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
        ctx.tools().get_as::<CsvTool>(&self.tool)?;
        self.blocks = 0;
        self.rows = 0;
        Ok(())
    }

    fn book(&mut self, ctx: &mut JobContext) -> Result<(), ComponentError> {
        ctx.hbook_mut().book(&self.name, PARSE_TIMER, float_range(0.0, 100.0, 2.0), "ms", true)?;
        Ok(())
    }

    fn execute(&mut self, element: &mut Element, ctx: &mut JobContext) -> Result<(), ComponentError> {
        let raw = element
            .current_raw()
            .cloned()
            .ok_or_else(|| ComponentError::Input(format!("{}: node {} holds no raw block", self.name, element.name())))?;
        let watch = Stopwatch::start();
        let batch = ctx.tools_mut().get_mut_as::<CsvTool>(&self.tool)?.parse(&raw)?;
        ctx.hbook_mut().fill(&self.name, PARSE_TIMER, watch.elapsed_ms())?;
        debug!(algorithm = %self.name, seq = element.seq(), rows = batch.num_rows(), "block parsed");
        self.blocks += 1;
        self.rows += batch.num_rows() as u64;
        element.set(Datum::Batch(batch));
        Ok(())
    }

    fn finalize(&mut self, _ctx: &mut JobContext) -> Result<(), ComponentError> {
        info!(algorithm = %self.name, blocks = self.blocks, rows = self.rows, "csv parsing complete");
        Ok(())
    }
}
