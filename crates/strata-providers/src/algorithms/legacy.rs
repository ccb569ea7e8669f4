// crates/strata-providers/src/algorithms/legacy.rs
// ============================================================================
// Module: Legacy Algorithm
// Description: Fixed-width EBCDIC blocks to Arrow batches.
// Purpose: Decode mainframe records through the legacy tool.
// Dependencies: strata-core, tracing, crate::{fields, tools}
// ============================================================================

//! ## Overview
//! At initialize the legacy tool is given the record layout of the job's
//! fixed-width file handler unless it was configured with its own `fields`.
//! Each raw block is then decoded into a typed batch. Booked timer:
//! `<name>.time.decode`.

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
use strata_core::proto::FieldSpec;
use strata_core::proto::file_handler_config::Kind;
use tracing::info;

use crate::fields::LegacyField;
use crate::tools::LEGACY_TOOL_CLASS;
use crate::tools::LegacyTool;

// ============================================================================
// SECTION: Algorithm
// ============================================================================

/// Registered class name.
pub const LEGACY_CLASS: &str = "legacy";
/// Timer of one decode.
const DECODE_TIMER: &str = "time.decode";

/// Decodes fixed-width blocks.
#[derive(Debug)]
pub struct LegacyAlgo {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Tool name.
    tool: String,
    /// Records decoded.
    records: u64,
}

impl LegacyAlgo {
    /// Creates the algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Property`] for a non-string `tool`.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let tool = properties.str_or("tool", LEGACY_TOOL_CLASS)?;
        Ok(Self {
            name: name.to_string(),
            properties,
            tool,
            records: 0,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`LegacyAlgo::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn Algorithm>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }
}

/// Field layout of the job's fixed-width handler, if it has one.
fn handler_fields(ctx: &JobContext) -> Option<Vec<FieldSpec>> {
    let handler = ctx.config()?.input.as_ref()?.filehandler.as_ref()?;
    match handler.kind.as_ref()? {
        Kind::Legacy(legacy) => Some(legacy.fields.clone()),
        _ => None,
    }
}

impl Algorithm for LegacyAlgo {
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
        let specs = handler_fields(ctx);
        let tool = ctx.tools_mut().get_mut_as::<LegacyTool>(&self.tool)?;
        if !tool.is_configured() {
            let specs = specs.ok_or_else(|| {
                ComponentError::Input(format!("{}: no record layout in tool or file handler", self.name))
            })?;
            let fields = specs.iter().map(LegacyField::from_spec).collect::<Result<Vec<_>, _>>()?;
            tool.configure(fields);
        }
        info!(algorithm = %self.name, fields = tool.fields().len(), "legacy layout ready");
        self.records = 0;
        Ok(())
    }

    fn book(&mut self, ctx: &mut JobContext) -> Result<(), ComponentError> {
        ctx.hbook_mut().book(&self.name, DECODE_TIMER, float_range(0.0, 100.0, 2.0), "ms", true)?;
        Ok(())
    }

    fn execute(&mut self, element: &mut Element, ctx: &mut JobContext) -> Result<(), ComponentError> {
        let raw = element
            .current_raw()
            .ok_or_else(|| ComponentError::Input(format!("{}: node {} holds no raw block", self.name, element.name())))?;
        let watch = Stopwatch::start();
        let batch = ctx.tools().get_as::<LegacyTool>(&self.tool)?.decode(raw)?;
        ctx.hbook_mut().fill(&self.name, DECODE_TIMER, watch.elapsed_ms())?;
        self.records += batch.num_rows() as u64;
        element.set(Datum::Batch(batch));
        Ok(())
    }

    fn finalize(&mut self, _ctx: &mut JobContext) -> Result<(), ComponentError> {
        info!(algorithm = %self.name, records = self.records, "legacy decoding complete");
        Ok(())
    }
}
