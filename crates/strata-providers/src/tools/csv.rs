// crates/strata-providers/src/tools/csv.rs
// ============================================================================
// Module: CSV Tool
// Description: Arrow CSV parsing of raw delimited blocks.
// Purpose: Turn a header-prefixed block into one record batch.
// Dependencies: arrow, strata-core, tracing
// ============================================================================

//! ## Overview
//! Every delimited block arrives with the job's header line prepended, so it
//! parses on its own. The first block parsed fixes the schema: column types
//! are inferred from its rows and reused for every later block, which keeps
//! all output batches of a job schema-compatible.
//!
//! Properties:
//! - `delimiter`: field separator, one byte (default `,`).
//! - `has_header`: the block starts with a header line (default true).
//! - `batch_size`: rows decoded per Arrow read (default 65536).
//! - `infer_rows`: rows inspected for type inference; 0 reads the whole block.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::io::Cursor;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use strata_core::ComponentError;
use strata_core::Properties;
use strata_core::Tool;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Registered class name.
pub const CSV_TOOL_CLASS: &str = "csvtool";
/// Default rows per Arrow read.
const DEFAULT_BATCH_SIZE: u64 = 65_536;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Parses raw CSV blocks into record batches.
#[derive(Debug)]
pub struct CsvTool {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Field separator.
    delimiter: u8,
    /// True when blocks start with a header line.
    has_header: bool,
    /// Rows per Arrow read.
    batch_size: usize,
    /// Rows used for inference; `None` reads everything.
    infer_rows: Option<usize>,
    /// Schema fixed by the first parsed block.
    schema: Option<SchemaRef>,
}

impl CsvTool {
    /// Creates the tool from its properties.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] for a multi-byte delimiter or bad property types.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let delimiter = properties.str_or("delimiter", ",")?;
        let &[delimiter] = delimiter.as_bytes() else {
            return Err(ComponentError::Input(format!("{name}: delimiter must be one byte")));
        };
        let has_header = properties.bool_or("has_header", true)?;
        let batch_size = usize::try_from(properties.u64_or("batch_size", DEFAULT_BATCH_SIZE)?)
            .map_err(|_| ComponentError::Input(format!("{name}: batch_size too large")))?
            .max(1);
        let infer_rows = match properties.u64_or("infer_rows", 0)? {
            0 => None,
            rows => Some(usize::try_from(rows).unwrap_or(usize::MAX)),
        };
        Ok(Self {
            name: name.to_string(),
            properties,
            delimiter,
            has_header,
            batch_size,
            infer_rows,
            schema: None,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`CsvTool::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn Tool>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }

    /// Schema fixed by the first parsed block.
    #[must_use]
    pub const fn schema(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    /// Forgets the fixed schema.
    pub fn reset_schema(&mut self) {
        self.schema = None;
    }

    /// Arrow CSV format of the configured dialect.
    fn format(&self) -> Format {
        Format::default().with_header(self.has_header).with_delimiter(self.delimiter)
    }

    /// Parses one block into a single batch.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Arrow`] when the block does not parse under
    /// the fixed schema.
    pub fn parse(&mut self, block: &[u8]) -> Result<RecordBatch, ComponentError> {
        let schema = match &self.schema {
            Some(schema) => schema.clone(),
            None => {
                let (schema, rows) = self.format().infer_schema(Cursor::new(block), self.infer_rows)?;
                let schema = SchemaRef::new(schema);
                info!(tool = %self.name, columns = schema.fields().len(), rows, "csv schema fixed");
                self.schema = Some(schema.clone());
                schema
            }
        };
        let reader = ReaderBuilder::new(schema.clone())
            .with_format(self.format())
            .with_batch_size(self.batch_size)
            .build(Cursor::new(block))?;
        let mut batches = reader.collect::<Result<Vec<_>, _>>()?;
        debug!(tool = %self.name, batches = batches.len(), bytes = block.len(), "csv block parsed");
        if batches.len() == 1
            && let Some(batch) = batches.pop()
        {
            return Ok(batch);
        }
        Ok(concat_batches(&schema, &batches)?)
    }
}

impl Tool for CsvTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn initialize(&mut self) -> Result<(), ComponentError> {
        self.schema = None;
        info!(tool = %self.name, delimiter = %char::from(self.delimiter), header = self.has_header, "csv tool ready");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
