// crates/strata-providers/src/tools/legacy.rs
// ============================================================================
// Module: Legacy Tool
// Description: Decoding of fixed-width EBCDIC records into Arrow batches.
// Purpose: Convert mainframe blocks into typed columns.
// Dependencies: arrow, strata-core, tracing
// ============================================================================

//! ## Overview
//! A block is a whole number of records. Each record is split by the field
//! widths of the layout; every field is translated from code page 500 and
//! then converted by its unit type: overpunched `int` fields become `Int64`,
//! `uint` fields `UInt64`, and `str` fields trimmed `Utf8`.
//!
//! Properties:
//! - `fields`: layout entries `name:length:utype`; when absent the layout is
//!   taken from the job's fixed-width file handler at initialize.
//! - `encoding`: only `cp500` is supported (default).
//! - `swap_lf`: exchange EBCDIC NEL and LF while decoding (default false).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::array::Int64Builder;
use arrow::array::StringBuilder;
use arrow::array::UInt64Builder;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use strata_core::ComponentError;
use strata_core::Properties;
use strata_core::Tool;
use tracing::info;

use crate::ebcdic::Cp500;
use crate::ebcdic::decode_signed;
use crate::ebcdic::decode_unsigned;
use crate::fields::FieldKind;
use crate::fields::LegacyField;
use crate::fields::arrow_schema;
use crate::fields::parse_fields;
use crate::fields::record_size;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Registered class name.
pub const LEGACY_TOOL_CLASS: &str = "legacytool";

/// Column under construction.
enum ColumnBuilder {
    /// Signed integers.
    Int(Int64Builder),
    /// Unsigned integers.
    Uint(UInt64Builder),
    /// Text.
    Str(StringBuilder),
}

impl ColumnBuilder {
    /// Builder for a field kind with room for `rows` values.
    fn for_kind(kind: FieldKind, rows: usize) -> Self {
        match kind {
            FieldKind::Int => Self::Int(Int64Builder::with_capacity(rows)),
            FieldKind::Uint => Self::Uint(UInt64Builder::with_capacity(rows)),
            FieldKind::Str => Self::Str(StringBuilder::with_capacity(rows, rows * 8)),
        }
    }

    /// Converts and appends one decoded field.
    fn append(&mut self, text: &str) -> Result<(), ComponentError> {
        match self {
            Self::Int(builder) => builder.append_value(decode_signed(text)?),
            Self::Uint(builder) => builder.append_value(decode_unsigned(text)?),
            Self::Str(builder) => builder.append_value(text.trim()),
        }
        Ok(())
    }

    /// Finishes the column.
    fn finish(self) -> ArrayRef {
        match self {
            Self::Int(mut builder) => Arc::new(builder.finish()),
            Self::Uint(mut builder) => Arc::new(builder.finish()),
            Self::Str(mut builder) => Arc::new(builder.finish()),
        }
    }
}

/// Decodes fixed-width EBCDIC blocks.
#[derive(Debug)]
pub struct LegacyTool {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Record layout.
    fields: Vec<LegacyField>,
    /// Output schema of the layout.
    schema: SchemaRef,
    /// Code page.
    codec: Cp500,
}

impl LegacyTool {
    /// Creates the tool from its properties.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] for an unsupported encoding or a malformed layout.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let encoding = properties.str_or("encoding", "cp500")?;
        if encoding != "cp500" {
            return Err(ComponentError::Input(format!("{name}: unsupported encoding {encoding}")));
        }
        let fields = parse_fields(&properties.list_or_empty("fields")?)?;
        let codec = Cp500::new(properties.bool_or("swap_lf", false)?);
        Ok(Self {
            name: name.to_string(),
            properties,
            schema: arrow_schema(&fields),
            fields,
            codec,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`LegacyTool::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn Tool>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }

    /// True once a layout is known.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Record layout.
    #[must_use]
    pub fn fields(&self) -> &[LegacyField] {
        &self.fields
    }

    /// Output schema.
    #[must_use]
    pub const fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Installs a layout.
    pub fn configure(&mut self, fields: Vec<LegacyField>) {
        self.schema = arrow_schema(&fields);
        self.fields = fields;
    }

    /// Decodes one block of whole records.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Input`] when no layout is configured, the
    /// block holds a partial record, or a field does not decode.
    pub fn decode(&self, block: &[u8]) -> Result<RecordBatch, ComponentError> {
        let width = record_size(&self.fields);
        if width == 0 {
            return Err(ComponentError::Input(format!("{}: no record layout configured", self.name)));
        }
        if block.len() % width != 0 {
            return Err(ComponentError::Input(format!(
                "{}: {} bytes is not a whole number of {width}-byte records",
                self.name,
                block.len()
            )));
        }
        let rows = block.len() / width;
        let mut builders: Vec<ColumnBuilder> =
            self.fields.iter().map(|f| ColumnBuilder::for_kind(f.kind, rows)).collect();
        for (row, record) in block.chunks_exact(width).enumerate() {
            let mut pos = 0;
            for (field, builder) in self.fields.iter().zip(builders.iter_mut()) {
                let text = self.codec.decode(&record[pos .. pos + field.length]);
                builder.append(&text).map_err(|err| {
                    ComponentError::Input(format!("{}: row {row} field {}: {err}", self.name, field.name))
                })?;
                pos += field.length;
            }
        }
        let columns = builders.into_iter().map(ColumnBuilder::finish).collect();
        Ok(RecordBatch::try_new(self.schema.clone(), columns)?)
    }
}

impl Tool for LegacyTool {
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
        info!(tool = %self.name, fields = self.fields.len(), record_size = record_size(&self.fields), "legacy tool ready");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
