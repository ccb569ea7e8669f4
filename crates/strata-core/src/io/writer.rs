// crates/strata-core/src/io/writer.rs
// ============================================================================
// Module: Strata Buffered Output Writer
// Description: Size-bounded Arrow IPC file production for one partition.
// Purpose: Accumulate leaf batches in memory and roll files at a byte budget.
// Dependencies: arrow, tracing, crate::{core, proto, runtime, store}
// ============================================================================

//! ## Overview
//! A [`BufferOutputWriter`] keeps one open Arrow IPC file writer over an
//! in-memory buffer. Before each batch it estimates the finished file size:
//! the bytes already buffered, the encoded batch, the footer, and a small
//! framing allowance. When the estimate exceeds the budget and the buffer
//! already holds a batch, the current file is closed and registered first, so
//! only a single batch larger than the budget can produce an oversize file.
//!
//! Every closed file is re-read to validate its batch and row counts, then
//! registered as a partition file together with a table object holding its
//! schema. Batches whose schema differs from the writer's are logged and
//! skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Cursor;

use arrow::csv::WriterBuilder;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::DictionaryTracker;
use arrow::ipc::writer::FileWriter;
use arrow::ipc::writer::IpcDataGenerator;
use arrow::ipc::writer::IpcWriteOptions;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::Properties;
use crate::core::PropertyError;
use crate::proto::FileObjectInfo;
use crate::proto::FileType;
use crate::proto::RecordBatchFileInfo;
use crate::proto::TableObjectInfo;
use crate::proto::cronus_object::Info;
use crate::runtime::JobContext;
use crate::store::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default file budget: 2 GiB.
pub const DEFAULT_BUFFER_MAX_SIZE: u64 = 2 * 1024 * 1024 * 1024;
/// Property key of the file budget.
pub const BUFFER_MAX_SIZE_KEY: &str = "BUFFER_MAX_SIZE";
/// Property key enabling CSV copies.
pub const WRITE_CSV_KEY: &str = "write_csv";
/// Allowance for message framing and padding per batch.
const FRAMING_BYTES: u64 = 64;
/// Footer bytes per recorded block.
const FOOTER_BLOCK_BYTES: u64 = 24;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Writer failures.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Batch schema differs from the writer schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Arrow encoding failed.
    #[error("arrow error: {0}")]
    Arrow(String),
    /// A produced file failed re-read validation.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Store registration failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Writer properties were invalid.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl From<ArrowError> for WriterError {
    fn from(err: ArrowError) -> Self {
        Self::Arrow(err.to_string())
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Writer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// File budget in bytes.
    pub max_size: u64,
    /// Also persist a CSV copy of each file.
    pub write_csv: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_BUFFER_MAX_SIZE,
            write_csv: false,
        }
    }
}

impl WriterConfig {
    /// Reads options from tool properties.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::TypeMismatch`] for mistyped values.
    pub fn from_properties(props: &Properties) -> Result<Self, PropertyError> {
        Ok(Self {
            max_size: props.u64_or(BUFFER_MAX_SIZE_KEY, DEFAULT_BUFFER_MAX_SIZE)?,
            write_csv: props.bool_or(WRITE_CSV_KEY, false)?,
        })
    }
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Size-bounded IPC writer for one partition.
pub struct BufferOutputWriter {
    /// Writer name.
    name: String,
    /// Output partition.
    partition: String,
    /// Options.
    config: WriterConfig,
    /// Schema fixed by the first batch.
    schema: Option<SchemaRef>,
    /// Open writer over the in-memory buffer.
    writer: Option<FileWriter<Vec<u8>>>,
    /// Footer bytes of an empty file for this schema.
    footer_base: u64,
    /// Batches in the open file.
    nbatches: u64,
    /// Rows in the open file.
    nrows: u64,
    /// Files closed so far.
    file_counter: u64,
    /// Summaries of the closed files.
    files: Vec<RecordBatchFileInfo>,
    /// Rows over all files.
    total_records: u64,
    /// Batches over all files.
    total_batches: u64,
}

impl std::fmt::Debug for BufferOutputWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferOutputWriter")
            .field("name", &self.name)
            .field("partition", &self.partition)
            .field("config", &self.config)
            .field("nbatches", &self.nbatches)
            .field("file_counter", &self.file_counter)
            .finish_non_exhaustive()
    }
}

impl BufferOutputWriter {
    /// Creates a writer for `partition`.
    #[must_use]
    pub fn new(partition: &str, config: WriterConfig) -> Self {
        Self {
            name: format!("writer_{partition}"),
            partition: partition.to_string(),
            config,
            schema: None,
            writer: None,
            footer_base: 0,
            nbatches: 0,
            nrows: 0,
            file_counter: 0,
            files: Vec::new(),
            total_records: 0,
            total_batches: 0,
        }
    }

    /// Writer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output partition.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Files closed so far.
    #[must_use]
    pub const fn file_counter(&self) -> u64 {
        self.file_counter
    }

    /// Summaries of the closed files.
    #[must_use]
    pub fn files(&self) -> &[RecordBatchFileInfo] {
        &self.files
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn buffered_bytes(&self) -> u64 {
        self.writer.as_ref().map_or(0, |w| w.get_ref().len() as u64)
    }

    /// Rows written over all files, including the open one.
    #[must_use]
    pub const fn total_records(&self) -> u64 {
        self.total_records + self.nrows
    }

    /// Appends a batch, rolling to a new file when the budget would be exceeded.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError`] when encoding or persisting a full file fails.
    pub fn write(&mut self, batch: &RecordBatch, ctx: &mut JobContext) -> Result<(), WriterError> {
        if let Err(err) = self.check_schema(batch) {
            warn!(writer = %self.name, partition = %self.partition, error = %err, "skipping batch");
            return Ok(());
        }
        let encoded = encoded_size(batch)?;
        let expected = self.buffered_bytes()
            + encoded
            + self.footer_base
            + FOOTER_BLOCK_BYTES * (self.nbatches + 1)
            + FRAMING_BYTES;
        if expected > self.config.max_size && self.nbatches > 0 {
            debug!(writer = %self.name, expected, budget = self.config.max_size, "rolling output file");
            self.finalize_file(ctx)?;
        }
        if self.writer.is_none() {
            self.open_writer()?;
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write(batch)?;
        }
        self.nbatches += 1;
        self.nrows += batch.num_rows() as u64;
        Ok(())
    }

    /// Closes and registers the open file, if it holds any batch.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError`] when the file cannot be persisted or validated.
    pub fn finalize(&mut self, ctx: &mut JobContext) -> Result<&[RecordBatchFileInfo], WriterError> {
        self.finalize_file(ctx)?;
        info!(
            writer = %self.name,
            partition = %self.partition,
            total_files = self.file_counter,
            total_batches = self.total_batches,
            total_records = self.total_records,
            "writer finalized"
        );
        Ok(&self.files)
    }

    /// Fixes the schema on the first batch and rejects later mismatches.
    fn check_schema(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        match &self.schema {
            Some(schema) if **schema == *batch.schema() => Ok(()),
            Some(schema) => Err(WriterError::SchemaMismatch(format!(
                "expected [{}], found [{}]",
                field_names(schema).join(", "),
                field_names(&batch.schema()).join(", ")
            ))),
            None => {
                let schema = batch.schema();
                self.footer_base = footer_overhead(&schema)?;
                self.schema = Some(schema);
                Ok(())
            }
        }
    }

    /// Opens a fresh in-memory file.
    fn open_writer(&mut self) -> Result<(), WriterError> {
        let schema =
            self.schema.clone().ok_or_else(|| WriterError::SchemaMismatch("no schema fixed".to_string()))?;
        self.writer = Some(FileWriter::try_new(Vec::new(), &schema)?);
        self.nbatches = 0;
        self.nrows = 0;
        Ok(())
    }

    /// Closes the open file and registers it with its table.
    fn finalize_file(&mut self, ctx: &mut JobContext) -> Result<(), WriterError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        if self.nbatches == 0 {
            return Ok(());
        }
        writer.finish()?;
        let bytes = writer.into_inner()?;
        let schema =
            self.schema.clone().ok_or_else(|| WriterError::SchemaMismatch("no schema fixed".to_string()))?;
        let columns = field_names(&schema);
        let file_info = FileObjectInfo {
            size_bytes: bytes.len() as u64,
            description: format!("{} file {}", self.name, self.file_counter),
            columns: columns.clone(),
            ..FileObjectInfo::of_type(FileType::Arrow)
        };
        let file = ctx.register_content(&bytes, Info::File(file_info), Some(&self.partition))?;

        let batches = read_back(&bytes)?;
        let rows: u64 = batches.iter().map(|b| b.num_rows() as u64).sum();
        if batches.len() as u64 != self.nbatches || rows != self.nrows {
            return Err(WriterError::Validation(format!(
                "{}: wrote {} batches / {} rows, read {} / {}",
                file.name,
                self.nbatches,
                self.nrows,
                batches.len(),
                rows
            )));
        }
        let table = TableObjectInfo {
            file_uuid: file.uuid.clone(),
            num_rows: rows,
            num_batches: self.nbatches,
            num_columns: columns.len() as u64,
            columns,
        };
        ctx.register_table(table, &schema_bytes(&schema)?, &self.partition, &file.uuid)?;
        if self.config.write_csv {
            let csv = render_csv(&batches)?;
            let csv_info = FileObjectInfo {
                size_bytes: csv.len() as u64,
                description: format!("csv copy of {}", file.name),
                ..FileObjectInfo::of_type(FileType::Csv)
            };
            ctx.register_content(&csv, Info::File(csv_info), Some(&self.partition))?;
        }

        info!(
            writer = %self.name,
            partition = %self.partition,
            file = %file.name,
            bytes = bytes.len(),
            batches = self.nbatches,
            rows,
            "output file closed"
        );
        self.files.push(RecordBatchFileInfo {
            name: file.name,
            num_rows: rows,
            num_batches: self.nbatches,
            num_columns: schema.fields().len() as u64,
        });
        self.total_records += rows;
        self.total_batches += self.nbatches;
        self.file_counter += 1;
        self.nbatches = 0;
        self.nrows = 0;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Field names of a schema.
fn field_names(schema: &SchemaRef) -> Vec<String> {
    schema.fields().iter().map(|f| f.name().clone()).collect()
}

/// Rounds up to the IPC alignment.
const fn pad8(len: usize) -> u64 {
    (len as u64).div_ceil(8) * 8
}

/// Encoded IPC size of a batch, including dictionaries.
fn encoded_size(batch: &RecordBatch) -> Result<u64, WriterError> {
    let generator = IpcDataGenerator::default();
    let mut tracker = DictionaryTracker::new(false);
    let (dictionaries, encoded) = generator.encoded_batch(batch, &mut tracker, &IpcWriteOptions::default())?;
    Ok(dictionaries
        .iter()
        .chain(std::iter::once(&encoded))
        .map(|data| 8 + pad8(data.ipc_message.len()) + pad8(data.arrow_data.len()))
        .sum())
}

/// Bytes an empty file adds when finished, beyond its leading schema.
fn footer_overhead(schema: &SchemaRef) -> Result<u64, WriterError> {
    let mut probe = FileWriter::try_new(Vec::new(), schema)?;
    let initial = probe.get_ref().len() as u64;
    probe.finish()?;
    Ok((probe.get_ref().len() as u64).saturating_sub(initial))
}

/// IPC stream encoding of a schema with no batches.
fn schema_bytes(schema: &SchemaRef) -> Result<Vec<u8>, WriterError> {
    let mut writer = StreamWriter::try_new(Vec::new(), schema)?;
    writer.finish()?;
    Ok(writer.into_inner()?)
}

/// Decodes every batch of an in-memory IPC file.
fn read_back(bytes: &[u8]) -> Result<Vec<RecordBatch>, WriterError> {
    let reader = FileReader::try_new(Cursor::new(bytes), None)?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

/// Renders batches as CSV with a header row.
fn render_csv(batches: &[RecordBatch]) -> Result<Vec<u8>, WriterError> {
    let mut writer = WriterBuilder::new().with_header(true).build(Vec::new());
    for batch in batches {
        writer.write(batch)?;
    }
    Ok(writer.into_inner())
}
