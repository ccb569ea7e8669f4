// crates/strata-core/src/io/reader.rs
// ============================================================================
// Module: Strata Block Readers
// Description: Per-format input preparation and block iteration.
// Purpose: Turn an input into a header, schema, and lazily read blocks.
// Dependencies: arrow, bytes, rand, crate::{interfaces, io, proto, runtime}
// ============================================================================

//! ## Overview
//! [`FileHandler::prepare`] opens one input and establishes its size,
//! header, column names, and block list. The first prepared input of a job
//! fixes the header, header offset, and columns; every later input must match
//! them or preparation fails with [`ReaderError::HeaderInvalid`].
//!
//! Delimited and fixed-width inputs yield raw blocks. Delimited blocks are
//! prefixed with a synthetic header line so each one parses on its own. Arrow
//! IPC and SAS7BDAT inputs yield decoded batches. [`PreparedInput::sample`]
//! draws blocks uniformly without replacement and leaves the sequential
//! position untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use arrow::ipc::reader::FileReader;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::reader::read_footer_length;
use arrow::ipc::root_as_footer;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use bytes::BytesMut;
use rand::rngs::StdRng;
use tracing::debug;

use super::ReaderError;
use super::filehandler::delimited_blocks;
use super::filehandler::fixed_width_blocks;
use super::filehandler::seek_delimiter;
use super::sas7bdat;
use super::sas7bdat::SasLayout;
use crate::interfaces::InputDatum;
use crate::metrics::Stopwatch;
use crate::proto::FileHandlerConfig;
use crate::proto::FileType;
use crate::proto::file_handler_config::Kind;
use crate::runtime::Datum;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default delimited block size in bytes.
pub const DEFAULT_BLOCKSIZE: u64 = 1 << 27;
/// Default line delimiter.
pub const DEFAULT_DELIMITER: &str = "\r\n";
/// Default field separator.
pub const DEFAULT_SEPARATOR: &str = ",";
/// Default fixed-width records per block.
pub const DEFAULT_RECORDS_PER_BLOCK: u64 = 4095;
/// Default SAS rows per batch.
pub const DEFAULT_SAS_ROWS: u64 = 10_000;

// ============================================================================
// SECTION: Streams
// ============================================================================

/// Seekable byte source.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Structure of one prepared input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    /// Input format.
    pub file_type: FileType,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Header bytes as found in the input.
    pub header: Bytes,
    /// Offset of the first payload byte.
    pub header_end: u64,
    /// Bytes covered by the blocks.
    pub payload_bytes: u64,
    /// Column names.
    pub columns: Vec<String>,
    /// Blocks as `(offset, length)`.
    pub blocks: Vec<(u64, u64)>,
}

/// One block read from an input.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Sequence id within the input.
    pub seq: u64,
    /// Byte offset.
    pub offset: u64,
    /// Byte length.
    pub length: u64,
    /// Block contents.
    pub datum: Datum,
}

/// Format-specific block access.
pub trait BlockReader {
    /// Structure of the input.
    fn layout(&self) -> &BlockLayout;

    /// Reads block `index`. Sequential reads verify the stream position
    /// instead of seeking.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError`] when the block cannot be read.
    fn read_block(&mut self, index: usize, sequential: bool) -> Result<Datum, ReaderError>;

    /// Positions the stream at the start of block `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Io`] when seeking fails.
    fn position_at(&mut self, _index: usize) -> Result<(), ReaderError> {
        Ok(())
    }
}

/// Time spent preparing an input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrepareTimings {
    /// Header and schema discovery, in milliseconds.
    pub schema_ms: f64,
    /// Block layout computation, in milliseconds.
    pub blocks_ms: f64,
}

// ============================================================================
// SECTION: Prepared Input
// ============================================================================

/// An input ready for block iteration.
pub struct PreparedInput {
    /// Display name.
    name: String,
    /// Format reader.
    reader: Box<dyn BlockReader>,
    /// Next sequential block.
    cursor: usize,
    /// Preparation timings.
    timings: PrepareTimings,
}

impl std::fmt::Debug for PreparedInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedInput")
            .field("name", &self.name)
            .field("layout", self.reader.layout())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl PreparedInput {
    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structure of the input.
    #[must_use]
    pub fn layout(&self) -> &BlockLayout {
        self.reader.layout()
    }

    /// Number of blocks.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.reader.layout().blocks.len()
    }

    /// Preparation timings.
    #[must_use]
    pub const fn timings(&self) -> PrepareTimings {
        self.timings
    }

    /// Reads the next block in order.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError`] when the block cannot be read or the stream is
    /// not where the previous block ended.
    pub fn next_block(&mut self) -> Result<Option<Block>, ReaderError> {
        let Some(&(offset, length)) = self.reader.layout().blocks.get(self.cursor) else {
            return Ok(None);
        };
        let datum = self.reader.read_block(self.cursor, true)?;
        let block = Block {
            seq: self.cursor as u64,
            offset,
            length,
            datum,
        };
        self.cursor += 1;
        Ok(Some(block))
    }

    /// Draws up to `n` blocks uniformly without replacement.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError`] when a block cannot be read.
    pub fn sample(&mut self, n: usize, rng: &mut StdRng) -> Result<Vec<Block>, ReaderError> {
        let total = self.num_blocks();
        let picks = rand::seq::index::sample(rng, total, n.min(total)).into_vec();
        let mut out = Vec::with_capacity(picks.len());
        for index in picks {
            let (offset, length) = self.reader.layout().blocks[index];
            let datum = self.reader.read_block(index, false)?;
            out.push(Block {
                seq: index as u64,
                offset,
                length,
                datum,
            });
        }
        self.reader.position_at(self.cursor)?;
        Ok(out)
    }
}

// ============================================================================
// SECTION: Handler Configuration
// ============================================================================

/// Delimited input options with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Minimum block size in bytes.
    pub blocksize: u64,
    /// Line delimiter.
    pub delimiter: Vec<u8>,
    /// Field separator.
    pub separator: String,
    /// Header rows; the first one names the columns.
    pub header_rows: u32,
    /// Optional user column names.
    pub schema: Vec<String>,
}

/// Fixed-width input options with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyOptions {
    /// Header bytes.
    pub header_size: u64,
    /// Footer bytes.
    pub footer_size: u64,
    /// Records per block.
    pub records_per_block: u64,
    /// Column names.
    pub columns: Vec<String>,
    /// Record width in bytes.
    pub record_size: u64,
}

/// Input format and its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    /// Delimited text.
    Csv(CsvOptions),
    /// Fixed-width records.
    Legacy(LegacyOptions),
    /// Arrow IPC file or stream.
    Ipc {
        /// True for the streaming format.
        stream: bool,
    },
    /// SAS7BDAT.
    Sas {
        /// Rows per decoded batch.
        rows_per_batch: u64,
    },
}

impl HandlerKind {
    /// Resolves a configuration message, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Format`] when no format is configured or a
    /// fixed-width schema has zero width.
    pub fn from_config(config: &FileHandlerConfig) -> Result<Self, ReaderError> {
        match config.kind.as_ref() {
            None => Err(ReaderError::Format("no file handler configured".to_string())),
            Some(Kind::Csv(csv)) => Ok(Self::Csv(CsvOptions {
                blocksize: if csv.blocksize == 0 { DEFAULT_BLOCKSIZE } else { csv.blocksize },
                delimiter: non_empty(&csv.delimiter, DEFAULT_DELIMITER).into_bytes(),
                separator: non_empty(&csv.separator, DEFAULT_SEPARATOR),
                header_rows: csv.header_rows,
                schema: csv.schema.clone(),
            })),
            Some(Kind::Legacy(legacy)) => {
                let record_size: u64 = legacy.fields.iter().map(|f| u64::from(f.length)).sum();
                if record_size == 0 {
                    return Err(ReaderError::Format("fixed-width schema has zero width".to_string()));
                }
                Ok(Self::Legacy(LegacyOptions {
                    header_size: legacy.header_size,
                    footer_size: legacy.footer_size,
                    records_per_block: if legacy.records_per_block == 0 {
                        DEFAULT_RECORDS_PER_BLOCK
                    } else {
                        legacy.records_per_block
                    },
                    columns: legacy.fields.iter().map(|f| f.name.clone()).collect(),
                    record_size,
                }))
            }
            Some(Kind::Ipc(ipc)) => Ok(Self::Ipc {
                stream: ipc.stream,
            }),
            Some(Kind::Sas(sas)) => Ok(Self::Sas {
                rows_per_batch: if sas.rows_per_batch == 0 { DEFAULT_SAS_ROWS } else { sas.rows_per_batch },
            }),
        }
    }

    /// File type recorded for inputs of this format.
    #[must_use]
    pub const fn file_type(&self) -> FileType {
        match self {
            Self::Csv(_) => FileType::Csv,
            Self::Legacy(_) => FileType::Legacy,
            Self::Ipc {
                stream: false,
            } => FileType::Arrow,
            Self::Ipc {
                stream: true,
            } => FileType::ArrowStream,
            Self::Sas {
                ..
            } => FileType::Sas7bdat,
        }
    }
}

/// Returns `value`, or `default` when empty.
fn non_empty(value: &str, default: &str) -> String {
    if value.is_empty() { default.to_string() } else { value.to_string() }
}

// ============================================================================
// SECTION: File Handler
// ============================================================================

/// Header state shared by every input of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderCache {
    /// Header bytes.
    header: Bytes,
    /// Header offset.
    header_end: u64,
    /// Column names.
    columns: Vec<String>,
}

/// Prepares inputs of one format and enforces a consistent header.
#[derive(Debug, Clone)]
pub struct FileHandler {
    /// Format and options.
    kind: HandlerKind,
    /// Header of the first prepared input.
    cache: Option<HeaderCache>,
}

impl FileHandler {
    /// Creates a handler from its configuration.
    ///
    /// # Errors
    ///
    /// See [`HandlerKind::from_config`].
    pub fn new(config: &FileHandlerConfig) -> Result<Self, ReaderError> {
        Ok(Self::with_kind(HandlerKind::from_config(config)?))
    }

    /// Creates a handler from resolved options.
    #[must_use]
    pub const fn with_kind(kind: HandlerKind) -> Self {
        Self {
            kind,
            cache: None,
        }
    }

    /// Input format.
    #[must_use]
    pub const fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    /// File type of prepared inputs.
    #[must_use]
    pub const fn file_type(&self) -> FileType {
        self.kind.file_type()
    }

    /// Columns fixed by the first prepared input.
    #[must_use]
    pub fn cached_columns(&self) -> Option<&[String]> {
        self.cache.as_ref().map(|c| c.columns.as_slice())
    }

    /// Prepares an input datum.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError`] when the input cannot be opened or parsed, or
    /// its header disagrees with the job's first input.
    pub fn prepare(&mut self, datum: &InputDatum) -> Result<PreparedInput, ReaderError> {
        match datum {
            InputDatum::Bytes {
                name,
                data,
            } => self.prepare_stream(name, Box::new(Cursor::new(data.clone()))),
            InputDatum::Path(path) => {
                let file = File::open(path)?;
                self.prepare_stream(&path.display().to_string(), Box::new(file))
            }
        }
    }

    /// Prepares an already open stream.
    ///
    /// # Errors
    ///
    /// See [`FileHandler::prepare`].
    pub fn prepare_stream(&mut self, name: &str, mut stream: Box<dyn ReadSeek>) -> Result<PreparedInput, ReaderError> {
        let schema_clock = Stopwatch::start();
        let size = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;
        let kind = self.kind.clone();
        let (reader, blocks_ms): (Box<dyn BlockReader>, f64) = match &kind {
            HandlerKind::Csv(opts) => {
                let (header, header_end, columns) = csv_header(stream.as_mut(), size, opts)?;
                self.check_header(size, &header, header_end, &columns)?;
                let block_clock = Stopwatch::start();
                let blocks = delimited_blocks(&mut stream, header_end, size, opts.blocksize, &opts.delimiter)?;
                let blocks_ms = block_clock.elapsed_ms();
                let mut synthetic = columns.join(&opts.separator).into_bytes();
                synthetic.extend_from_slice(&opts.delimiter);
                let layout = BlockLayout {
                    file_type: FileType::Csv,
                    size_bytes: size,
                    header,
                    header_end,
                    payload_bytes: size - header_end,
                    columns,
                    blocks,
                };
                (Box::new(RawBlockReader::new(stream, layout, Bytes::from(synthetic))?), blocks_ms)
            }
            HandlerKind::Legacy(opts) => {
                if size > 0 && size < opts.header_size + opts.footer_size {
                    return Err(ReaderError::Format(format!(
                        "{name}: {size} bytes cannot hold header {} and footer {}",
                        opts.header_size, opts.footer_size
                    )));
                }
                let header_end = opts.header_size.min(size);
                let header = read_range(&mut stream, 0, header_end)?;
                self.check_header(size, &header, header_end, &opts.columns)?;
                let block_clock = Stopwatch::start();
                let blocks = if size == 0 {
                    Vec::new()
                } else {
                    fixed_width_blocks(size, opts.header_size, opts.footer_size, opts.record_size, opts.records_per_block)
                        .ok_or_else(|| {
                            ReaderError::Format(format!(
                                "{name}: payload is not a whole number of {}-byte records",
                                opts.record_size
                            ))
                        })?
                };
                let blocks_ms = block_clock.elapsed_ms();
                let layout = BlockLayout {
                    file_type: FileType::Legacy,
                    size_bytes: size,
                    header,
                    header_end,
                    payload_bytes: blocks.iter().map(|b| b.1).sum(),
                    columns: opts.columns.clone(),
                    blocks,
                };
                (Box::new(RawBlockReader::new(stream, layout, Bytes::new())?), blocks_ms)
            }
            HandlerKind::Ipc {
                stream: false,
            } => {
                let reader = IpcFileBlockReader::open(stream, size)?;
                let layout = reader.layout();
                self.check_header(size, &layout.header, layout.header_end, &layout.columns)?;
                (Box::new(reader), 0.0)
            }
            HandlerKind::Ipc {
                stream: true,
            } => {
                let reader = IpcStreamBlockReader::open(stream, size)?;
                let layout = reader.layout();
                self.check_header(size, &layout.header, layout.header_end, &layout.columns)?;
                (Box::new(reader), 0.0)
            }
            HandlerKind::Sas {
                rows_per_batch,
            } => {
                let reader = SasBlockReader::open(stream, size, *rows_per_batch)?;
                let layout = reader.layout();
                self.check_header(size, &layout.header, layout.header_end, &layout.columns)?;
                (Box::new(reader), 0.0)
            }
        };
        let total_ms = schema_clock.elapsed_ms();
        let layout = reader.layout();
        debug!(
            file = name,
            size = layout.size_bytes,
            blocks = layout.blocks.len(),
            columns = layout.columns.len(),
            "prepared input"
        );
        Ok(PreparedInput {
            name: name.to_string(),
            reader,
            cursor: 0,
            timings: PrepareTimings {
                schema_ms: (total_ms - blocks_ms).max(0.0),
                blocks_ms,
            },
        })
    }

    /// Caches the first header and validates later ones; empty inputs are skipped.
    fn check_header(
        &mut self,
        size: u64,
        header: &Bytes,
        header_end: u64,
        columns: &[String],
    ) -> Result<(), ReaderError> {
        if size == 0 {
            return Ok(());
        }
        let seen = HeaderCache {
            header: header.clone(),
            header_end,
            columns: columns.to_vec(),
        };
        match &self.cache {
            None => {
                self.cache = Some(seen);
                Ok(())
            }
            Some(cached) if *cached == seen => Ok(()),
            Some(cached) => Err(ReaderError::HeaderInvalid(format!(
                "expected {} columns [{}] at offset {}, found {} columns [{}] at offset {}",
                cached.columns.len(),
                cached.columns.join(", "),
                cached.header_end,
                columns.len(),
                columns.join(", "),
                header_end
            ))),
        }
    }
}

// ============================================================================
// SECTION: Delimited Header
// ============================================================================

/// Reads the header rows and derives the column names.
fn csv_header(
    stream: &mut dyn ReadSeek,
    size: u64,
    opts: &CsvOptions,
) -> Result<(Bytes, u64, Vec<String>), ReaderError> {
    if size == 0 {
        return Ok((Bytes::new(), 0, opts.schema.clone()));
    }
    let first_end = seek_delimiter(stream, 0, size, &opts.delimiter)?;
    let mut header_end = 0;
    for _ in 0 .. opts.header_rows {
        header_end = seek_delimiter(stream, header_end, size, &opts.delimiter)?;
    }
    let first_line = read_range(stream, 0, first_end)?;
    let text = String::from_utf8_lossy(first_line.strip_suffix(opts.delimiter.as_slice()).unwrap_or(&first_line[..]));
    let fields: Vec<String> = text
        .split(opts.separator.as_str())
        .map(|f| f.trim().trim_matches('"').to_string())
        .collect();
    if !opts.schema.is_empty() && opts.schema.len() != fields.len() {
        return Err(ReaderError::SchemaMismatch(format!(
            "user schema has {} columns, input has {}",
            opts.schema.len(),
            fields.len()
        )));
    }
    let columns = if !opts.schema.is_empty() {
        opts.schema.clone()
    } else if opts.header_rows == 0 {
        (0 .. fields.len()).map(|i| format!("f{i}")).collect()
    } else {
        fields
    };
    let header = read_range(stream, 0, header_end)?;
    Ok((header, header_end, columns))
}

/// Reads `[start, end)` from a stream.
fn read_range<R: Read + Seek + ?Sized>(stream: &mut R, start: u64, end: u64) -> Result<Bytes, ReaderError> {
    let len = usize::try_from(end.saturating_sub(start))
        .map_err(|_| ReaderError::Format(format!("range {start}..{end} too large")))?;
    let mut buf = vec![0_u8; len];
    stream.seek(SeekFrom::Start(start))?;
    stream.read_exact(&mut buf)?;
    Ok(Bytes::from(buf))
}

// ============================================================================
// SECTION: Raw Blocks
// ============================================================================

/// Byte-range blocks from delimited or fixed-width inputs.
struct RawBlockReader {
    /// Input stream.
    stream: Box<dyn ReadSeek>,
    /// Input structure.
    layout: BlockLayout,
    /// Bytes prepended to every block.
    prefix: Bytes,
}

impl RawBlockReader {
    /// Wraps a stream and positions it at the first block.
    fn new(mut stream: Box<dyn ReadSeek>, layout: BlockLayout, prefix: Bytes) -> Result<Self, ReaderError> {
        stream.seek(SeekFrom::Start(layout.header_end))?;
        Ok(Self {
            stream,
            layout,
            prefix,
        })
    }
}

impl BlockReader for RawBlockReader {
    fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    fn read_block(&mut self, index: usize, sequential: bool) -> Result<Datum, ReaderError> {
        let (offset, length) = *self
            .layout
            .blocks
            .get(index)
            .ok_or_else(|| ReaderError::Format(format!("block {index} out of range")))?;
        if sequential {
            let pos = self.stream.stream_position()?;
            if pos != offset {
                return Err(ReaderError::Io(format!("stream at {pos}, block {index} starts at {offset}")));
            }
        } else {
            self.stream.seek(SeekFrom::Start(offset))?;
        }
        let len = usize::try_from(length).map_err(|_| ReaderError::Format(format!("block {index} too large")))?;
        let mut buf = BytesMut::with_capacity(self.prefix.len() + len);
        buf.extend_from_slice(&self.prefix);
        buf.resize(self.prefix.len() + len, 0);
        self.stream.read_exact(&mut buf[self.prefix.len() ..])?;
        Ok(Datum::Raw(buf.freeze()))
    }

    fn position_at(&mut self, index: usize) -> Result<(), ReaderError> {
        let offset = self.layout.blocks.get(index).map_or(self.layout.size_bytes, |b| b.0);
        self.stream.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Arrow IPC
// ============================================================================

/// Record batches of an Arrow IPC file, located through its footer.
struct IpcFileBlockReader {
    /// Random-access reader.
    reader: FileReader<Box<dyn ReadSeek>>,
    /// Input structure.
    layout: BlockLayout,
}

impl IpcFileBlockReader {
    /// Reads the footer block table, then opens the file reader.
    fn open(mut stream: Box<dyn ReadSeek>, size: u64) -> Result<Self, ReaderError> {
        let mut trailer = [0_u8; 10];
        stream.seek(SeekFrom::End(-10))?;
        stream.read_exact(&mut trailer)?;
        let footer_len = read_footer_length(trailer)?;
        let footer_start = size
            .checked_sub(10 + footer_len as u64)
            .ok_or_else(|| ReaderError::Format("ipc footer larger than file".to_string()))?;
        let footer_bytes = read_range(&mut stream, footer_start, size - 10)?;
        let footer =
            root_as_footer(&footer_bytes).map_err(|err| ReaderError::Format(format!("ipc footer: {err}")))?;
        let mut blocks = Vec::new();
        if let Some(batches) = footer.recordBatches() {
            for block in batches.iter() {
                let offset = u64::try_from(block.offset())
                    .map_err(|_| ReaderError::Format("negative ipc block offset".to_string()))?;
                let meta = u64::try_from(block.metaDataLength())
                    .map_err(|_| ReaderError::Format("negative ipc metadata length".to_string()))?;
                let body = u64::try_from(block.bodyLength())
                    .map_err(|_| ReaderError::Format("negative ipc body length".to_string()))?;
                blocks.push((offset, meta + body));
            }
        }
        let header_end = blocks.first().map_or(footer_start, |b| b.0);
        let header = read_range(&mut stream, 0, header_end)?;
        stream.seek(SeekFrom::Start(0))?;
        let reader = FileReader::try_new(stream, None)?;
        let columns = reader.schema().fields().iter().map(|f| f.name().clone()).collect();
        let layout = BlockLayout {
            file_type: FileType::Arrow,
            size_bytes: size,
            header,
            header_end,
            payload_bytes: blocks.iter().map(|b| b.1).sum(),
            columns,
            blocks,
        };
        Ok(Self {
            reader,
            layout,
        })
    }
}

impl BlockReader for IpcFileBlockReader {
    fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    fn read_block(&mut self, index: usize, _sequential: bool) -> Result<Datum, ReaderError> {
        self.reader.set_index(index)?;
        match self.reader.next() {
            Some(batch) => Ok(Datum::Batch(batch?)),
            None => Err(ReaderError::Format(format!("ipc batch {index} missing"))),
        }
    }
}

/// Record batches of an Arrow IPC stream, decoded up front.
struct IpcStreamBlockReader {
    /// Decoded batches.
    batches: Vec<RecordBatch>,
    /// Input structure; block lengths are in-memory batch sizes.
    layout: BlockLayout,
}

impl IpcStreamBlockReader {
    /// Decodes every batch of the stream.
    fn open(stream: Box<dyn ReadSeek>, size: u64) -> Result<Self, ReaderError> {
        let reader = StreamReader::try_new(stream, None)?;
        let columns = reader.schema().fields().iter().map(|f| f.name().clone()).collect();
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        let mut blocks = Vec::with_capacity(batches.len());
        let mut offset = 0_u64;
        for batch in &batches {
            let len = batch.get_array_memory_size() as u64;
            blocks.push((offset, len));
            offset += len;
        }
        let layout = BlockLayout {
            file_type: FileType::ArrowStream,
            size_bytes: size,
            header: Bytes::new(),
            header_end: 0,
            payload_bytes: offset,
            columns,
            blocks,
        };
        Ok(Self {
            batches,
            layout,
        })
    }
}

impl BlockReader for IpcStreamBlockReader {
    fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    fn read_block(&mut self, index: usize, _sequential: bool) -> Result<Datum, ReaderError> {
        self.batches
            .get(index)
            .cloned()
            .map(Datum::Batch)
            .ok_or_else(|| ReaderError::Format(format!("ipc batch {index} missing")))
    }
}

// ============================================================================
// SECTION: SAS7BDAT
// ============================================================================

/// Row-range batches of a SAS7BDAT file.
struct SasBlockReader {
    /// Input stream.
    stream: Box<dyn ReadSeek>,
    /// Parsed SAS structure.
    sas: SasLayout,
    /// Rows per batch.
    rows_per_batch: usize,
    /// Input structure.
    layout: BlockLayout,
}

impl SasBlockReader {
    /// Parses the SAS metadata and groups rows into batches.
    fn open(mut stream: Box<dyn ReadSeek>, size: u64, rows_per_batch: u64) -> Result<Self, ReaderError> {
        let sas = sas7bdat::read_layout(&mut stream)?;
        let rows_per_batch = usize::try_from(rows_per_batch.max(1))
            .map_err(|_| ReaderError::Format("rows per batch overflows".to_string()))?;
        let blocks: Vec<(u64, u64)> = sas
            .row_offsets
            .chunks(rows_per_batch)
            .map(|rows| (rows[0], rows.len() as u64 * sas.row_length))
            .collect();
        let layout = BlockLayout {
            file_type: FileType::Sas7bdat,
            size_bytes: size,
            header: Bytes::new(),
            header_end: sas.header_length,
            payload_bytes: blocks.iter().map(|b| b.1).sum(),
            columns: sas.columns.iter().map(|c| c.name.clone()).collect(),
            blocks,
        };
        Ok(Self {
            stream,
            sas,
            rows_per_batch,
            layout,
        })
    }
}

impl BlockReader for SasBlockReader {
    fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    fn read_block(&mut self, index: usize, _sequential: bool) -> Result<Datum, ReaderError> {
        let start = index * self.rows_per_batch;
        let end = (start + self.rows_per_batch).min(self.sas.row_offsets.len());
        if start >= end {
            return Err(ReaderError::Format(format!("sas batch {index} out of range")));
        }
        let batch = sas7bdat::decode_rows(&mut self.stream, &self.sas, start .. end)?;
        Ok(Datum::Batch(batch))
    }
}
