// crates/strata-core/src/io/sas7bdat.rs
// ============================================================================
// Module: Strata SAS7BDAT Reader
// Description: Metadata parsing and row decoding for uncompressed SAS7BDAT files.
// Purpose: Expose SAS datasets as Arrow batches of a fixed row count.
// Dependencies: arrow, crate::io
// ============================================================================

//! ## Overview
//! A SAS7BDAT file is a fixed-size header followed by fixed-size pages. Meta
//! and mix pages carry subheaders, located through a pointer table, that
//! describe the row size, column names, and column attributes; data and mix
//! pages carry packed rows. [`read_layout`] walks every page once and records
//! the file offset of each row, so batches can later be decoded by row range
//! without holding the file in memory.
//!
//! Numeric columns become `Float64` (missing values become null) and
//! character columns become `Utf8` with trailing blanks removed. Compressed
//! files are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::ops::Range;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::array::Float64Builder;
use arrow::array::StringBuilder;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use super::ReaderError;

// ============================================================================
// SECTION: Format Constants
// ============================================================================

/// Leading magic bytes of every SAS7BDAT file.
pub const MAGIC: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc2, 0xea, 0x81, 0x60,
    0xb3, 0x14, 0x11, 0xcf, 0xbd, 0x92, 0x08, 0x00, 0x09, 0xc7, 0x31, 0x8c, 0x18, 0x1f, 0x10, 0x11,
];

/// Bytes of the fixed header prefix read before the header length is known.
const HEADER_PREFIX_BYTES: usize = 288;
/// Marker byte selecting 64-bit integers (offset 32) or padding (offset 35).
const ALIGN_MARKER: u8 = 0x33;
/// Offset of the 64-bit marker.
const U64_MARKER_OFFSET: usize = 32;
/// Offset of the padding marker.
const PAD_MARKER_OFFSET: usize = 35;
/// Offset of the endianness byte.
const ENDIANNESS_OFFSET: usize = 37;
/// Offset of the header length, before padding.
const HEADER_LENGTH_OFFSET: usize = 196;
/// Offset of the page size, before padding.
const PAGE_SIZE_OFFSET: usize = 200;
/// Offset of the page count, before padding.
const PAGE_COUNT_OFFSET: usize = 204;

/// Meta page type.
pub const PAGE_META: u16 = 0x0000;
/// Data page type.
pub const PAGE_DATA: u16 = 0x0100;
/// Mix page type.
pub const PAGE_MIX: u16 = 0x0200;

/// Row size subheader signature.
pub const SIG_ROW_SIZE: u32 = 0xF7F7_F7F7;
/// Column size subheader signature.
pub const SIG_COLUMN_SIZE: u32 = 0xF6F6_F6F6;
/// Column text subheader signature.
pub const SIG_COLUMN_TEXT: u32 = 0xFFFF_FFFD;
/// Column name subheader signature.
pub const SIG_COLUMN_NAME: u32 = 0xFFFF_FFFF;
/// Column attributes subheader signature.
pub const SIG_COLUMN_ATTRS: u32 = 0xFFFF_FFFC;

/// Pointer compression flag for truncated entries.
const COMPRESSION_TRUNCATED: u8 = 1;
/// Pointer compression flag for compressed rows.
const COMPRESSION_ROW: u8 = 4;
/// Column attribute type for numeric columns.
const COLUMN_NUMERIC: u8 = 1;

// ============================================================================
// SECTION: Layout
// ============================================================================

/// One column of a SAS dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasColumn {
    /// Column name.
    pub name: String,
    /// Offset within a row.
    pub offset: u64,
    /// Width in bytes.
    pub length: u32,
    /// True for numeric columns.
    pub numeric: bool,
}

/// Parsed structure of a SAS7BDAT file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasLayout {
    /// True for little-endian files.
    pub little_endian: bool,
    /// Integer width, 4 or 8.
    pub int_len: usize,
    /// Header length in bytes.
    pub header_length: u64,
    /// Page size in bytes.
    pub page_size: u64,
    /// Number of pages.
    pub page_count: u64,
    /// Row width in bytes.
    pub row_length: u64,
    /// Declared row count.
    pub row_count: u64,
    /// Rows stored on each mix page.
    pub mix_page_row_count: u64,
    /// Columns in file order.
    pub columns: Vec<SasColumn>,
    /// File offset of every row.
    pub row_offsets: Vec<u64>,
}

impl SasLayout {
    /// Arrow schema of the decoded batches.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| {
                let dtype = if c.numeric { DataType::Float64 } else { DataType::Utf8 };
                Field::new(&c.name, dtype, true)
            })
            .collect();
        Arc::new(Schema::new(fields))
    }
}

/// Little helper over a byte buffer with the file's integer conventions.
struct Cursor<'a> {
    /// Underlying bytes.
    buf: &'a [u8],
    /// True for little-endian files.
    le: bool,
}

impl Cursor<'_> {
    /// Returns `len` bytes at `offset`.
    fn slice(&self, offset: usize, len: usize) -> Result<&[u8], ReaderError> {
        offset
            .checked_add(len)
            .and_then(|end| self.buf.get(offset .. end))
            .ok_or_else(|| ReaderError::Format(format!("sas7bdat read past end at {offset}+{len}")))
    }

    /// Reads one byte.
    fn u8(&self, offset: usize) -> Result<u8, ReaderError> {
        Ok(self.slice(offset, 1)?[0])
    }

    /// Reads an unsigned integer of `width` bytes (1, 2, 4, or 8).
    fn uint(&self, offset: usize, width: usize) -> Result<u64, ReaderError> {
        let bytes = self.slice(offset, width)?;
        let mut out = [0_u8; 8];
        if self.le {
            out[.. width].copy_from_slice(bytes);
            Ok(u64::from_le_bytes(out))
        } else {
            out[8 - width ..].copy_from_slice(bytes);
            Ok(u64::from_be_bytes(out))
        }
    }

    /// Reads an unsigned integer as `usize`.
    fn index(&self, offset: usize, width: usize) -> Result<usize, ReaderError> {
        usize::try_from(self.uint(offset, width)?)
            .map_err(|_| ReaderError::Format(format!("sas7bdat offset at {offset} overflows")))
    }
}

/// Subheader contents collected across pages.
#[derive(Default)]
struct Collected {
    /// Column text blobs in subheader order.
    texts: Vec<Vec<u8>>,
    /// Name references `(text index, offset, length)`.
    names: Vec<(usize, usize, usize)>,
    /// Attributes `(offset, length, numeric)`.
    attrs: Vec<(u64, u32, bool)>,
}

/// Parses the header and every page of a SAS7BDAT file.
///
/// # Errors
///
/// Returns [`ReaderError::Format`] for a bad magic number, truncated pages,
/// compressed rows, or inconsistent column metadata.
pub fn read_layout<R: Read + Seek>(reader: &mut R) -> Result<SasLayout, ReaderError> {
    reader.seek(SeekFrom::Start(0))?;
    let mut prefix = vec![0_u8; HEADER_PREFIX_BYTES];
    reader.read_exact(&mut prefix)?;
    if prefix[.. MAGIC.len()] != MAGIC {
        return Err(ReaderError::Format("not a sas7bdat file".to_string()));
    }
    let int_len = if prefix[U64_MARKER_OFFSET] == ALIGN_MARKER { 8 } else { 4 };
    let pad = if prefix[PAD_MARKER_OFFSET] == ALIGN_MARKER { 4 } else { 0 };
    let le = prefix[ENDIANNESS_OFFSET] == 0x01;
    let head = Cursor {
        buf: &prefix,
        le,
    };
    let header_length = head.uint(HEADER_LENGTH_OFFSET + pad, 4)?;
    let page_size = head.uint(PAGE_SIZE_OFFSET + pad, 4)?;
    let page_count = head.uint(PAGE_COUNT_OFFSET + pad, int_len)?;
    let page_len = usize::try_from(page_size)
        .map_err(|_| ReaderError::Format("sas7bdat page size overflows".to_string()))?;
    if page_len == 0 {
        return Err(ReaderError::Format("sas7bdat page size is zero".to_string()));
    }

    let bit_offset = if int_len == 8 { 32 } else { 16 };
    let ptr_len = if int_len == 8 { 24 } else { 12 };
    let mut layout = SasLayout {
        little_endian: le,
        int_len,
        header_length,
        page_size,
        page_count,
        row_length: 0,
        row_count: 0,
        mix_page_row_count: 0,
        columns: Vec::new(),
        row_offsets: Vec::new(),
    };
    let mut collected = Collected::default();
    let mut page = vec![0_u8; page_len];
    for index in 0 .. page_count {
        let page_start = header_length + index * page_size;
        reader.seek(SeekFrom::Start(page_start))?;
        reader.read_exact(&mut page)?;
        let cur = Cursor {
            buf: &page,
            le,
        };
        let page_type = u16::try_from(cur.uint(bit_offset, 2)?).unwrap_or(u16::MAX);
        let block_count = cur.uint(bit_offset + 2, 2)?;
        let sub_count = cur.index(bit_offset + 4, 2)?;
        if page_type == PAGE_META || page_type == PAGE_MIX {
            for ptr in 0 .. sub_count {
                let base = bit_offset + 8 + ptr * ptr_len;
                let offset = cur.index(base, int_len)?;
                let len = cur.index(base + int_len, int_len)?;
                let compression = cur.u8(base + 2 * int_len)?;
                if len == 0 || compression == COMPRESSION_TRUNCATED {
                    continue;
                }
                if compression == COMPRESSION_ROW {
                    return Err(ReaderError::Format("compressed sas7bdat files are not supported".to_string()));
                }
                read_subheader(&cur, offset, len, int_len, &mut layout, &mut collected)?;
            }
        }
        let (rows_start, rows_here) = match page_type {
            PAGE_DATA => (bit_offset + 8, block_count),
            PAGE_MIX => {
                let start = bit_offset + 8 + sub_count * ptr_len;
                (start + start % 8, layout.mix_page_row_count)
            }
            _ => continue,
        };
        if layout.row_length == 0 {
            return Err(ReaderError::Format("sas7bdat rows precede the row size subheader".to_string()));
        }
        let remaining = layout.row_count.saturating_sub(layout.row_offsets.len() as u64);
        for row in 0 .. rows_here.min(remaining) {
            layout.row_offsets.push(page_start + rows_start as u64 + row * layout.row_length);
        }
    }
    layout.columns = resolve_columns(&collected, le)?;
    Ok(layout)
}

/// Records one subheader.
fn read_subheader(
    cur: &Cursor<'_>,
    offset: usize,
    len: usize,
    int_len: usize,
    layout: &mut SasLayout,
    collected: &mut Collected,
) -> Result<(), ReaderError> {
    let signature = u32::try_from(cur.uint(offset, 4)?).unwrap_or(0);
    match signature {
        SIG_ROW_SIZE => {
            layout.row_length = cur.uint(offset + 5 * int_len, int_len)?;
            layout.row_count = cur.uint(offset + 6 * int_len, int_len)?;
            layout.mix_page_row_count = cur.uint(offset + 15 * int_len, int_len)?;
        }
        SIG_COLUMN_TEXT => {
            let blob = cur.slice(offset + int_len, len.saturating_sub(int_len))?;
            collected.texts.push(blob.to_vec());
        }
        SIG_COLUMN_NAME => {
            let count = len.saturating_sub(2 * int_len + 12) / 8;
            for i in 0 .. count {
                let base = offset + int_len + 8 + 8 * i;
                collected.names.push((cur.index(base, 2)?, cur.index(base + 2, 2)?, cur.index(base + 4, 2)?));
            }
        }
        SIG_COLUMN_ATTRS => {
            let count = len.saturating_sub(2 * int_len + 12) / (int_len + 8);
            for i in 0 .. count {
                let base = offset + int_len + 8 + i * (int_len + 8);
                let data_offset = cur.uint(base, int_len)?;
                let width = u32::try_from(cur.uint(base + int_len, 4)?).unwrap_or(0);
                let numeric = cur.u8(base + int_len + 6)? == COLUMN_NUMERIC;
                collected.attrs.push((data_offset, width, numeric));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Joins column names with their attributes.
fn resolve_columns(collected: &Collected, le: bool) -> Result<Vec<SasColumn>, ReaderError> {
    if collected.names.len() != collected.attrs.len() {
        return Err(ReaderError::Format(format!(
            "sas7bdat has {} column names but {} attribute entries",
            collected.names.len(),
            collected.attrs.len()
        )));
    }
    collected
        .names
        .iter()
        .zip(&collected.attrs)
        .map(|(&(text, off, len), &(offset, length, numeric))| {
            let blob = collected
                .texts
                .get(text)
                .ok_or_else(|| ReaderError::Format(format!("missing column text block {text}")))?;
            let cur = Cursor {
                buf: blob,
                le,
            };
            let raw = cur.slice(off, len)?;
            Ok(SasColumn {
                name: decode_text(raw),
                offset,
                length,
                numeric,
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Decodes the rows in `rows` into one batch.
///
/// # Errors
///
/// Returns [`ReaderError`] when a row cannot be read or a column exceeds the row.
pub fn decode_rows<R: Read + Seek>(
    reader: &mut R,
    layout: &SasLayout,
    rows: Range<usize>,
) -> Result<RecordBatch, ReaderError> {
    let row_len = usize::try_from(layout.row_length)
        .map_err(|_| ReaderError::Format("sas7bdat row length overflows".to_string()))?;
    let offsets = layout
        .row_offsets
        .get(rows.clone())
        .ok_or_else(|| ReaderError::Format(format!("row range {}..{} out of bounds", rows.start, rows.end)))?;
    let mut numeric: Vec<Option<Float64Builder>> = Vec::with_capacity(layout.columns.len());
    let mut text: Vec<Option<StringBuilder>> = Vec::with_capacity(layout.columns.len());
    for column in &layout.columns {
        if column.numeric {
            numeric.push(Some(Float64Builder::with_capacity(offsets.len())));
            text.push(None);
        } else {
            numeric.push(None);
            text.push(Some(StringBuilder::with_capacity(offsets.len(), offsets.len() * 8)));
        }
    }
    let mut row = vec![0_u8; row_len];
    for &offset in offsets {
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(&mut row)?;
        let cur = Cursor {
            buf: &row,
            le: layout.little_endian,
        };
        for (idx, column) in layout.columns.iter().enumerate() {
            let start = usize::try_from(column.offset)
                .map_err(|_| ReaderError::Format("sas7bdat column offset overflows".to_string()))?;
            let width = usize::try_from(column.length)
                .map_err(|_| ReaderError::Format("sas7bdat column width overflows".to_string()))?;
            let raw = cur.slice(start, width)?;
            if let Some(builder) = numeric[idx].as_mut() {
                builder.append_option(decode_number(raw, layout.little_endian));
            } else if let Some(builder) = text[idx].as_mut() {
                builder.append_value(decode_text(raw));
            }
        }
    }
    let arrays: Vec<ArrayRef> = numeric
        .into_iter()
        .zip(text)
        .map(|(num, txt)| match (num, txt) {
            (Some(mut b), _) => Arc::new(b.finish()) as ArrayRef,
            (None, Some(mut b)) => Arc::new(b.finish()) as ArrayRef,
            (None, None) => Arc::new(StringBuilder::new().finish()) as ArrayRef,
        })
        .collect();
    Ok(RecordBatch::try_new(layout.schema(), arrays)?)
}

/// Decodes a possibly truncated double; NaN payloads are SAS missing values.
fn decode_number(raw: &[u8], le: bool) -> Option<f64> {
    if raw.is_empty() || raw.len() > 8 {
        return None;
    }
    let mut buf = [0_u8; 8];
    let value = if le {
        buf[8 - raw.len() ..].copy_from_slice(raw);
        f64::from_le_bytes(buf)
    } else {
        buf[.. raw.len()].copy_from_slice(raw);
        f64::from_be_bytes(buf)
    };
    (!value.is_nan()).then_some(value)
}

/// Decodes blank-padded text.
fn decode_text(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|b| *b != b' ' && *b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[.. end]).into_owned()
}
