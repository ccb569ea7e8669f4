// crates/strata-core/src/io/filehandler.rs
// ============================================================================
// Module: Strata Block Layout
// Description: Byte-range block computation for delimited and fixed-width inputs.
// Purpose: Split an input into bounded blocks that respect record boundaries.
// Dependencies: std::io
// ============================================================================

//! ## Overview
//! Blocks are `(offset, length)` pairs covering exactly the payload of a
//! file, from the end of its header to the start of its footer.
//!
//! Delimited inputs are split by seeking `blocksize` bytes past the block
//! start and then scanning forward to the end of the next delimiter, so no
//! record straddles two blocks. The scan reads [`SEEK_CHUNK_BYTES`] at a time.
//! Fixed-width inputs are split arithmetically into whole groups of records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Bytes read per step while scanning for a delimiter.
pub const SEEK_CHUNK_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Delimited Blocks
// ============================================================================

/// Returns the position just past the first `delimiter` at or after `from`,
/// or `size` when none remains.
///
/// # Errors
///
/// Returns [`io::Error`] when seeking or reading fails.
pub fn seek_delimiter<R: Read + Seek + ?Sized>(
    reader: &mut R,
    from: u64,
    size: u64,
    delimiter: &[u8],
) -> io::Result<u64> {
    if delimiter.is_empty() || from >= size {
        return Ok(size);
    }
    reader.seek(SeekFrom::Start(from))?;
    let mut chunk = vec![0_u8; SEEK_CHUNK_BYTES];
    let mut carry: Vec<u8> = Vec::with_capacity(delimiter.len());
    let mut window_start = from;
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            return Ok(size);
        }
        let mut window = std::mem::take(&mut carry);
        window.extend_from_slice(&chunk[.. read]);
        if let Some(idx) = find(&window, delimiter) {
            let end = window_start + (idx + delimiter.len()) as u64;
            return Ok(end.min(size));
        }
        let keep = delimiter.len().saturating_sub(1).min(window.len());
        let consumed = window.len() - keep;
        carry.extend_from_slice(&window[consumed ..]);
        window_start += consumed as u64;
    }
}

/// Splits `[start, size)` into delimiter-aligned blocks of at least
/// `blocksize` bytes; the tail block ends at `size`.
///
/// # Errors
///
/// Returns [`io::Error`] when scanning fails.
pub fn delimited_blocks<R: Read + Seek + ?Sized>(
    reader: &mut R,
    start: u64,
    size: u64,
    blocksize: u64,
    delimiter: &[u8],
) -> io::Result<Vec<(u64, u64)>> {
    let step = blocksize.max(1);
    let mut blocks = Vec::new();
    let mut pos = start;
    while pos < size {
        let target = pos.saturating_add(step);
        let next = if target >= size { size } else { seek_delimiter(reader, target, size, delimiter)? };
        blocks.push((pos, next - pos));
        pos = next;
    }
    Ok(blocks)
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ============================================================================
// SECTION: Fixed-Width Blocks
// ============================================================================

/// Splits a fixed-width file into blocks of `record_size * records_per_block`
/// bytes between the header and the footer.
///
/// Returns `None` when the header and footer exceed the file or the payload is
/// not a whole number of records.
#[must_use]
pub fn fixed_width_blocks(
    size: u64,
    header_size: u64,
    footer_size: u64,
    record_size: u64,
    records_per_block: u64,
) -> Option<Vec<(u64, u64)>> {
    let payload = size.checked_sub(header_size)?.checked_sub(footer_size)?;
    if record_size == 0 || payload % record_size != 0 {
        return None;
    }
    let block_len = record_size.checked_mul(records_per_block.max(1))?;
    let end = header_size + payload;
    let mut blocks = Vec::new();
    let mut pos = header_size;
    while pos < end {
        let len = block_len.min(end - pos);
        blocks.push((pos, len));
        pos += len;
    }
    Some(blocks)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    //! Delimiter scanning and fixed-width edge cases.

    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use std::io::Cursor;

    use super::*;

    /// Verifies a delimiter spanning two scan chunks is located.
    #[test]
    fn delimiter_split_across_chunks_is_found() {
        let mut data = vec![b'x'; SEEK_CHUNK_BYTES - 1];
        data.extend_from_slice(b"\r\nyy");
        let size = data.len() as u64;
        let mut cursor = Cursor::new(data);
        let end = seek_delimiter(&mut cursor, 0, size, b"\r\n").unwrap();
        assert_eq!(end, SEEK_CHUNK_BYTES as u64 + 1);
    }

    /// Verifies partial trailing records are rejected and empty payloads yield no blocks.
    #[test]
    fn fixed_width_rejects_partial_records() {
        assert!(fixed_width_blocks(105, 10, 0, 10, 4).is_none());
        assert_eq!(fixed_width_blocks(10, 10, 0, 10, 4), Some(Vec::new()));
    }
}
