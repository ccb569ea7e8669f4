// crates/strata-core/src/io/mod.rs
// ============================================================================
// Module: Strata Input and Output
// Description: Block readers for input files and buffered output writers.
// Purpose: Split inputs into blocks and persist leaf output as Arrow files.
// Dependencies: arrow, bytes, thiserror
// ============================================================================

//! ## Overview
//! The read side turns an [`crate::interfaces::InputDatum`] into a
//! [`PreparedInput`]: a header, a list of `(offset, length)` blocks, and a
//! reader that yields each block as a [`crate::runtime::Datum`]. Block
//! boundaries always fall on record boundaries, so every block parses on its
//! own.
//!
//! The write side is a [`Collector`] that owns one [`BufferOutputWriter`] per
//! leaf of the execution tree.

pub mod collector;
pub mod filehandler;
pub mod reader;
pub mod sas7bdat;
pub mod writer;

use arrow::error::ArrowError;
pub use collector::Collector;
pub use reader::Block;
pub use reader::BlockLayout;
pub use reader::FileHandler;
pub use reader::HandlerKind;
pub use reader::PreparedInput;
use thiserror::Error;
pub use writer::BufferOutputWriter;
pub use writer::WriterConfig;
pub use writer::WriterError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Input preparation and block read failures.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// A file header differs from the first header seen.
    #[error("header invalid: {0}")]
    HeaderInvalid(String),
    /// A user schema does not match the file.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Reading or seeking failed.
    #[error("io error: {0}")]
    Io(String),
    /// The input is not in the configured format.
    #[error("format error: {0}")]
    Format(String),
}

impl From<std::io::Error> for ReaderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<ArrowError> for ReaderError {
    fn from(err: ArrowError) -> Self {
        Self::Format(err.to_string())
    }
}
