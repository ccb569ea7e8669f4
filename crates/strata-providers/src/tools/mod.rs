// crates/strata-providers/src/tools/mod.rs
// ============================================================================
// Module: Built-in Tools
// Description: Shared helpers looked up by algorithms through the tool store.
// Purpose: Group the parsing, filtering, and profiling tools.
// Dependencies: crate::{csv, filter, legacy, tdigest}
// ============================================================================

//! ## Overview
//! Tools are instantiated once per job from the configuration and held in the
//! job's tool store. Algorithms reach them by configured name and concrete
//! type, so one tool instance can serve several algorithms.

pub mod csv;
pub mod filter;
pub mod legacy;
pub mod tdigest;

pub use csv::CSV_TOOL_CLASS;
pub use csv::CsvTool;
pub use filter::FILTER_TOOL_CLASS;
pub use filter::FilterColTool;
pub use legacy::LEGACY_TOOL_CLASS;
pub use legacy::LegacyTool;
pub use tdigest::TDIGEST_TOOL_CLASS;
pub use tdigest::TDigestTool;
