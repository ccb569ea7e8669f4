// crates/strata-providers/src/algorithms/mod.rs
// ============================================================================
// Module: Built-in Algorithms
// Description: Parsing, decoding, filtering, and profiling algorithms.
// Purpose: Group the algorithms menus can name out of the box.
// Dependencies: crate::{csvparser, filter, legacy, profiler}
// ============================================================================

//! ## Overview
//! Each algorithm holds only its configuration and counters; the heavy lifting
//! is done by a tool it resolves from the job context by name.

pub mod csvparser;
pub mod filter;
pub mod legacy;
pub mod profiler;

pub use csvparser::CSV_PARSER_CLASS;
pub use csvparser::CsvParserAlgo;
pub use filter::FILTER_CLASS;
pub use filter::FilterAlgo;
pub use legacy::LEGACY_CLASS;
pub use legacy::LegacyAlgo;
pub use profiler::PROFILER_CLASS;
pub use profiler::ProfilerAlgo;
