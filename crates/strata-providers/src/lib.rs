// crates/strata-providers/src/lib.rs
// ============================================================================
// Module: Strata Providers
// Description: Built-in algorithms, tools, generators, and the cp500 codec.
// Purpose: Supply the components a job configuration can name out of the box.
// Dependencies: arrow, bytes, rand, strata-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! This crate implements the core component contracts for the common input
//! shapes: delimited text parsed through Arrow's CSV reader, fixed-width
//! EBCDIC records decoded with signed overpunch, column projection, and
//! t-digest profiling. Seeded generators produce matching synthetic inputs.
//! [`builtin_registry`] returns a core registry with all of them registered.
//! Invariants:
//! - Algorithms hold no data between blocks beyond counters.
//! - Generators are deterministic in their seed and file index.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod algorithms;
pub mod ebcdic;
pub mod fields;
pub mod generators;
pub mod registry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use algorithms::CsvParserAlgo;
pub use algorithms::FilterAlgo;
pub use algorithms::LegacyAlgo;
pub use algorithms::ProfilerAlgo;
pub use ebcdic::CodecError;
pub use ebcdic::Cp500;
pub use fields::FieldKind;
pub use fields::LegacyField;
pub use generators::CsvGenerator;
pub use generators::FileGenerator;
pub use generators::LegacyGenerator;
pub use registry::builtin_registry;
pub use registry::register_builtins;
pub use tools::CsvTool;
pub use tools::FilterColTool;
pub use tools::LegacyTool;
pub use tools::TDigestTool;
