// crates/strata-providers/src/generators/mod.rs
// ============================================================================
// Module: Built-in Generators
// Description: Synthetic and on-disk input sources.
// Purpose: Group the data sources a job configuration can name.
// Dependencies: crate::{csvgen, filegen, legacygen}
// ============================================================================

//! ## Overview
//! Synthetic generators derive every file from the seed and the file index,
//! so a sampled file is byte-identical to the same file produced during a
//! full pass.

pub mod csvgen;
pub mod filegen;
pub mod legacygen;

pub use csvgen::CSV_GENERATOR_CLASS;
pub use csvgen::ColumnType;
pub use csvgen::CsvGenerator;
pub use filegen::FILE_GENERATOR_CLASS;
pub use filegen::FileGenerator;
pub use legacygen::LEGACY_GENERATOR_CLASS;
pub use legacygen::LegacyGenerator;
