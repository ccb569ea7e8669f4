// crates/strata-config/src/lib.rs
// ============================================================================
// Module: Strata Config
// Description: TOML job configuration for the strata pipeline.
// Purpose: Load, validate, and convert job files into store messages.
// Dependencies: serde, strata-core, thiserror, toml, tracing
// ============================================================================

//! ## Overview
//! A job file names the store to work in, the input source and its file
//! handler, the tools and algorithms to build, and the menu that wires the
//! algorithms into chains. [`JobConfig::load`] reads and validates one;
//! [`JobConfig::to_menu`], [`JobConfig::to_configuration`], and
//! [`JobConfig::job_info`] turn it into the messages a job registers.
//! Invariants:
//! - A loaded configuration has passed [`JobConfig::validate`].
//! - Conversion never fails on a validated configuration.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod convert;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ChainSection;
pub use config::ComponentSection;
pub use config::ConfigError;
pub use config::CsvHandlerSection;
pub use config::FieldSection;
pub use config::FilesSection;
pub use config::HandlerSection;
pub use config::InputSection;
pub use config::JobConfig;
pub use config::JobSection;
pub use config::LegacyHandlerSection;
pub use config::MemorySection;
pub use config::MenuSection;
pub use config::NodeSection;
pub use config::PropertyEntry;
pub use config::SamplerSection;
pub use config::resolve_path;
pub use convert::FILE_SOURCE_CLASS;
