// crates/strata-providers/src/registry.rs
// ============================================================================
// Module: Built-in Registration
// Description: Registers every built-in component with a core registry.
// Purpose: Give jobs a ready registry of algorithms, tools, and generators.
// Dependencies: strata-core
// ============================================================================

//! ## Overview
//! Components are registered under their class names and the module path of
//! the group they belong to. Configurations name components by class and may
//! pin the module as well. Registering the built-ins twice in one registry
//! fails with [`RegistryError::Duplicate`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use strata_core::ComponentRegistry;
use strata_core::RegistryError;

use crate::algorithms::CSV_PARSER_CLASS;
use crate::algorithms::CsvParserAlgo;
use crate::algorithms::FILTER_CLASS;
use crate::algorithms::FilterAlgo;
use crate::algorithms::LEGACY_CLASS;
use crate::algorithms::LegacyAlgo;
use crate::algorithms::PROFILER_CLASS;
use crate::algorithms::ProfilerAlgo;
use crate::generators::CSV_GENERATOR_CLASS;
use crate::generators::CsvGenerator;
use crate::generators::FILE_GENERATOR_CLASS;
use crate::generators::FileGenerator;
use crate::generators::LEGACY_GENERATOR_CLASS;
use crate::generators::LegacyGenerator;
use crate::tools::CSV_TOOL_CLASS;
use crate::tools::CsvTool;
use crate::tools::FILTER_TOOL_CLASS;
use crate::tools::FilterColTool;
use crate::tools::LEGACY_TOOL_CLASS;
use crate::tools::LegacyTool;
use crate::tools::TDIGEST_TOOL_CLASS;
use crate::tools::TDigestTool;

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Module path recorded for built-in algorithms.
pub const ALGORITHMS_MODULE: &str = "strata_providers::algorithms";
/// Module path recorded for built-in tools.
pub const TOOLS_MODULE: &str = "strata_providers::tools";
/// Module path recorded for built-in generators.
pub const GENERATORS_MODULE: &str = "strata_providers::generators";

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Adds every built-in component to `registry`.
///
/// # Errors
///
/// Returns [`RegistryError`] when a built-in class is already registered or
/// the registry is locked.
pub fn register_builtins(registry: &mut ComponentRegistry) -> Result<(), RegistryError> {
    registry.register_tool(TOOLS_MODULE, CSV_TOOL_CLASS, CsvTool::build)?;
    registry.register_tool(TOOLS_MODULE, FILTER_TOOL_CLASS, FilterColTool::build)?;
    registry.register_tool(TOOLS_MODULE, LEGACY_TOOL_CLASS, LegacyTool::build)?;
    registry.register_tool(TOOLS_MODULE, TDIGEST_TOOL_CLASS, TDigestTool::build)?;

    registry.register_algorithm(ALGORITHMS_MODULE, CSV_PARSER_CLASS, CsvParserAlgo::build)?;
    registry.register_algorithm(ALGORITHMS_MODULE, FILTER_CLASS, FilterAlgo::build)?;
    registry.register_algorithm(ALGORITHMS_MODULE, LEGACY_CLASS, LegacyAlgo::build)?;
    registry.register_algorithm(ALGORITHMS_MODULE, PROFILER_CLASS, ProfilerAlgo::build)?;

    registry.register_source(GENERATORS_MODULE, CSV_GENERATOR_CLASS, CsvGenerator::build)?;
    registry.register_source(GENERATORS_MODULE, LEGACY_GENERATOR_CLASS, LegacyGenerator::build)?;
    registry.register_source(GENERATORS_MODULE, FILE_GENERATOR_CLASS, FileGenerator::build)?;
    Ok(())
}

/// Creates a registry holding only the built-in components.
///
/// # Errors
///
/// See [`register_builtins`].
pub fn builtin_registry() -> Result<ComponentRegistry, RegistryError> {
    let mut registry = ComponentRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}
