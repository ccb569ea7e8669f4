// crates/strata-cli/src/lib.rs
// ============================================================================
// Module: Strata CLI Library
// Description: Command implementations behind the `strata` binary.
// Purpose: Keep job execution and store queries testable without a process.
// Dependencies: serde, serde_json, strata-config, strata-core, strata-providers, thiserror, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! The binary parses arguments and prints; everything else lives here.
//! [`commands::run_job`] registers a job's menu and configuration and drives
//! the controller with the built-in registry. [`commands::list_objects`] and
//! [`commands::inspect_object`] read a store's catalog. [`logging`] installs
//! the subscriber and can tee output into a buffer persisted as the job log.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod commands;
pub mod error;
pub mod logging;
pub mod report;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::CliError;
pub use logging::LogCapture;
pub use report::ObjectList;
pub use report::ObjectReport;
pub use report::ObjectRow;
pub use report::RunReport;
