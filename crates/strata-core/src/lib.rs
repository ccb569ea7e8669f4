// crates/strata-core/src/lib.rs
// ============================================================================
// Module: Strata Core Library
// Description: Public API surface for the Strata batch-processing core.
// Purpose: Expose the object store, readers, writers, metrics, and job runtime.
// Dependencies: crate::{core, proto, store, metrics, menu, io, interfaces, registry, runtime}
// ============================================================================

//! ## Overview
//! Strata core ingests tabular files (CSV, fixed-width EBCDIC, Arrow IPC,
//! SAS7BDAT), splits them into delimiter-aligned blocks, pushes each block
//! through a DAG of user algorithms, collects leaf outputs into size-bounded
//! Arrow IPC files, and records every artifact in a content-addressed object
//! store together with histograms, t-digests, and a job summary.
//!
//! The crate is deliberately free of concrete algorithms; those live in
//! `strata-providers` and reach the runtime through the [`registry`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod io;
pub mod menu;
pub mod metrics;
pub mod proto;
pub mod registry;
pub mod runtime;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::Properties;
pub use crate::core::PropertyError;
pub use crate::core::PropertyValue;
pub use interfaces::Algorithm;
pub use interfaces::ComponentError;
pub use interfaces::DataSource;
pub use interfaces::InputDatum;
pub use interfaces::Tool;
pub use interfaces::ToolStore;
pub use io::BufferOutputWriter;
pub use io::Collector;
pub use io::FileHandler;
pub use io::ReaderError;
pub use io::WriterError;
pub use menu::MenuError;
pub use menu::MenuGraph;
pub use metrics::Histogram1D;
pub use metrics::HistogramBook;
pub use metrics::MetricsError;
pub use metrics::TDigest;
pub use metrics::TDigestBook;
pub use registry::ComponentRegistry;
pub use registry::RegistryError;
pub use runtime::Controller;
pub use runtime::ControllerError;
pub use runtime::Datum;
pub use runtime::Element;
pub use runtime::ExecutionTree;
pub use runtime::JobContext;
pub use runtime::Steering;
pub use runtime::SteeringError;
pub use store::MetaObject;
pub use store::ObjectStore;
pub use store::StoreError;
