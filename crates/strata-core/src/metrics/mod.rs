// crates/strata-core/src/metrics/mod.rs
// ============================================================================
// Module: Strata Metrics
// Description: Fixed-bin histograms, histogram books, t-digests, and timers.
// Purpose: Accumulate per-job statistics that merge across jobs.
// Dependencies: crate::{core, proto}, rand, thiserror
// ============================================================================

//! ## Overview
//! Histograms are booked under `component.name` keys and filled during the
//! sample and execute phases. Books merge with `+`: shared keys add
//! bin-by-bin and disjoint keys are unioned. Timer histograms remember their
//! raw samples until the book is rebooked, when they are rebinned from the
//! observed distribution.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod book;
pub mod histogram;
pub mod tdigest;
pub mod timer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use book::HistogramBook;
pub use book::TDigestBook;
pub use histogram::Histogram1D;
pub use histogram::autobinning;
pub use histogram::float_range;
pub use tdigest::TDigest;
pub use timer::Stopwatch;

// ============================================================================
// SECTION: Errors
// ============================================================================

use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    /// Bin edges are not strictly increasing or too few.
    #[error("invalid binning: {0}")]
    InvalidBins(String),
    /// Histograms with different bins cannot be combined.
    #[error("incompatible bins for {0}")]
    IncompatibleBins(String),
    /// Key was never booked.
    #[error("unknown histogram key {0}")]
    UnknownKey(String),
    /// Serialized form is inconsistent.
    #[error("corrupt metrics message: {0}")]
    Corrupt(String),
}
