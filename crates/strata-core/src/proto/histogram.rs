// crates/strata-core/src/proto/histogram.rs
// ============================================================================
// Module: Strata Histogram Messages
// Description: Serialized histogram collections.
// Purpose: Persist per-job histogram books.
// Dependencies: prost
// ============================================================================

use std::collections::BTreeMap;

/// A single fixed-bin histogram.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HistogramMessage {
    /// Bin edges, strictly increasing; `len = nbins + 1`.
    #[prost(double, repeated, tag = "1")]
    pub bin_edges: Vec<f64>,
    /// Per-bin weights.
    #[prost(double, repeated, tag = "2")]
    pub frequencies: Vec<f64>,
    /// Per-bin squared weights.
    #[prost(double, repeated, tag = "3")]
    pub errors2: Vec<f64>,
    /// Weight below the first edge.
    #[prost(double, tag = "4")]
    pub underflow: f64,
    /// Weight above the last edge.
    #[prost(double, tag = "5")]
    pub overflow: f64,
    /// Sum of filled values.
    #[prost(double, tag = "6")]
    pub sum: f64,
    /// Sum of squared filled values.
    #[prost(double, tag = "7")]
    pub sum2: f64,
    /// Number of fills.
    #[prost(uint64, tag = "8")]
    pub entries: u64,
    /// Axis label, e.g. `ms` or `MB`.
    #[prost(string, tag = "9")]
    pub axis_name: String,
}

/// Histograms keyed by `component.name`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HistogramCollection {
    /// Histograms by key.
    #[prost(btree_map = "string, message", tag = "1")]
    pub histograms: BTreeMap<String, HistogramMessage>,
}
