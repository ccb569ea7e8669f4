// crates/strata-core/src/proto/tdigest.rs
// ============================================================================
// Module: Strata T-Digest Messages
// Description: Serialized t-digest sketches.
// Purpose: Persist per-job quantile sketches.
// Dependencies: prost
// ============================================================================

use std::collections::BTreeMap;

/// One centroid: count `c` at mean `m`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Centroid {
    /// Weight of the centroid.
    #[prost(double, tag = "1")]
    pub c: f64,
    /// Mean of the centroid.
    #[prost(double, tag = "2")]
    pub m: f64,
}

/// A serialized digest.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TDigestInstance {
    /// Digest name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Compression buffer factor.
    #[prost(uint32, tag = "2")]
    pub k: u32,
    /// Accuracy parameter.
    #[prost(double, tag = "3")]
    pub delta: f64,
    /// Total weight.
    #[prost(double, tag = "4")]
    pub n: f64,
    /// Centroids ordered by mean.
    #[prost(message, repeated, tag = "5")]
    pub centroids: Vec<Centroid>,
}

/// Digests keyed by name.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TDigestStore {
    /// Digests by key.
    #[prost(btree_map = "string, message", tag = "1")]
    pub digest_map: BTreeMap<String, TDigestInstance>,
}
