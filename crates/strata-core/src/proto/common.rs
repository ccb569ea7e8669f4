// crates/strata-core/src/proto/common.rs
// ============================================================================
// Module: Strata Common Messages
// Description: Timestamp and duration messages.
// Purpose: Wall-clock values shared by store and job records.
// Dependencies: prost
// ============================================================================

/// Point in time as seconds and nanoseconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct Timestamp {
    /// Whole seconds since the epoch.
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    /// Sub-second nanoseconds.
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

/// Signed span of time; both components share one sign.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct Duration {
    /// Whole seconds.
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    /// Sub-second nanoseconds.
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}
