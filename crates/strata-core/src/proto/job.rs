// crates/strata-core/src/proto/job.rs
// ============================================================================
// Module: Strata Job Messages
// Description: Job lifecycle state, identity, and summary records.
// Purpose: Persist the outcome of each job.
// Dependencies: prost
// ============================================================================

use super::common::Duration;
use super::common::Timestamp;

/// Controller lifecycle state, in transition order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum JobState {
    /// Launched.
    Starting = 0,
    /// Reading menu and configuration.
    Configure = 1,
    /// Sealing properties.
    Lock = 2,
    /// Initializing components.
    Initialize = 3,
    /// Booking metrics.
    Book = 4,
    /// Sampling inputs.
    Sample = 5,
    /// Rebinning metrics from samples.
    Rebook = 6,
    /// Processing inputs.
    Execute = 7,
    /// Finalizing outputs and records.
    Finalize = 8,
    /// Completed.
    Success = 9,
    /// Failed; terminal.
    Abort = 10,
}

impl JobState {
    /// Uppercase label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Configure => "CONFIGURE",
            Self::Lock => "LOCK",
            Self::Initialize => "INITIALIZE",
            Self::Book => "BOOK",
            Self::Sample => "SAMPLE",
            Self::Rebook => "REBOOK",
            Self::Execute => "EXECUTE",
            Self::Finalize => "FINALIZE",
            Self::Success => "SUCCESS",
            Self::Abort => "ABORT",
        }
    }
}

/// Mean and deviation of one timing histogram.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TimerSummary {
    /// Histogram key.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Mean in milliseconds.
    #[prost(double, tag = "2")]
    pub time: f64,
    /// Standard deviation in milliseconds.
    #[prost(double, tag = "3")]
    pub std: f64,
}

/// Shape of one persisted IPC file.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct RecordBatchFileInfo {
    /// Object name of the file.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Rows in the file.
    #[prost(uint64, tag = "2")]
    pub num_rows: u64,
    /// Batches in the file.
    #[prost(uint64, tag = "3")]
    pub num_batches: u64,
    /// Columns in the file.
    #[prost(uint64, tag = "4")]
    pub num_columns: u64,
}

/// Aggregate job outcome.
#[derive(Clone, PartialEq, prost::Message)]
pub struct JobSummary {
    /// Input bytes processed.
    #[prost(uint64, tag = "1")]
    pub processed_bytes: u64,
    /// Inputs processed.
    #[prost(uint64, tag = "2")]
    pub processed_ndatums: u64,
    /// Wall-clock duration.
    #[prost(message, optional, tag = "3")]
    pub job_time: Option<Duration>,
    /// Timer summaries.
    #[prost(message, repeated, tag = "4")]
    pub timers: Vec<TimerSummary>,
    /// Persisted output files.
    #[prost(message, repeated, tag = "5")]
    pub tables: Vec<RecordBatchFileInfo>,
}

/// Identity and outcome of a job.
#[derive(Clone, PartialEq, prost::Message)]
pub struct JobInfo {
    /// Job name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Job index within the output dataset.
    #[prost(uint64, tag = "2")]
    pub job_id: u64,
    /// Store root directory.
    #[prost(string, tag = "3")]
    pub store_path: String,
    /// Store name.
    #[prost(string, tag = "4")]
    pub store_name: String,
    /// Store id.
    #[prost(string, tag = "5")]
    pub store_id: String,
    /// Menu object id.
    #[prost(string, tag = "6")]
    pub menu_id: String,
    /// Configuration object id.
    #[prost(string, tag = "7")]
    pub config_id: String,
    /// Output dataset id.
    #[prost(string, tag = "8")]
    pub dataset_id: String,
    /// Input dataset id; empty when inputs come from a generator.
    #[prost(string, tag = "9")]
    pub parentset_id: String,
    /// Log level.
    #[prost(string, tag = "10")]
    pub loglevel: String,
    /// Current state.
    #[prost(enumeration = "JobState", tag = "11")]
    pub state: i32,
    /// Start time.
    #[prost(message, optional, tag = "12")]
    pub started: Option<Timestamp>,
    /// Finish time.
    #[prost(message, optional, tag = "13")]
    pub finished: Option<Timestamp>,
    /// Summary.
    #[prost(message, optional, tag = "14")]
    pub summary: Option<JobSummary>,
}
