// crates/strata-core/src/core/identifiers.rs
// ============================================================================
// Module: Strata Identifiers
// Description: Object id generation and canonical object file names.
// Purpose: Keep every store naming convention in one place.
// Dependencies: uuid
// ============================================================================

//! ## Overview
//! Generated artifacts receive random UUIDv4 ids rendered as 32 lowercase hex
//! characters. Object file names embed the owning dataset, job, and partition
//! so a flat directory listing stays self-describing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use uuid::Uuid;

// ============================================================================
// SECTION: Id Generation
// ============================================================================

/// Returns a fresh random object id.
#[must_use]
pub fn generate_uuid() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Appends the duplicate counter suffix to an id.
#[must_use]
pub fn with_duplicate_suffix(uuid: &str, counter: u64) -> String {
    format!("{uuid}_{counter}")
}

// ============================================================================
// SECTION: Object Names
// ============================================================================

/// Metastore file name for a store.
#[must_use]
pub fn store_name(uuid: &str, name: &str) -> String {
    format!("{uuid}.{name}.cronus.pb")
}

/// Object name for a menu.
#[must_use]
pub fn menu_name(uuid: &str) -> String {
    format!("{uuid}.menu.pb")
}

/// Object name for a configuration.
#[must_use]
pub fn config_name(uuid: &str) -> String {
    format!("{uuid}.config.pb")
}

/// Object name for a dataset.
#[must_use]
pub fn dataset_name(uuid: &str) -> String {
    format!("{uuid}.dataset")
}

/// Object name for a generated partition file.
#[must_use]
pub fn partition_file_name(
    dataset: &str,
    job_id: u64,
    partition: &str,
    uuid: &str,
    extension: &str,
) -> String {
    format!("{dataset}.job_{job_id}.part_{partition}.{uuid}.{extension}")
}

/// Object name for a file registered from disk.
#[must_use]
pub fn disk_file_name(dataset: &str, partition: &str, hash: &str, file_name: &str) -> String {
    format!("{dataset}.part_{partition}.{hash}.{file_name}")
}

/// Object name for a table describing a partition file.
#[must_use]
pub fn table_name(dataset: &str, job_id: u64, partition: &str, file_uuid: &str, uuid: &str) -> String {
    format!("{dataset}.job_{job_id}.part_{partition}.file_{file_uuid}.{uuid}.table.pb")
}

/// Object name for a histogram collection.
#[must_use]
pub fn hists_name(dataset: &str, job_id: u64, uuid: &str) -> String {
    format!("{dataset}.job_{job_id}.{uuid}.hist.pb")
}

/// Object name for a t-digest collection.
#[must_use]
pub fn tdigests_name(dataset: &str, job_id: u64, uuid: &str) -> String {
    format!("{dataset}.job_{job_id}.{uuid}.tdigest.pb")
}

/// Object name for a job record.
#[must_use]
pub fn job_name(dataset: &str, job_id: u64, uuid: &str) -> String {
    format!("{dataset}.job_{job_id}.{uuid}.job.pb")
}

/// Object name for a job log.
#[must_use]
pub fn log_name(dataset: &str, job_id: u64, uuid: &str) -> String {
    format!("{dataset}.job_{job_id}.{uuid}.log")
}
