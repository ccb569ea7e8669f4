// crates/strata-core/src/store/meta.rs
// ============================================================================
// Module: Strata Object Metadata
// Description: Lightweight object handles and registration keys.
// Purpose: Return stable descriptors without exposing catalog internals.
// Dependencies: crate::proto
// ============================================================================

use crate::proto::CronusObject;

/// Name, id, parent, and address of a catalogued object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MetaObject {
    /// Object file name.
    pub name: String,
    /// Object id.
    pub uuid: String,
    /// Owning dataset or store id.
    pub parent_uuid: String,
    /// `file://` URL of the payload.
    pub address: String,
}

impl From<&CronusObject> for MetaObject {
    fn from(obj: &CronusObject) -> Self {
        Self {
            name: obj.name.clone(),
            uuid: obj.uuid.clone(),
            parent_uuid: obj.parent_uuid.clone(),
            address: obj.address.clone(),
        }
    }
}

/// Parent keys supplied when registering a payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentKeys<'a> {
    /// Owning dataset id.
    pub dataset_id: Option<&'a str>,
    /// Partition key within the dataset.
    pub partition_key: Option<&'a str>,
    /// Job index within the dataset.
    pub job_id: Option<u64>,
    /// Described file id, for tables.
    pub file_id: Option<&'a str>,
}

impl<'a> ContentKeys<'a> {
    /// Keys for a job-scoped artifact.
    #[must_use]
    pub const fn job(dataset_id: &'a str, job_id: u64) -> Self {
        Self {
            dataset_id: Some(dataset_id),
            partition_key: None,
            job_id: Some(job_id),
            file_id: None,
        }
    }

    /// Keys for a partition file.
    #[must_use]
    pub const fn partition(dataset_id: &'a str, job_id: u64, partition_key: &'a str) -> Self {
        Self {
            dataset_id: Some(dataset_id),
            partition_key: Some(partition_key),
            job_id: Some(job_id),
            file_id: None,
        }
    }

    /// Adds the described file id.
    #[must_use]
    pub const fn with_file(mut self, file_id: &'a str) -> Self {
        self.file_id = Some(file_id);
        self
    }
}
