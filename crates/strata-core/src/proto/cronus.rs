// crates/strata-core/src/proto/cronus.rs
// ============================================================================
// Module: Strata Store Messages
// Description: Object metadata, typed object infos, and the metastore root.
// Purpose: Persist the object catalog of a store.
// Dependencies: prost
// ============================================================================

//! ## Overview
//! A store's catalog is one [`CronusObjectStore`] message. Top-level objects
//! (menus, configurations, datasets) live in its info; everything a job
//! produces is nested under the owning dataset.

use super::common::Timestamp;
use super::job::JobState;

// ============================================================================
// SECTION: File Types
// ============================================================================

/// On-disk format of a file object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum FileType {
    /// Unset.
    Unknown = 0,
    /// Delimited text.
    Csv = 1,
    /// Fixed-width EBCDIC records.
    Legacy = 2,
    /// SAS7BDAT dataset.
    Sas7bdat = 3,
    /// Arrow IPC file format.
    Arrow = 5,
    /// Arrow IPC stream format.
    ArrowStream = 6,
}

impl FileType {
    /// Lowercase extension used in object names.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Unknown => "dat",
            Self::Csv => "csv",
            Self::Legacy => "legacy",
            Self::Sas7bdat => "sas7bdat",
            Self::Arrow => "arrow",
            Self::ArrowStream => "arrows",
        }
    }
}

// ============================================================================
// SECTION: Object Infos
// ============================================================================

/// Byte range of one block inside a file.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct BlockInfo {
    /// Block index.
    #[prost(uint64, tag = "1")]
    pub index: u64,
    /// Start offset in the file.
    #[prost(uint64, tag = "2")]
    pub offset: u64,
    /// Length of the block.
    #[prost(uint64, tag = "3")]
    pub size_bytes: u64,
}

/// Metadata of a file object.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FileObjectInfo {
    /// File format.
    #[prost(enumeration = "FileType", tag = "1")]
    pub file_type: i32,
    /// Size of the file in bytes.
    #[prost(uint64, tag = "2")]
    pub size_bytes: u64,
    /// Blocks recorded by the reader.
    #[prost(message, repeated, tag = "3")]
    pub blocks: Vec<BlockInfo>,
    /// Free-form description.
    #[prost(string, tag = "4")]
    pub description: String,
    /// Column names, when known.
    #[prost(string, repeated, tag = "5")]
    pub columns: Vec<String>,
}

impl FileObjectInfo {
    /// Creates an info of the given type.
    #[must_use]
    pub fn of_type(file_type: FileType) -> Self {
        Self {
            file_type: file_type as i32,
            ..Self::default()
        }
    }
}

/// Metadata of a table describing a partition file.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TableObjectInfo {
    /// Described file object id.
    #[prost(string, tag = "1")]
    pub file_uuid: String,
    /// Row count.
    #[prost(uint64, tag = "2")]
    pub num_rows: u64,
    /// Batch count.
    #[prost(uint64, tag = "3")]
    pub num_batches: u64,
    /// Column count.
    #[prost(uint64, tag = "4")]
    pub num_columns: u64,
    /// Column names.
    #[prost(string, repeated, tag = "5")]
    pub columns: Vec<String>,
}

/// Metadata of a menu object.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct MenuObjectInfo {
    /// Registration time.
    #[prost(message, optional, tag = "1")]
    pub created: Option<Timestamp>,
}

/// Metadata of a configuration object.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct ConfigObjectInfo {
    /// Registration time.
    #[prost(message, optional, tag = "1")]
    pub created: Option<Timestamp>,
}

/// Metadata of a histogram collection.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct HistsObjectInfo {
    /// Histogram keys in the collection.
    #[prost(string, repeated, tag = "1")]
    pub keys: Vec<String>,
}

/// Metadata of a t-digest collection.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TDigestObjectInfo {
    /// Digest keys in the collection.
    #[prost(string, repeated, tag = "1")]
    pub keys: Vec<String>,
}

/// Metadata of a job record.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct JobObjectInfo {
    /// Final job state.
    #[prost(enumeration = "JobState", tag = "1")]
    pub state: i32,
    /// Job index within the dataset.
    #[prost(uint64, tag = "2")]
    pub job_id: u64,
}

/// Metadata of a job log.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct LogObjectInfo {
    /// Job index within the dataset.
    #[prost(uint64, tag = "1")]
    pub job_id: u64,
}

/// Menu and configuration that produced a dataset.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Transform {
    /// Copy of the menu object.
    #[prost(message, optional, boxed, tag = "1")]
    pub menu: Option<Box<CronusObject>>,
    /// Copy of the configuration object.
    #[prost(message, optional, boxed, tag = "2")]
    pub config: Option<Box<CronusObject>>,
}

/// A dataset and everything jobs have produced in it.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DatasetObjectInfo {
    /// Producing transform.
    #[prost(message, optional, tag = "1")]
    pub transform: Option<Transform>,
    /// Registered partition keys.
    #[prost(string, repeated, tag = "2")]
    pub partitions: Vec<String>,
    /// Number of jobs started so far.
    #[prost(uint64, tag = "3")]
    pub job_idx: u64,
    /// File objects.
    #[prost(message, repeated, tag = "4")]
    pub files: Vec<CronusObject>,
    /// Table objects.
    #[prost(message, repeated, tag = "5")]
    pub tables: Vec<CronusObject>,
    /// Histogram collections.
    #[prost(message, repeated, tag = "6")]
    pub hists: Vec<CronusObject>,
    /// T-digest collections.
    #[prost(message, repeated, tag = "7")]
    pub tdigests: Vec<CronusObject>,
    /// Job records.
    #[prost(message, repeated, tag = "8")]
    pub jobs: Vec<CronusObject>,
    /// Job logs.
    #[prost(message, repeated, tag = "9")]
    pub logs: Vec<CronusObject>,
}

// ============================================================================
// SECTION: Objects
// ============================================================================

/// A catalogued object.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CronusObject {
    /// Object file name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Object id.
    #[prost(string, tag = "2")]
    pub uuid: String,
    /// Owning dataset or store id.
    #[prost(string, tag = "3")]
    pub parent_uuid: String,
    /// `file://` URL of the payload.
    #[prost(string, tag = "4")]
    pub address: String,
    /// Typed info.
    #[prost(oneof = "cronus_object::Info", tags = "5, 6, 7, 8, 9, 10, 11, 12, 13")]
    pub info: Option<cronus_object::Info>,
}

/// Nested types for [`CronusObject`].
pub mod cronus_object {
    /// Typed object info.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Info {
        /// Menu.
        #[prost(message, tag = "5")]
        Menu(super::MenuObjectInfo),
        /// Configuration.
        #[prost(message, tag = "6")]
        Config(super::ConfigObjectInfo),
        /// Dataset.
        #[prost(message, tag = "7")]
        Dataset(super::DatasetObjectInfo),
        /// File.
        #[prost(message, tag = "8")]
        File(super::FileObjectInfo),
        /// Table.
        #[prost(message, tag = "9")]
        Table(super::TableObjectInfo),
        /// Histogram collection.
        #[prost(message, tag = "10")]
        Hists(super::HistsObjectInfo),
        /// T-digest collection.
        #[prost(message, tag = "11")]
        Tdigests(super::TDigestObjectInfo),
        /// Job record.
        #[prost(message, tag = "12")]
        Job(super::JobObjectInfo),
        /// Job log.
        #[prost(message, tag = "13")]
        Log(super::LogObjectInfo),
    }

    impl Info {
        /// Short kind label for listings and errors.
        #[must_use]
        pub const fn kind(&self) -> &'static str {
            match self {
                Self::Menu(_) => "menu",
                Self::Config(_) => "config",
                Self::Dataset(_) => "dataset",
                Self::File(_) => "file",
                Self::Table(_) => "table",
                Self::Hists(_) => "hists",
                Self::Tdigests(_) => "tdigests",
                Self::Job(_) => "job",
                Self::Log(_) => "log",
            }
        }
    }
}

// ============================================================================
// SECTION: Store Root
// ============================================================================

/// Catalog payload of a store.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CronusStoreInfo {
    /// Creation time.
    #[prost(message, optional, tag = "1")]
    pub created: Option<Timestamp>,
    /// Top-level objects.
    #[prost(message, repeated, tag = "2")]
    pub objects: Vec<CronusObject>,
}

/// The persisted metastore.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CronusObjectStore {
    /// Metastore file name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Store id.
    #[prost(string, tag = "2")]
    pub uuid: String,
    /// Parent id, empty for stores.
    #[prost(string, tag = "3")]
    pub parent_uuid: String,
    /// `file://` URL of the metastore.
    #[prost(string, tag = "4")]
    pub address: String,
    /// Catalog.
    #[prost(message, optional, tag = "5")]
    pub info: Option<CronusStoreInfo>,
}
