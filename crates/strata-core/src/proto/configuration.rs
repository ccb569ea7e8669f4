// crates/strata-core/src/proto/configuration.rs
// ============================================================================
// Module: Strata Configuration Messages
// Description: Job configuration, component descriptors, and reader settings.
// Purpose: Persist the full configuration a job ran with.
// Dependencies: prost
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Properties
// ============================================================================

/// Ordered string list.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct StringList {
    /// Values.
    #[prost(string, repeated, tag = "1")]
    pub values: Vec<String>,
}

/// A typed property value.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PropertyValue {
    /// Value variant.
    #[prost(oneof = "property_value::Kind", tags = "1, 2, 3, 4, 5")]
    pub kind: Option<property_value::Kind>,
}

/// Nested types for [`PropertyValue`].
pub mod property_value {
    /// Value variant.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        /// Boolean.
        #[prost(bool, tag = "1")]
        BoolValue(bool),
        /// Integer.
        #[prost(int64, tag = "2")]
        IntValue(i64),
        /// Float.
        #[prost(double, tag = "3")]
        DoubleValue(f64),
        /// String.
        #[prost(string, tag = "4")]
        StringValue(String),
        /// String list.
        #[prost(message, tag = "5")]
        ListValue(super::StringList),
    }
}

/// Property map of a component.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Properties {
    /// Entries by key.
    #[prost(btree_map = "string, message", tag = "1")]
    pub entries: BTreeMap<String, PropertyValue>,
}

// ============================================================================
// SECTION: Components
// ============================================================================

/// Descriptor used to instantiate an algorithm, tool, or data source.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ComponentConfig {
    /// Instance name referenced by menus and lookups.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Registered class name.
    #[prost(string, tag = "2")]
    pub class: String,
    /// Module the class is registered under; empty matches any.
    #[prost(string, tag = "3")]
    pub module: String,
    /// Initial properties.
    #[prost(message, optional, tag = "4")]
    pub properties: Option<Properties>,
}

// ============================================================================
// SECTION: Readers
// ============================================================================

/// Delimited-text reader settings.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CsvHandlerConfig {
    /// Target block size in bytes.
    #[prost(uint64, tag = "1")]
    pub blocksize: u64,
    /// Line delimiter.
    #[prost(string, tag = "2")]
    pub delimiter: String,
    /// Field separator.
    #[prost(string, tag = "3")]
    pub separator: String,
    /// Number of header rows; the first names the columns.
    #[prost(uint32, tag = "4")]
    pub header_rows: u32,
    /// User-declared column names; overrides the header.
    #[prost(string, repeated, tag = "5")]
    pub schema: Vec<String>,
}

/// One fixed-width field.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FieldSpec {
    /// Column name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Width in bytes.
    #[prost(uint32, tag = "2")]
    pub length: u32,
    /// `int`, `uint`, or `str`.
    #[prost(string, tag = "3")]
    pub utype: String,
}

/// Fixed-width record reader settings.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct LegacyHandlerConfig {
    /// Header bytes skipped before the first record.
    #[prost(uint64, tag = "1")]
    pub header_size: u64,
    /// Footer bytes after the last record.
    #[prost(uint64, tag = "2")]
    pub footer_size: u64,
    /// Records per block.
    #[prost(uint64, tag = "3")]
    pub records_per_block: u64,
    /// Record layout.
    #[prost(message, repeated, tag = "4")]
    pub fields: Vec<FieldSpec>,
}

/// Arrow IPC reader settings.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct IpcHandlerConfig {
    /// True for the stream format, false for the file format.
    #[prost(bool, tag = "1")]
    pub stream: bool,
}

/// SAS7BDAT reader settings.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct SasHandlerConfig {
    /// Rows per emitted batch.
    #[prost(uint64, tag = "1")]
    pub rows_per_batch: u64,
}

/// Reader selection.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FileHandlerConfig {
    /// Reader variant.
    #[prost(oneof = "file_handler_config::Kind", tags = "1, 2, 3, 4")]
    pub kind: Option<file_handler_config::Kind>,
}

/// Nested types for [`FileHandlerConfig`].
pub mod file_handler_config {
    /// Reader variant.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        /// Delimited text.
        #[prost(message, tag = "1")]
        Csv(super::CsvHandlerConfig),
        /// Fixed-width records.
        #[prost(message, tag = "2")]
        Legacy(super::LegacyHandlerConfig),
        /// Arrow IPC.
        #[prost(message, tag = "3")]
        Ipc(super::IpcHandlerConfig),
        /// SAS7BDAT.
        #[prost(message, tag = "4")]
        Sas(super::SasHandlerConfig),
    }
}

// ============================================================================
// SECTION: Job Configuration
// ============================================================================

/// Input source and its reader.
#[derive(Clone, PartialEq, prost::Message)]
pub struct InputConfig {
    /// Data source descriptor.
    #[prost(message, optional, tag = "1")]
    pub generator: Option<ComponentConfig>,
    /// Reader applied to each datum.
    #[prost(message, optional, tag = "2")]
    pub filehandler: Option<FileHandlerConfig>,
}

/// Sampling pass settings.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct SamplerConfig {
    /// Inputs sampled.
    #[prost(uint32, tag = "1")]
    pub ndatums: u32,
    /// Blocks sampled per input.
    #[prost(uint32, tag = "2")]
    pub nchunks: u32,
    /// Sampling seed.
    #[prost(uint64, tag = "3")]
    pub seed: u64,
}

/// Complete job configuration.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Configuration {
    /// Configuration id; empty means derive from the content hash.
    #[prost(string, tag = "1")]
    pub uuid: String,
    /// Configuration name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Input settings.
    #[prost(message, optional, tag = "3")]
    pub input: Option<InputConfig>,
    /// Tool descriptors.
    #[prost(message, repeated, tag = "4")]
    pub tools: Vec<ComponentConfig>,
    /// Algorithm descriptors.
    #[prost(message, repeated, tag = "5")]
    pub algos: Vec<ComponentConfig>,
    /// Sampling settings.
    #[prost(message, optional, tag = "6")]
    pub sampler: Option<SamplerConfig>,
    /// Memory budget for in-flight leaf data.
    #[prost(uint64, tag = "7")]
    pub max_malloc_size_bytes: u64,
}
