// crates/strata-core/src/proto/mod.rs
// ============================================================================
// Module: Strata Wire Messages
// Description: Protobuf message definitions for store, job, and metrics records.
// Purpose: Provide the persisted binary format for every store artifact.
// Dependencies: prost
// ============================================================================

//! ## Overview
//! Messages are declared directly with `prost` derives so the workspace needs
//! no code generation step. Field tags are stable; new fields must take new
//! tags. Maps use `btree_map` so encoding is deterministic.

// ============================================================================
// SECTION: Submodules
// ============================================================================

mod common;
mod configuration;
mod cronus;
mod histogram;
mod job;
mod menu;
mod tdigest;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use common::Duration;
pub use common::Timestamp;
pub use configuration::ComponentConfig;
pub use configuration::Configuration;
pub use configuration::CsvHandlerConfig;
pub use configuration::FieldSpec;
pub use configuration::FileHandlerConfig;
pub use configuration::InputConfig;
pub use configuration::IpcHandlerConfig;
pub use configuration::LegacyHandlerConfig;
pub use configuration::Properties;
pub use configuration::PropertyValue;
pub use configuration::SamplerConfig;
pub use configuration::SasHandlerConfig;
pub use configuration::StringList;
pub use configuration::file_handler_config;
pub use configuration::property_value;
pub use cronus::BlockInfo;
pub use cronus::ConfigObjectInfo;
pub use cronus::CronusObject;
pub use cronus::CronusObjectStore;
pub use cronus::CronusStoreInfo;
pub use cronus::DatasetObjectInfo;
pub use cronus::FileObjectInfo;
pub use cronus::FileType;
pub use cronus::HistsObjectInfo;
pub use cronus::JobObjectInfo;
pub use cronus::LogObjectInfo;
pub use cronus::MenuObjectInfo;
pub use cronus::TDigestObjectInfo;
pub use cronus::TableObjectInfo;
pub use cronus::Transform;
pub use cronus::cronus_object;
pub use histogram::HistogramCollection;
pub use histogram::HistogramMessage;
pub use job::JobInfo;
pub use job::JobState;
pub use job::JobSummary;
pub use job::RecordBatchFileInfo;
pub use job::TimerSummary;
pub use menu::Chain;
pub use menu::Menu;
pub use menu::Node;
pub use tdigest::Centroid;
pub use tdigest::TDigestInstance;
pub use tdigest::TDigestStore;
