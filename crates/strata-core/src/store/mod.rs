// crates/strata-core/src/store/mod.rs
// ============================================================================
// Module: Strata Object Store
// Description: Content-addressed catalog over a flat filesystem directory.
// Purpose: Register, persist, and retrieve every artifact a job touches.
// Dependencies: crate::{core, proto}, prost, url
// ============================================================================

//! ## Overview
//! The store keeps one binary catalog (the metastore) describing every object
//! and a flat directory holding the object payloads. Object ids are either
//! content hashes (immutable inputs) or random ids (generated artifacts).
//! Errors are typed so callers can distinguish missing objects from
//! misconfigured parents or I/O faults.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod backend;
pub mod meta;
pub mod object_store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::FilesystemKv;
pub use meta::ContentKeys;
pub use meta::MetaObject;
pub use object_store::ObjectStore;
pub use object_store::StoreStream;

// ============================================================================
// SECTION: Errors
// ============================================================================

use thiserror::Error;

/// Object store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Object or payload does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Parent dataset, partition, or job is missing or of the wrong kind.
    #[error("invalid parent: {0}")]
    InvalidParent(String),
    /// Object id already registered.
    #[error("duplicate object id: {0}")]
    DuplicateKey(String),
    /// Filesystem failure.
    #[error("store io error: {0}")]
    Io(String),
    /// Persisted data failed to decode or verify.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Request is not valid for this object kind.
    #[error("invalid store request: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(err.to_string())
        } else {
            Self::Io(err.to_string())
        }
    }
}
