// crates/strata-core/src/store/backend.rs
// ============================================================================
// Module: Strata Filesystem Key-Value Backend
// Description: Flat-directory key/value storage with file URLs.
// Purpose: Persist object payloads under their object names.
// Dependencies: url
// ============================================================================

//! ## Overview
//! Keys are plain file names inside a single root directory; separators and
//! relative components are rejected so a key can never escape the root.
//! Writes go to a temporary sibling and are renamed into place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use url::Url;

use super::StoreError;

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Key/value storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct FilesystemKv {
    /// Canonical absolute root directory.
    root: PathBuf,
}

impl FilesystemKv {
    /// Opens (creating if needed) the root directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|err| StoreError::Io(err.to_string()))?;
        let root = fs::canonicalize(root).map_err(|err| StoreError::Io(err.to_string()))?;
        Ok(Self { root })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path backing a key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for keys that are not plain file names.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Returns the `file://` URL of a key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for invalid keys.
    pub fn url_for(&self, key: &str) -> Result<String, StoreError> {
        let path = self.path_for(key)?;
        Url::from_file_path(&path)
            .map(String::from)
            .map_err(|()| StoreError::Invalid(format!("not an absolute path: {}", path.display())))
    }

    /// Writes a payload.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the write or rename fails.
    pub fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = self.root.join(format!(".{key}.tmp"));
        fs::write(&tmp, bytes).map_err(|err| StoreError::Io(err.to_string()))?;
        fs::rename(&tmp, &path).map_err(|err| StoreError::Io(err.to_string()))
    }

    /// Reads a payload.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for absent keys.
    pub fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(StoreError::from)
    }

    /// Returns true when a payload exists for the key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_ok_and(|path| path.is_file())
    }
}

/// Converts a `file://` address into a filesystem path.
///
/// # Errors
///
/// Returns [`StoreError::Corrupt`] when the address is not a file URL.
pub fn path_from_address(address: &str) -> Result<PathBuf, StoreError> {
    let url = Url::parse(address).map_err(|err| StoreError::Corrupt(format!("{address}: {err}")))?;
    url.to_file_path().map_err(|()| StoreError::Corrupt(format!("not a file url: {address}")))
}

/// Rejects keys that would leave the root directory.
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key == "." || key == ".." || key.contains('/') || key.contains('\\') {
        return Err(StoreError::Invalid(format!("invalid object key: {key:?}")));
    }
    Ok(())
}
