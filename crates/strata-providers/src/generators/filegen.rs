// crates/strata-providers/src/generators/filegen.rs
// ============================================================================
// Module: File Generator
// Description: Directory listing source filtered by a wildcard pattern.
// Purpose: Feed jobs with files that already exist on disk.
// Dependencies: rand, strata-core, tracing
// ============================================================================

//! ## Overview
//! Lists the regular files directly under `path` whose names match `glob`
//! (`*` and `?` wildcards, default `*`). The list is sorted by path at
//! initialize and yielded in that order; sampling draws without replacement
//! uniformly from it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;

use rand::rngs::StdRng;
use strata_core::ComponentError;
use strata_core::DataSource;
use strata_core::InputDatum;
use strata_core::Properties;
use strata_core::core::wildcard_match;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Registered class name.
pub const FILE_GENERATOR_CLASS: &str = "filegen";

/// Directory file source.
#[derive(Debug)]
pub struct FileGenerator {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Directory scanned.
    root: PathBuf,
    /// File name pattern.
    glob: String,
    /// Matching files, sorted.
    files: Vec<PathBuf>,
    /// Next file index.
    cursor: usize,
}

impl FileGenerator {
    /// Creates the generator. The directory is scanned at initialize.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Property`] when `path` is missing.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let root = PathBuf::from(properties.require_str("path")?);
        let glob = properties.str_or("glob", "*")?;
        Ok(Self {
            name: name.to_string(),
            properties,
            root,
            glob,
            files: Vec::new(),
            cursor: 0,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`FileGenerator::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn DataSource>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }

    /// Files found by the last scan.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Rescans the directory.
    fn scan(&mut self) -> Result<(), ComponentError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if wildcard_match(&self.glob, &file_name.to_string_lossy()) {
                files.push(entry.path());
            }
        }
        files.sort();
        self.files = files;
        Ok(())
    }
}

impl DataSource for FileGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn initialize(&mut self) -> Result<(), ComponentError> {
        self.scan()?;
        self.cursor = 0;
        if self.files.is_empty() {
            warn!(generator = %self.name, path = %self.root.display(), glob = %self.glob, "no files match");
        }
        info!(generator = %self.name, files = self.files.len(), "file generator ready");
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_datum(&mut self) -> Result<Option<InputDatum>, ComponentError> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(InputDatum::Path(path.clone())))
    }

    fn sample(&mut self, n: usize, rng: &mut StdRng) -> Result<Vec<InputDatum>, ComponentError> {
        let picks = rand::seq::index::sample(rng, self.files.len(), n.min(self.files.len()));
        Ok(picks.into_iter().map(|index| InputDatum::Path(self.files[index].clone())).collect())
    }
}
