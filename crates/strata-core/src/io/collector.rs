// crates/strata-core/src/io/collector.rs
// ============================================================================
// Module: Strata Collector
// Description: Routes leaf output of the execution tree to per-leaf writers.
// Purpose: Own the buffered writers of a job and finalize them together.
// Dependencies: tracing, crate::{io, proto, runtime}
// ============================================================================

//! ## Overview
//! The collector keeps one [`BufferOutputWriter`] per leaf of the menu,
//! named `writer_<leaf>` and created lazily on the first batch. Each leaf is
//! its own output partition. All writers share the options of the
//! `bufferwriter` tool descriptor in the job configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::debug;
use tracing::info;

use super::writer::BufferOutputWriter;
use super::writer::WriterConfig;
use super::writer::WriterError;
use crate::core::Properties;
use crate::proto::ComponentConfig;
use crate::proto::RecordBatchFileInfo;
use crate::runtime::ExecutionTree;
use crate::runtime::JobContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Class name of the tool descriptor that configures the writers.
pub const BUFFER_WRITER_CLASS: &str = "bufferwriter";

// ============================================================================
// SECTION: Collector
// ============================================================================

/// Per-leaf writer orchestration.
#[derive(Debug)]
pub struct Collector {
    /// Shared writer options.
    config: WriterConfig,
    /// Leaf nodes, in topological order.
    leaves: Vec<String>,
    /// Writers by leaf.
    writers: BTreeMap<String, BufferOutputWriter>,
    /// Allocation ceiling reported against, in bytes.
    max_malloc: u64,
}

impl Collector {
    /// Creates a collector for the given leaves.
    #[must_use]
    pub fn new(leaves: Vec<String>, config: WriterConfig) -> Self {
        Self {
            config,
            leaves,
            writers: BTreeMap::new(),
            max_malloc: 0,
        }
    }

    /// Creates a collector configured from the `bufferwriter` descriptor, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Property`] when the descriptor holds mistyped values.
    pub fn from_tools(leaves: Vec<String>, tools: &[ComponentConfig]) -> Result<Self, WriterError> {
        let config = match tools.iter().find(|t| t.class == BUFFER_WRITER_CLASS || t.name == BUFFER_WRITER_CLASS) {
            Some(descriptor) => {
                let props = descriptor.properties.as_ref().map(Properties::from_message).unwrap_or_default();
                WriterConfig::from_properties(&props)?
            }
            None => WriterConfig::default(),
        };
        Ok(Self::new(leaves, config))
    }

    /// Sets the allocation ceiling reported at collect time.
    #[must_use]
    pub const fn with_max_malloc(mut self, max_malloc: u64) -> Self {
        self.max_malloc = max_malloc;
        self
    }

    /// Shared writer options.
    #[must_use]
    pub const fn config(&self) -> WriterConfig {
        self.config
    }

    /// Leaf partitions.
    #[must_use]
    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }

    /// Writer of a leaf, once it has received output.
    #[must_use]
    pub fn writer(&self, leaf: &str) -> Option<&BufferOutputWriter> {
        self.writers.get(leaf)
    }

    /// Registers one output partition per leaf on the output dataset.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Store`] when the dataset is missing.
    pub fn initialize(&mut self, ctx: &mut JobContext) -> Result<(), WriterError> {
        for leaf in &self.leaves {
            ctx.new_partition(leaf)?;
        }
        debug!(leaves = self.leaves.len(), budget = self.config.max_size, "collector initialized");
        Ok(())
    }

    /// Hands every leaf batch of the tree to its writer.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError`] when a writer fails to persist a full file.
    pub fn collect(&mut self, tree: &ExecutionTree, ctx: &mut JobContext) -> Result<(), WriterError> {
        for (leaf, batch) in tree.leaf_batches() {
            let config = self.config;
            let writer = self
                .writers
                .entry(leaf.to_string())
                .or_insert_with(|| BufferOutputWriter::new(leaf, config));
            writer.write(batch, ctx)?;
        }
        let buffered: u64 = self.writers.values().map(BufferOutputWriter::buffered_bytes).sum();
        debug!(buffered, max_malloc = self.max_malloc, "collector allocation");
        Ok(())
    }

    /// Finalizes every writer and records the produced files in the job summary.
    ///
    /// # Errors
    ///
    /// Returns the first [`WriterError`]; later writers are still finalized.
    pub fn finalize(&mut self, ctx: &mut JobContext) -> Result<Vec<RecordBatchFileInfo>, WriterError> {
        let mut first_error = None;
        let mut files = Vec::new();
        for writer in self.writers.values_mut() {
            match writer.finalize(ctx) {
                Ok(produced) => files.extend_from_slice(produced),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        // Abort may finalize after a clean finalize; record each file once.
        let summary = ctx.summary_mut();
        for file in &files {
            if !summary.tables.iter().any(|t| t.name == file.name) {
                summary.tables.push(file.clone());
            }
        }
        info!(writers = self.writers.len(), files = files.len(), "collector finalized");
        first_error.map_or(Ok(files), Err)
    }
}
