// crates/strata-cli/src/report.rs
// ============================================================================
// Module: CLI Reports
// Description: Serializable command results and their text renderings.
// Purpose: Print the same result as JSON for tools or text for people.
// Dependencies: serde, serde_json, strata-core
// ============================================================================

//! ## Overview
//! Each command returns one report. JSON output serializes it as is; text
//! output uses `render_text`, one fact per line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;
use strata_core::MetaObject;
use strata_core::proto::RecordBatchFileInfo;

// ============================================================================
// SECTION: Run
// ============================================================================

/// Output table written by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// File object name.
    pub name: String,
    /// Rows.
    pub num_rows: u64,
    /// Batches.
    pub num_batches: u64,
    /// Columns.
    pub num_columns: u64,
}

impl From<&RecordBatchFileInfo> for TableRow {
    fn from(info: &RecordBatchFileInfo) -> Self {
        Self {
            name: info.name.clone(),
            num_rows: info.num_rows,
            num_batches: info.num_batches,
            num_columns: info.num_columns,
        }
    }
}

/// Outcome of `strata run`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Job name.
    pub job: String,
    /// Store the job ran in.
    pub store_id: String,
    /// Output dataset.
    pub dataset_id: String,
    /// Job index within the dataset.
    pub job_id: u64,
    /// Final state label.
    pub state: String,
    /// Every state entered, in order.
    pub phases: Vec<String>,
    /// Input bytes processed.
    pub processed_bytes: u64,
    /// Input files processed.
    pub processed_ndatums: u64,
    /// Output tables.
    pub tables: Vec<TableRow>,
    /// Failure that aborted the job.
    pub fault: Option<String>,
    /// Persisted log object, if any.
    pub log_id: Option<String>,
}

impl RunReport {
    /// True when the job reached `SUCCESS`.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state == "SUCCESS"
    }

    /// Human-readable summary.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "job: {} ({})", self.job, self.state);
        let _ = writeln!(out, "store: {}", self.store_id);
        let _ = writeln!(out, "dataset: {} job {}", self.dataset_id, self.job_id);
        let _ = writeln!(out, "processed: {} files, {} bytes", self.processed_ndatums, self.processed_bytes);
        for table in &self.tables {
            let _ = writeln!(
                out,
                "table: {} rows={} batches={} columns={}",
                table.name, table.num_rows, table.num_batches, table.num_columns
            );
        }
        if let Some(fault) = &self.fault {
            let _ = writeln!(out, "fault: {fault}");
        }
        if let Some(log_id) = &self.log_id {
            let _ = writeln!(out, "log: {log_id}");
        }
        out
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRow {
    /// Object kind label.
    pub kind: String,
    /// Object file name.
    pub name: String,
    /// Object id.
    pub uuid: String,
    /// Owning dataset or store.
    pub parent_uuid: String,
    /// Payload URL.
    pub address: String,
}

impl ObjectRow {
    /// Row for `meta` with the given kind label.
    #[must_use]
    pub fn new(kind: &str, meta: MetaObject) -> Self {
        Self {
            kind: kind.to_string(),
            name: meta.name,
            uuid: meta.uuid,
            parent_uuid: meta.parent_uuid,
            address: meta.address,
        }
    }
}

/// Outcome of `strata list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectList {
    /// Store id.
    pub store_id: String,
    /// Matching objects in catalog order.
    pub objects: Vec<ObjectRow>,
}

impl ObjectList {
    /// One tab-separated line per object.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for row in &self.objects {
            let _ = writeln!(out, "{}\t{}\t{}", row.kind, row.uuid, row.name);
        }
        out
    }
}

/// Outcome of `strata inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectReport {
    /// Catalog entry.
    pub object: ObjectRow,
    /// Kind-specific fields.
    pub details: BTreeMap<String, Value>,
}

impl ObjectReport {
    /// Catalog entry followed by `key: value` lines.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", self.object.kind, self.object.uuid);
        let _ = writeln!(out, "name: {}", self.object.name);
        let _ = writeln!(out, "parent: {}", self.object.parent_uuid);
        let _ = writeln!(out, "address: {}", self.object.address);
        for (key, value) in &self.details {
            match value {
                Value::String(text) => {
                    let _ = writeln!(out, "{key}: {text}");
                }
                other => {
                    let _ = writeln!(out, "{key}: {other}");
                }
            }
        }
        out
    }
}
