// crates/strata-cli/src/commands.rs
// ============================================================================
// Module: CLI Commands
// Description: Job execution and store catalog queries.
// Purpose: Implement `run`, `list`, and `inspect` over an object store.
// Dependencies: serde_json, strata-config, strata-core, strata-providers, tracing
// ============================================================================

//! ## Overview
//! `run` registers the job file's menu and configuration in its store, builds
//! the job record, and drives a controller holding the built-in registry to a
//! terminal state. With a log capture the controller is stepped through
//! configuration first, since the log object needs the job's dataset and
//! index, and the captured output is written to that object afterwards.
//! `list` and `inspect` only read the catalog and object payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use serde_json::json;
use strata_config::JobConfig;
use strata_core::Controller;
use strata_core::JobContext;
use strata_core::ObjectStore;
use strata_core::proto::Configuration;
use strata_core::proto::FileType;
use strata_core::proto::JobInfo;
use strata_core::proto::JobState;
use strata_core::proto::Menu;
use strata_core::proto::cronus_object::Info;
use strata_providers::builtin_registry;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::error::CliResult;
use crate::logging::LogCapture;
use crate::report::ObjectList;
use crate::report::ObjectReport;
use crate::report::ObjectRow;
use crate::report::RunReport;
use crate::report::TableRow;

// ============================================================================
// SECTION: Run
// ============================================================================

/// Runs the job described by `config` to a terminal state.
///
/// An aborted job is reported, not returned as an error.
///
/// # Errors
///
/// Returns [`crate::CliError`] when the store cannot be opened, the menu or
/// configuration cannot be registered, or the captured log cannot be stored.
pub fn run_job(config: &JobConfig, capture: Option<&LogCapture>) -> CliResult<RunReport> {
    let job = &config.job;
    let store_id = (!job.store_id.is_empty()).then_some(job.store_id.as_str());
    let mut store = ObjectStore::new(Path::new(&job.store_path), &job.store_name, store_id)?;
    let menu = store.register_menu(&config.to_menu())?;
    let configuration = store.register_config(&config.to_configuration())?;
    info!(store_id = %store.uuid(), menu = %menu.uuid, config = %configuration.uuid, "registered job inputs");

    let info = config.job_info(&menu.uuid, &configuration.uuid);
    let mut controller = Controller::with_context(JobContext::new(info, store), builtin_registry()?);
    let log_id = if capture.is_some() { reserve_log(&mut controller) } else { None };

    if !controller.control()
        && let Some(fault) = controller.fault()
    {
        error!(job = %job.name, error = %fault, "job aborted");
    }

    if let (Some(capture), Some(log_id)) = (capture, log_id.as_deref()) {
        controller.context().store().put(log_id, &capture.contents())?;
    }
    Ok(run_report(&controller, log_id))
}

/// Steps through configuration and reserves the job's log object.
fn reserve_log(controller: &mut Controller) -> Option<String> {
    if !controller.step() {
        return None;
    }
    match controller.context_mut().register_log() {
        Ok(log) => Some(log.uuid),
        Err(err) => {
            warn!(error = %err, "job log not reserved");
            None
        }
    }
}

/// Report of a finished controller.
fn run_report(controller: &Controller, log_id: Option<String>) -> RunReport {
    let ctx = controller.context();
    let meta = ctx.meta();
    let summary = meta.summary.clone().unwrap_or_default();
    RunReport {
        job: meta.name.clone(),
        store_id: meta.store_id.clone(),
        dataset_id: ctx.output_id().to_string(),
        job_id: ctx.job_id(),
        state: controller.state().label().to_string(),
        phases: controller.history().iter().map(|s| s.label().to_string()).collect(),
        processed_bytes: summary.processed_bytes,
        processed_ndatums: summary.processed_ndatums,
        tables: summary.tables.iter().map(TableRow::from).collect(),
        fault: controller.fault().map(ToString::to_string),
        log_id,
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Lists catalog objects whose names match `prefix` and `suffix`.
///
/// # Errors
///
/// Returns [`crate::CliError::Store`] when the store cannot be loaded.
pub fn list_objects(
    store_path: &Path,
    store_name: &str,
    store_id: &str,
    prefix: &str,
    suffix: &str,
) -> CliResult<ObjectList> {
    let store = ObjectStore::load(store_path, store_name, store_id)?;
    let objects = store
        .list(prefix, suffix)
        .into_iter()
        .map(|meta| {
            let kind = store.object(&meta.uuid).ok().and_then(|o| o.info.as_ref()).map_or("unknown", Info::kind);
            ObjectRow::new(kind, meta)
        })
        .collect();
    Ok(ObjectList {
        store_id: store.uuid().to_string(),
        objects,
    })
}

/// Describes one object and decodes its payload where it is a message.
///
/// # Errors
///
/// Returns [`crate::CliError::Store`] when the store cannot be loaded, the id
/// is unknown, or a message payload cannot be read.
pub fn inspect_object(store_path: &Path, store_name: &str, store_id: &str, id: &str) -> CliResult<ObjectReport> {
    let store = ObjectStore::load(store_path, store_name, store_id)?;
    let object = store.object(id)?;
    let kind = object.info.as_ref().map_or("unknown", Info::kind);
    let mut details = BTreeMap::new();
    match &object.info {
        Some(Info::Menu(_)) => {
            let menu: Menu = store.get_message(id)?;
            let nodes: Vec<String> = menu
                .chains
                .iter()
                .flat_map(|chain| chain.nodes.iter())
                .map(|node| format!("{} <- [{}] : [{}]", node.name, node.parents.join(", "), node.algorithms.join(", ")))
                .collect();
            details.insert("menu".to_string(), json!(menu.name));
            details.insert("chains".to_string(), json!(menu.chains.len()));
            details.insert("nodes".to_string(), json!(nodes));
        }
        Some(Info::Config(_)) => {
            let config: Configuration = store.get_message(id)?;
            let source = config.input.as_ref().and_then(|i| i.generator.as_ref()).map(|g| g.class.clone());
            details.insert("config".to_string(), json!(config.name));
            details.insert("source".to_string(), json!(source));
            details.insert("tools".to_string(), json!(names(config.tools.iter().map(|t| &t.name))));
            details.insert("algorithms".to_string(), json!(names(config.algos.iter().map(|a| &a.name))));
            details.insert("max_malloc_size_bytes".to_string(), json!(config.max_malloc_size_bytes));
        }
        Some(Info::Dataset(dataset)) => {
            details.insert("partitions".to_string(), json!(dataset.partitions));
            details.insert("jobs".to_string(), json!(dataset.jobs.len()));
            details.insert("next_job".to_string(), json!(dataset.job_idx));
            details.insert("files".to_string(), json!(dataset.files.len()));
            details.insert("tables".to_string(), json!(dataset.tables.len()));
            details.insert("hists".to_string(), json!(dataset.hists.len()));
            details.insert("tdigests".to_string(), json!(dataset.tdigests.len()));
            details.insert("logs".to_string(), json!(dataset.logs.len()));
        }
        Some(Info::File(file)) => {
            let file_type = FileType::try_from(file.file_type).map_or("unknown", FileType::extension);
            details.insert("file_type".to_string(), json!(file_type));
            details.insert("size_bytes".to_string(), json!(file.size_bytes));
            details.insert("blocks".to_string(), json!(file.blocks.len()));
            details.insert("columns".to_string(), json!(file.columns));
        }
        Some(Info::Table(table)) => {
            details.insert("file".to_string(), json!(table.file_uuid));
            details.insert("num_rows".to_string(), json!(table.num_rows));
            details.insert("num_batches".to_string(), json!(table.num_batches));
            details.insert("columns".to_string(), json!(table.columns));
        }
        Some(Info::Hists(hists)) => {
            details.insert("keys".to_string(), json!(hists.keys));
        }
        Some(Info::Tdigests(digests)) => {
            details.insert("keys".to_string(), json!(digests.keys));
        }
        Some(Info::Job(_)) => job_details(&store.get_message(id)?, &mut details),
        Some(Info::Log(log)) => {
            let text = store.get(id).map(|bytes| String::from_utf8_lossy(&bytes).into_owned()).unwrap_or_default();
            details.insert("job_id".to_string(), json!(log.job_id));
            details.insert("lines".to_string(), json!(text.lines().count()));
            details.insert("size_bytes".to_string(), json!(text.len()));
        }
        None => {}
    }
    Ok(ObjectReport {
        object: ObjectRow::new(kind, store.meta(id)?),
        details,
    })
}

/// Fields of a stored job record.
fn job_details(job: &JobInfo, details: &mut BTreeMap<String, Value>) {
    let state = JobState::try_from(job.state).map_or("UNKNOWN", JobState::label);
    let summary = job.summary.clone().unwrap_or_default();
    let timers: Vec<String> =
        summary.timers.iter().map(|t| format!("{} {:.3} +- {:.3} ms", t.name, t.time, t.std)).collect();
    details.insert("job".to_string(), json!(job.name));
    details.insert("job_id".to_string(), json!(job.job_id));
    details.insert("state".to_string(), json!(state));
    details.insert("processed_bytes".to_string(), json!(summary.processed_bytes));
    details.insert("processed_ndatums".to_string(), json!(summary.processed_ndatums));
    details.insert("tables".to_string(), json!(summary.tables.len()));
    details.insert("timers".to_string(), json!(timers));
    if let Some(duration) = summary.job_time {
        details.insert("job_seconds".to_string(), json!(duration.seconds));
    }
}

/// Owned copies of component names.
fn names<'a>(iter: impl Iterator<Item = &'a String>) -> Vec<String> {
    iter.cloned().collect()
}
