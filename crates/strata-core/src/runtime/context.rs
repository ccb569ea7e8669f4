// crates/strata-core/src/runtime/context.rs
// ============================================================================
// Module: Strata Job Context
// Description: Per-job state shared by the controller and its components.
// Purpose: Hold the store, metric books, tools, and job metadata of one run.
// Dependencies: prost, tracing, crate::{core, interfaces, metrics, proto, store}
// ============================================================================

//! ## Overview
//! A [`JobContext`] is created once per job and passed by mutable reference
//! to every phase of the controller and every component call. It owns the
//! [`ObjectStore`], the job's [`HistogramBook`] and [`TDigestBook`], the
//! instantiated tools, and the [`JobInfo`] that becomes the persisted job
//! record at the end of the run.
//!
//! Output objects attach to the job's dataset (`dataset_id`). Inputs are
//! registered on the parent dataset when one is named, else on the output
//! dataset itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use prost::Message;
use tracing::info;
use tracing::warn;

use crate::core::now_timestamp;
use crate::core::time::duration_between;
use crate::interfaces::ToolStore;
use crate::metrics::HistogramBook;
use crate::metrics::TDigestBook;
use crate::proto::Configuration;
use crate::proto::Duration;
use crate::proto::HistsObjectInfo;
use crate::proto::JobInfo;
use crate::proto::JobObjectInfo;
use crate::proto::JobState;
use crate::proto::JobSummary;
use crate::proto::Menu;
use crate::proto::TDigestObjectInfo;
use crate::proto::TableObjectInfo;
use crate::proto::TimerSummary;
use crate::proto::cronus_object::Info;
use crate::store::ContentKeys;
use crate::store::MetaObject;
use crate::store::ObjectStore;
use crate::store::StoreError;

// ============================================================================
// SECTION: Job Context
// ============================================================================

/// Mutable state of one job.
#[derive(Debug)]
pub struct JobContext {
    /// Job record, persisted at finalize.
    meta: JobInfo,
    /// Object store of the job.
    store: ObjectStore,
    /// Menu loaded at configure.
    menu: Option<Menu>,
    /// Configuration loaded at configure.
    config: Option<Configuration>,
    /// Histograms and timers.
    hbook: HistogramBook,
    /// Column distributions.
    tbook: TDigestBook,
    /// Instantiated tools.
    tools: ToolStore,
    /// Input file currently executing.
    current_file: Option<String>,
    /// Header columns of the current input.
    current_columns: Vec<String>,
    /// Reserved log object.
    log_id: Option<String>,
    /// Records written by [`JobContext::finalize_job`] so far.
    written: FinalizeProgress,
}

/// Job artifacts already registered by finalization.
#[derive(Debug, Default)]
struct FinalizeProgress {
    /// Histogram collection registered.
    hists: bool,
    /// T-digest collection registered.
    tdigests: bool,
    /// Job record id, once registered.
    job: Option<String>,
    /// Store saved after the job record.
    saved: bool,
}

impl JobContext {
    /// Opens the store named by `info` and wraps it in a context.
    ///
    /// An empty `store_id` creates a new store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be opened.
    pub fn open(info: JobInfo) -> Result<Self, StoreError> {
        let store_id = (!info.store_id.is_empty()).then_some(info.store_id.as_str());
        let store = ObjectStore::new(Path::new(&info.store_path), &info.store_name, store_id)?;
        Ok(Self::new(info, store))
    }

    /// Wraps an already open store.
    #[must_use]
    pub fn new(mut info: JobInfo, store: ObjectStore) -> Self {
        if info.store_id.is_empty() {
            info.store_id = store.uuid().to_string();
        }
        Self {
            meta: info,
            store,
            menu: None,
            config: None,
            hbook: HistogramBook::new(),
            tbook: TDigestBook::new(),
            tools: ToolStore::new(),
            current_file: None,
            current_columns: Vec::new(),
            log_id: None,
            written: FinalizeProgress::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Job record.
    #[must_use]
    pub const fn meta(&self) -> &JobInfo {
        &self.meta
    }

    /// Mutable job record.
    pub const fn meta_mut(&mut self) -> &mut JobInfo {
        &mut self.meta
    }

    /// Job index within the output dataset.
    #[must_use]
    pub const fn job_id(&self) -> u64 {
        self.meta.job_id
    }

    /// Output dataset id.
    #[must_use]
    pub fn output_id(&self) -> &str {
        &self.meta.dataset_id
    }

    /// Dataset that input files are registered on.
    #[must_use]
    pub fn input_id(&self) -> &str {
        if self.meta.parentset_id.is_empty() { &self.meta.dataset_id } else { &self.meta.parentset_id }
    }

    /// Current job state.
    #[must_use]
    pub fn state(&self) -> JobState {
        JobState::try_from(self.meta.state).unwrap_or(JobState::Starting)
    }

    /// Records a state transition on the job record.
    pub fn set_state(&mut self, state: JobState) {
        self.meta.state = state as i32;
    }

    /// Object store.
    #[must_use]
    pub const fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Mutable object store.
    pub const fn store_mut(&mut self) -> &mut ObjectStore {
        &mut self.store
    }

    /// Releases the store.
    #[must_use]
    pub fn into_store(self) -> ObjectStore {
        self.store
    }

    /// Menu loaded at configure.
    #[must_use]
    pub const fn menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    /// Stores the loaded menu.
    pub fn set_menu(&mut self, menu: Menu) {
        self.menu = Some(menu);
    }

    /// Configuration loaded at configure.
    #[must_use]
    pub const fn config(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    /// Stores the loaded configuration.
    pub fn set_config(&mut self, config: Configuration) {
        self.config = Some(config);
    }

    /// Histogram book.
    #[must_use]
    pub const fn hbook(&self) -> &HistogramBook {
        &self.hbook
    }

    /// Mutable histogram book.
    pub const fn hbook_mut(&mut self) -> &mut HistogramBook {
        &mut self.hbook
    }

    /// T-digest book.
    #[must_use]
    pub const fn tbook(&self) -> &TDigestBook {
        &self.tbook
    }

    /// Mutable t-digest book.
    pub const fn tbook_mut(&mut self) -> &mut TDigestBook {
        &mut self.tbook
    }

    /// Tool store.
    #[must_use]
    pub const fn tools(&self) -> &ToolStore {
        &self.tools
    }

    /// Mutable tool store.
    pub const fn tools_mut(&mut self) -> &mut ToolStore {
        &mut self.tools
    }

    /// Input file currently executing.
    #[must_use]
    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    /// Header columns of the current input.
    #[must_use]
    pub fn current_columns(&self) -> &[String] {
        &self.current_columns
    }

    /// Marks the input that following blocks come from.
    pub fn set_current_file(&mut self, name: &str, columns: &[String]) {
        self.current_file = Some(name.to_string());
        self.current_columns = columns.to_vec();
    }

    /// Reserved log object id.
    #[must_use]
    pub fn log_id(&self) -> Option<&str> {
        self.log_id.as_deref()
    }

    /// Job summary, created on first use.
    pub fn summary_mut(&mut self) -> &mut JobSummary {
        self.meta.summary.get_or_insert_with(JobSummary::default)
    }

    /// Adds to the processed counters.
    pub fn add_processed(&mut self, bytes: u64, ndatums: u64) {
        let summary = self.summary_mut();
        summary.processed_bytes += bytes;
        summary.processed_ndatums += ndatums;
    }

    /// Stamps the start time.
    pub fn start(&mut self) {
        self.meta.started = Some(now_timestamp());
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers a partition key on the output dataset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the dataset is missing.
    pub fn new_partition(&mut self, key: &str) -> Result<(), StoreError> {
        self.store.new_partition(&self.meta.dataset_id, key)
    }

    /// Registers a payload on the output dataset, in `partition` when given.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::register_content`].
    pub fn register_content(
        &mut self,
        content: &[u8],
        info: Info,
        partition: Option<&str>,
    ) -> Result<MetaObject, StoreError> {
        let keys = match partition {
            Some(partition) => ContentKeys::partition(&self.meta.dataset_id, self.meta.job_id, partition),
            None => ContentKeys::job(&self.meta.dataset_id, self.meta.job_id),
        };
        self.store.register_content(content, info, &keys)
    }

    /// Registers a table describing an output file.
    ///
    /// # Errors
    ///
    /// See [`ObjectStore::register_table`].
    pub fn register_table(
        &mut self,
        info: TableObjectInfo,
        schema_bytes: &[u8],
        partition: &str,
        file_id: &str,
    ) -> Result<MetaObject, StoreError> {
        let keys = ContentKeys::partition(&self.meta.dataset_id, self.meta.job_id, partition).with_file(file_id);
        self.store.register_table(info, schema_bytes, &keys)
    }

    /// Reserves a log object for the job.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the dataset is missing.
    pub fn register_log(&mut self) -> Result<MetaObject, StoreError> {
        let log = self.store.register_log(&self.meta.dataset_id, self.meta.job_id)?;
        self.log_id = Some(log.uuid.clone());
        Ok(log)
    }

    // ------------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------------

    /// Writes the job record, histograms, and t-digests, then saves the store.
    ///
    /// The live job state is left to the caller; the record carries `state`.
    /// Each artifact is registered at most once: after a partial failure, a
    /// later call only rewrites the job record with the new state and retries
    /// what is missing. A call after a completed one is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when registration or the store save fails.
    pub fn finalize_job(&mut self, state: JobState) -> Result<(), StoreError> {
        if self.written.saved {
            warn!(job_id = self.meta.job_id, "job record already written");
            return Ok(());
        }
        let finished = now_timestamp();
        let started = *self.meta.started.get_or_insert(finished);
        let job_time = duration_between(&started, &finished);
        self.meta.finished = Some(finished);
        let timers = self.timer_summaries();
        let summary = self.summary_mut();
        summary.job_time = Some(job_time);
        summary.timers = timers;

        if !self.written.hists && !self.hbook.is_empty() {
            let keys = self.hbook.keys().map(str::to_string).collect();
            let bytes = self.hbook.to_message().encode_to_vec();
            self.register_content(&bytes, Info::Hists(HistsObjectInfo { keys }), None)?;
            self.written.hists = true;
        }
        if !self.written.tdigests && !self.tbook.is_empty() {
            let keys = self.tbook.keys().map(str::to_string).collect();
            let bytes = self.tbook.to_message().encode_to_vec();
            self.register_content(&bytes, Info::Tdigests(TDigestObjectInfo { keys }), None)?;
            self.written.tdigests = true;
        }
        let record = JobInfo {
            state: state as i32,
            ..self.meta.clone()
        };
        let bytes = record.encode_to_vec();
        match self.written.job.clone() {
            Some(id) => {
                self.store.set_job_state(&id, state)?;
                self.store.put(&id, &bytes)?;
            }
            None => {
                let job = JobObjectInfo {
                    state: state as i32,
                    job_id: self.meta.job_id,
                };
                let meta = self.register_content(&bytes, Info::Job(job), None)?;
                self.written.job = Some(meta.uuid);
            }
        }
        self.store.save_store()?;
        self.written.saved = true;
        self.report(state, job_time);
        Ok(())
    }

    /// Mean and deviation of every booked key containing `time`.
    fn timer_summaries(&self) -> Vec<TimerSummary> {
        self.hbook
            .iter()
            .filter(|(key, hist)| key.contains("time") && hist.entries() > 0)
            .map(|(key, hist)| TimerSummary {
                name: key.to_string(),
                time: hist.mean(),
                std: hist.std(),
            })
            .collect()
    }

    /// Logs the job report.
    #[allow(clippy::cast_precision_loss, reason = "Report values are approximate.")]
    fn report(&self, state: JobState, job_time: Duration) {
        let seconds = job_time.seconds as f64 + f64::from(job_time.nanos) / 1e9;
        let summary = self.meta.summary.clone().unwrap_or_default();
        info!(
            job = %self.meta.name,
            job_id = self.meta.job_id,
            dataset_id = %self.meta.dataset_id,
            state = state.label(),
            seconds,
            ndatums = summary.processed_ndatums,
            bytes = summary.processed_bytes,
            "job report"
        );
        for timer in &summary.timers {
            info!(timer = %timer.name, mean_ms = timer.time, std_ms = timer.std, "job timer");
        }
        for metric in ["payload", "blocksize", "nblocks"] {
            for (key, hist) in self.hbook.get_matching(&format!("*.{metric}")) {
                if hist.entries() > 0 {
                    info!(metric = key, mean = hist.mean(), unit = hist.axis_name(), "job input");
                }
            }
        }
    }
}
