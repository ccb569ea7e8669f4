// crates/strata-core/src/runtime/controller.rs
// ============================================================================
// Module: Strata Job Controller
// Description: Phase state machine driving one job from configure to finish.
// Purpose: Sequence steering, reading, and collection with abort on failure.
// Dependencies: rand, thiserror, tracing, crate::{interfaces, io, menu, registry, store}
// ============================================================================

//! ## Overview
//! The controller walks a fixed sequence of phases:
//!
//! `STARTING → CONFIGURE → LOCK → INITIALIZE → BOOK → SAMPLE → REBOOK →
//! EXECUTE → FINALIZE → SUCCESS`
//!
//! [`Controller::step`] runs exactly one phase, which lets callers observe
//! the job between phases; [`Controller::control`] runs them all. The first
//! failure in any phase is logged, kept as [`Controller::fault`], and moves
//! the job to `ABORT`. Abort flushes the collector so partial output stays
//! discoverable, then writes the job record. A store `Io` failure during that
//! write is logged and dropped; any other cleanup failure is kept as
//! [`Controller::cleanup_fault`]. No phase runs after `ABORT`.
//!
//! The controller's own metrics are booked under the `artemis` component.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::field;
use tracing::info;
use tracing::info_span;
use tracing::warn;

use super::JobContext;
use super::steering::Steering;
use super::steering::SteeringError;
use crate::interfaces::ComponentError;
use crate::interfaces::DataSource;
use crate::interfaces::InputDatum;
use crate::io::Collector;
use crate::io::FileHandler;
use crate::io::ReaderError;
use crate::io::WriterError;
use crate::io::collector::BUFFER_WRITER_CLASS;
use crate::menu::MenuError;
use crate::menu::MenuGraph;
use crate::metrics::MetricsError;
use crate::metrics::Stopwatch;
use crate::metrics::float_range;
use crate::proto::Configuration;
use crate::proto::FileObjectInfo;
use crate::proto::JobInfo;
use crate::proto::JobState;
use crate::proto::Menu;
use crate::proto::SamplerConfig;
use crate::proto::cronus_object::Info;
use crate::registry::ComponentRegistry;
use crate::registry::RegistryError;
use crate::store::ContentKeys;
use crate::store::MetaObject;
use crate::store::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Component name of the controller's metrics.
pub const CONTROLLER_COMPONENT: &str = "artemis";

/// Partition that input files are registered under.
pub const INPUT_PARTITION: &str = "input";

/// Bytes per megabyte in payload metrics.
const MEGABYTE: f64 = 1024.0 * 1024.0;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Controller failures.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Store access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A component could not be built.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Steering failed.
    #[error(transparent)]
    Steering(#[from] SteeringError),
    /// An input could not be read.
    #[error(transparent)]
    Reader(#[from] ReaderError),
    /// Output could not be written.
    #[error(transparent)]
    Writer(#[from] WriterError),
    /// A tool or data source failed.
    #[error(transparent)]
    Component(#[from] ComponentError),
    /// Metrics could not be booked or filled.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    /// The menu is invalid.
    #[error(transparent)]
    Menu(#[from] MenuError),
    /// The blocks of an input did not cover its payload.
    #[error("processing payload not complete for {file}: {processed} of {expected} bytes")]
    Incomplete {
        /// Input name.
        file: String,
        /// Bytes handed to steering.
        processed: u64,
        /// Payload bytes of the input.
        expected: u64,
    },
    /// The job message or configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// A phase was requested out of order.
    #[error("job aborted: {0}")]
    Abort(String),
}

// ============================================================================
// SECTION: Phases
// ============================================================================

/// Phase that follows `state` on success.
const fn next_phase(state: JobState) -> Option<JobState> {
    match state {
        JobState::Starting => Some(JobState::Configure),
        JobState::Configure => Some(JobState::Lock),
        JobState::Lock => Some(JobState::Initialize),
        JobState::Initialize => Some(JobState::Book),
        JobState::Book => Some(JobState::Sample),
        JobState::Sample => Some(JobState::Rebook),
        JobState::Rebook => Some(JobState::Execute),
        JobState::Execute => Some(JobState::Finalize),
        JobState::Finalize => Some(JobState::Success),
        JobState::Success | JobState::Abort => None,
    }
}

/// Components created at configure.
struct Runtime {
    /// Algorithm orchestration.
    steering: Steering,
    /// Leaf writers.
    collector: Collector,
    /// Input source.
    source: Box<dyn DataSource>,
    /// Input reader.
    handler: FileHandler,
    /// Sampling settings.
    sampler: SamplerConfig,
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Phase state machine of one job.
pub struct Controller {
    /// Job state shared with components.
    ctx: JobContext,
    /// Component constructors.
    registry: ComponentRegistry,
    /// States entered so far, in order.
    history: Vec<JobState>,
    /// Components, once configured.
    runtime: Option<Runtime>,
    /// Failure that aborted the job.
    fault: Option<ControllerError>,
    /// Failure during abort cleanup.
    cleanup_fault: Option<ControllerError>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("job", &self.ctx.meta().name)
            .field("history", &self.history)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Opens the job's store and creates a controller in `STARTING`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Store`] when the store cannot be opened.
    pub fn new(info: JobInfo, registry: ComponentRegistry) -> Result<Self, ControllerError> {
        Ok(Self::with_context(JobContext::open(info)?, registry))
    }

    /// Creates a controller over an existing context.
    #[must_use]
    pub fn with_context(mut ctx: JobContext, registry: ComponentRegistry) -> Self {
        ctx.set_state(JobState::Starting);
        Self {
            ctx,
            registry,
            history: vec![JobState::Starting],
            runtime: None,
            fault: None,
            cleanup_fault: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> JobState {
        self.ctx.state()
    }

    /// States entered so far.
    #[must_use]
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    /// Failure that aborted the job.
    #[must_use]
    pub const fn fault(&self) -> Option<&ControllerError> {
        self.fault.as_ref()
    }

    /// Failure during abort cleanup other than a store write error.
    #[must_use]
    pub const fn cleanup_fault(&self) -> Option<&ControllerError> {
        self.cleanup_fault.as_ref()
    }

    /// Job context.
    #[must_use]
    pub const fn context(&self) -> &JobContext {
        &self.ctx
    }

    /// Mutable job context.
    pub const fn context_mut(&mut self) -> &mut JobContext {
        &mut self.ctx
    }

    /// Steering, once configured.
    #[must_use]
    pub fn steering(&self) -> Option<&Steering> {
        self.runtime.as_ref().map(|rt| &rt.steering)
    }

    /// Collector, once configured.
    #[must_use]
    pub fn collector(&self) -> Option<&Collector> {
        self.runtime.as_ref().map(|rt| &rt.collector)
    }

    /// Releases the context.
    #[must_use]
    pub fn into_context(self) -> JobContext {
        self.ctx
    }

    /// Runs every remaining phase; returns `true` on `SUCCESS`.
    pub fn control(&mut self) -> bool {
        let span = info_span!("job", name = %self.ctx.meta().name, job_id = field::Empty);
        let _guard = span.enter();
        if self.ctx.meta().started.is_none() {
            self.ctx.start();
        }
        loop {
            match self.state() {
                JobState::Success => return true,
                JobState::Abort => return false,
                _ => {}
            }
            let advanced = self.step();
            if self.state() != JobState::Starting {
                span.record("job_id", self.ctx.job_id());
            }
            if !advanced {
                return false;
            }
        }
    }

    /// Runs the next phase; returns `false` when the job is, or becomes, aborted.
    pub fn step(&mut self) -> bool {
        let Some(next) = next_phase(self.state()) else {
            return self.state() == JobState::Success;
        };
        self.enter(next);
        let result = match next {
            JobState::Configure => self.configure(),
            JobState::Lock => self.lock(),
            JobState::Initialize => self.initialize(),
            JobState::Book => self.book(),
            JobState::Sample => self.sample(),
            JobState::Rebook => self.rebook(),
            JobState::Execute => self.execute(),
            JobState::Finalize => self.finalize(),
            JobState::Success => {
                info!(job_id = self.ctx.job_id(), "job succeeded");
                Ok(())
            }
            JobState::Starting | JobState::Abort => Ok(()),
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                error!(phase = next.label(), error = %err, "phase failed");
                self.fault = Some(err);
                self.abort();
                false
            }
        }
    }

    /// Records a state transition.
    fn enter(&mut self, state: JobState) {
        debug!(state = state.label(), "entering phase");
        self.ctx.set_state(state);
        self.history.push(state);
    }

    /// Configured components.
    fn runtime(&mut self) -> Result<&mut Runtime, ControllerError> {
        self.runtime.as_mut().ok_or_else(|| ControllerError::Abort("job is not configured".to_string()))
    }

    // ------------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------------

    /// Loads menu and configuration and builds every component.
    fn configure(&mut self) -> Result<(), ControllerError> {
        let meta = self.ctx.meta().clone();
        if meta.menu_id.is_empty() || meta.config_id.is_empty() {
            return Err(ControllerError::Config("job names no menu or configuration".to_string()));
        }
        let menu: Menu = self.ctx.store().get_message(&meta.menu_id)?;
        let config: Configuration = self.ctx.store().get_message(&meta.config_id)?;
        if meta.dataset_id.is_empty() {
            let dataset = self.ctx.store_mut().register_dataset(Some(&meta.menu_id), Some(&meta.config_id))?;
            self.ctx.meta_mut().dataset_id = dataset.uuid;
        }
        let dataset_id = self.ctx.output_id().to_string();
        let job_id = self.ctx.store_mut().new_job(&dataset_id)?;
        self.ctx.meta_mut().job_id = job_id;

        for descriptor in &config.tools {
            if descriptor.class == BUFFER_WRITER_CLASS || descriptor.name == BUFFER_WRITER_CLASS {
                continue;
            }
            let tool = self.registry.build_tool(descriptor)?;
            self.ctx.tools_mut().insert(tool);
        }
        let input = config.input.clone().unwrap_or_default();
        let generator =
            input.generator.ok_or_else(|| ControllerError::Config("no input generator configured".to_string()))?;
        let source = self.registry.build_source(&generator)?;
        let handler_config =
            input.filehandler.ok_or_else(|| ControllerError::Config("no file handler configured".to_string()))?;
        let handler = FileHandler::new(&handler_config)?;

        let graph = MenuGraph::from_message(&menu)?;
        let leaves = graph.leaves();
        let steering = Steering::new(graph, &config.algos, &self.registry)?;
        let collector =
            Collector::from_tools(leaves, &config.tools)?.with_max_malloc(config.max_malloc_size_bytes);
        let sampler = config.sampler.unwrap_or_default();

        info!(
            dataset_id = %dataset_id,
            job_id,
            menu = %menu.name,
            tools = self.ctx.tools().len(),
            file_type = handler.file_type().extension(),
            "job configured"
        );
        self.ctx.set_menu(menu);
        self.ctx.set_config(config);
        self.runtime = Some(Runtime {
            steering,
            collector,
            source,
            handler,
            sampler,
        });
        Ok(())
    }

    /// Freezes the registry and every property set.
    fn lock(&mut self) -> Result<(), ControllerError> {
        self.registry.lock();
        self.ctx.tools_mut().lock();
        let rt = self.runtime()?;
        rt.steering.lock();
        rt.source.properties_mut().lock();
        Ok(())
    }

    /// Initializes the source, tools, steering, and collector.
    fn initialize(&mut self) -> Result<(), ControllerError> {
        let Self { ctx, runtime, .. } = self;
        let rt = runtime.as_mut().ok_or_else(|| ControllerError::Abort("job is not configured".to_string()))?;
        rt.source.initialize()?;
        ctx.tools_mut().initialize()?;
        rt.steering.initialize(ctx)?;
        rt.collector.initialize(ctx)?;
        let input_id = ctx.input_id().to_string();
        ctx.store_mut().new_partition(&input_id, INPUT_PARTITION)?;
        Ok(())
    }

    /// Books the controller's histograms and steering's timers.
    fn book(&mut self) -> Result<(), ControllerError> {
        let Self { ctx, runtime, .. } = self;
        let rt = runtime.as_mut().ok_or_else(|| ControllerError::Abort("job is not configured".to_string()))?;
        let hbook = ctx.hbook_mut();
        hbook.book(CONTROLLER_COMPONENT, "counts", float_range(0.0, 10.0, 1.0), "datums", false)?;
        hbook.book(CONTROLLER_COMPONENT, "payload", float_range(0.0, 10.0, 0.1), "MB", false)?;
        hbook.book(CONTROLLER_COMPONENT, "nblocks", float_range(0.0, 100.0, 1.0), "blocks", false)?;
        hbook.book(CONTROLLER_COMPONENT, "blocksize", float_range(0.0, 200.0, 2.0), "MB", false)?;
        for timer in ["time.prepblks", "time.prepschema", "time.execute"] {
            hbook.book(CONTROLLER_COMPONENT, timer, float_range(0.0, 100.0, 2.0), "ms", true)?;
        }
        rt.steering.book(ctx)?;
        Ok(())
    }

    /// Steers a random subset of blocks without collecting output.
    fn sample(&mut self) -> Result<(), ControllerError> {
        let Self { ctx, runtime, .. } = self;
        let rt = runtime.as_mut().ok_or_else(|| ControllerError::Abort("job is not configured".to_string()))?;
        let SamplerConfig { ndatums, nchunks, seed } = rt.sampler;
        if ndatums == 0 || nchunks == 0 {
            info!("sampling disabled");
            return Ok(());
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let datums = rt.source.sample(ndatums as usize, &mut rng)?;
        let mut steered = 0_usize;
        for datum in &datums {
            let mut prepared = rt.handler.prepare(datum)?;
            for block in prepared.sample(nchunks as usize, &mut rng)? {
                let watch = Stopwatch::start();
                rt.steering.execute(block.datum, block.seq, ctx)?;
                ctx.hbook_mut().fill(CONTROLLER_COMPONENT, "time.execute", watch.elapsed_ms())?;
                rt.steering.tree_mut().flush();
                steered += 1;
            }
        }
        info!(datums = datums.len(), blocks = steered, "sampling complete");
        Ok(())
    }

    /// Rebins timers from the sample and rewinds the input.
    fn rebook(&mut self) -> Result<(), ControllerError> {
        let Self { ctx, runtime, .. } = self;
        let rt = runtime.as_mut().ok_or_else(|| ControllerError::Abort("job is not configured".to_string()))?;
        ctx.hbook_mut().rebook(&[]);
        ctx.tbook_mut().rebook(&[]);
        rt.source.reset();
        rt.steering.tree_mut().flush();
        Ok(())
    }

    /// Steers and collects every block of every input.
    #[allow(clippy::cast_precision_loss, reason = "Sizes feed approximate metrics.")]
    fn execute(&mut self) -> Result<(), ControllerError> {
        let Self { ctx, runtime, .. } = self;
        let rt = runtime.as_mut().ok_or_else(|| ControllerError::Abort("job is not configured".to_string()))?;
        let input_id = ctx.input_id().to_string();
        while let Some(datum) = rt.source.next_datum()? {
            let file = register_input(ctx, &datum, &input_id, &rt.handler)?;
            let mut prepared = rt.handler.prepare(&datum)?;
            let layout = prepared.layout().clone();
            let timings = prepared.timings();
            let store = ctx.store_mut();
            store.set_file_size(&file.uuid, layout.size_bytes)?;
            store.set_file_blocks(&file.uuid, &layout.blocks)?;
            store.set_file_columns(&file.uuid, &layout.columns)?;
            ctx.set_current_file(&file.name, &layout.columns);
            debug!(file = %file.name, blocks = layout.blocks.len(), bytes = layout.size_bytes, "input prepared");

            let hbook = ctx.hbook_mut();
            hbook.fill(CONTROLLER_COMPONENT, "time.prepschema", timings.schema_ms)?;
            hbook.fill(CONTROLLER_COMPONENT, "time.prepblks", timings.blocks_ms)?;
            hbook.fill(CONTROLLER_COMPONENT, "nblocks", layout.blocks.len() as f64)?;
            hbook.fill(CONTROLLER_COMPONENT, "payload", layout.payload_bytes as f64 / MEGABYTE)?;

            let mut processed = 0_u64;
            while let Some(block) = prepared.next_block()? {
                processed += block.length;
                ctx.hbook_mut().fill(CONTROLLER_COMPONENT, "blocksize", block.length as f64 / MEGABYTE)?;
                let watch = Stopwatch::start();
                rt.steering.execute(block.datum, block.seq, ctx)?;
                ctx.hbook_mut().fill(CONTROLLER_COMPONENT, "time.execute", watch.elapsed_ms())?;
                rt.collector.collect(rt.steering.tree(), ctx)?;
                rt.steering.tree_mut().flush();
            }
            check_coverage(&file.name, processed, layout.payload_bytes)?;
            ctx.add_processed(processed, 1);
            ctx.hbook_mut().fill(CONTROLLER_COMPONENT, "counts", 1.0)?;
            rt.steering.tree_mut().flush();
            info!(file = %file.name, bytes = processed, "input processed");
        }
        Ok(())
    }

    /// Finalizes components and writes the job record as `SUCCESS`.
    ///
    /// The live state moves to `SUCCESS` on the following step.
    fn finalize(&mut self) -> Result<(), ControllerError> {
        let Self { ctx, runtime, .. } = self;
        let rt = runtime.as_mut().ok_or_else(|| ControllerError::Abort("job is not configured".to_string()))?;
        rt.steering.finalize(ctx)?;
        rt.collector.finalize(ctx)?;
        ctx.finalize_job(JobState::Success)?;
        Ok(())
    }

    /// Moves to `ABORT`, flushes partial output, and writes the job record.
    fn abort(&mut self) {
        self.enter(JobState::Abort);
        if let Some(rt) = self.runtime.as_mut()
            && let Err(err) = rt.collector.finalize(&mut self.ctx)
        {
            error!(error = %err, "collector flush failed during abort");
            self.cleanup_fault.get_or_insert(ControllerError::Writer(err));
        }
        match self.ctx.finalize_job(JobState::Abort) {
            Ok(()) => {}
            Err(StoreError::Io(reason)) => {
                warn!(reason = %reason, "job record not written during abort");
            }
            Err(err) => {
                error!(error = %err, "job record failed during abort");
                self.cleanup_fault.get_or_insert(ControllerError::Store(err));
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fails when the blocks handed to steering do not add up to the payload.
fn check_coverage(file: &str, processed: u64, expected: u64) -> Result<(), ControllerError> {
    if processed == expected {
        return Ok(());
    }
    Err(ControllerError::Incomplete {
        file: file.to_string(),
        processed,
        expected,
    })
}

/// Registers an input on the input dataset's `input` partition.
fn register_input(
    ctx: &mut JobContext,
    datum: &InputDatum,
    input_id: &str,
    handler: &FileHandler,
) -> Result<MetaObject, ControllerError> {
    let info = FileObjectInfo {
        description: datum.name(),
        ..FileObjectInfo::of_type(handler.file_type())
    };
    let job_id = ctx.job_id();
    let store = ctx.store_mut();
    let meta = match datum {
        InputDatum::Bytes { data, .. } => {
            let keys = ContentKeys::partition(input_id, job_id, INPUT_PARTITION);
            store.register_content(data, Info::File(info), &keys)?
        }
        InputDatum::Path(path) => store.register_file(path, info, input_id, INPUT_PARTITION)?,
    };
    Ok(meta)
}
