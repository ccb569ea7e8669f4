// crates/strata-core/tests/controller.rs
// ============================================================================
// Module: Controller Tests
// Description: End-to-end phase sequencing with in-memory components.
// ============================================================================
//! ## Overview
//! Registers a generated CSV source and a small parsing algorithm, then runs
//! jobs through the controller: the full success path, the sampling pass,
//! configuration failures, and an algorithm failure mid-execution that must
//! leave partial output and an `ABORT` job record behind. A store save
//! failing inside finalize must also end in exactly one `ABORT` job record.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::io::Cursor;
use std::sync::Arc;

use arrow::csv::ReaderBuilder;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use bytes::Bytes;
use rand::rngs::StdRng;
use strata_core::Algorithm;
use strata_core::ComponentError;
use strata_core::ComponentRegistry;
use strata_core::Controller;
use strata_core::ControllerError;
use strata_core::DataSource;
use strata_core::InputDatum;
use strata_core::JobContext;
use strata_core::ObjectStore;
use strata_core::Properties;
use strata_core::StoreError;
use strata_core::proto::Chain;
use strata_core::proto::ComponentConfig;
use strata_core::proto::Configuration;
use strata_core::proto::CsvHandlerConfig;
use strata_core::proto::FileHandlerConfig;
use strata_core::proto::InputConfig;
use strata_core::proto::JobInfo;
use strata_core::proto::JobState;
use strata_core::proto::Menu;
use strata_core::proto::Node;
use strata_core::proto::SamplerConfig;
use strata_core::proto::cronus_object::Info;
use strata_core::proto::file_handler_config::Kind;
use strata_core::runtime::Datum;
use strata_core::runtime::Element;
use tempfile::TempDir;

// ============================================================================
// SECTION: Test Components
// ============================================================================

/// Generates `nfiles` CSV inputs of `nrows` rows each.
struct MemorySource {
    /// Configured name.
    name: String,
    /// Properties.
    props: Properties,
    /// Generated inputs.
    inputs: Vec<InputDatum>,
    /// Next input.
    cursor: usize,
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.props
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.props
    }

    fn initialize(&mut self) -> Result<(), ComponentError> {
        let nfiles = self.props.u64_or("nfiles", 2)?;
        let nrows = self.props.u64_or("nrows", 20)?;
        self.inputs = (0 .. nfiles)
            .map(|f| {
                let mut text = String::from("a,b\n");
                for r in 0 .. nrows {
                    text.push_str(&format!("{r},{}\n", f * 1000 + r));
                }
                InputDatum::Bytes {
                    name: format!("gen_{f}.csv"),
                    data: Bytes::from(text),
                }
            })
            .collect();
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_datum(&mut self) -> Result<Option<InputDatum>, ComponentError> {
        let next = self.inputs.get(self.cursor).cloned();
        self.cursor += 1;
        Ok(next)
    }

    fn sample(&mut self, n: usize, rng: &mut StdRng) -> Result<Vec<InputDatum>, ComponentError> {
        let picks = rand::seq::index::sample(rng, self.inputs.len(), n.min(self.inputs.len()));
        Ok(picks.iter().map(|i| self.inputs[i].clone()).collect())
    }
}

/// Builds a [`MemorySource`].
fn memory_source(name: &str, props: Properties) -> Result<Box<dyn DataSource>, ComponentError> {
    Ok(Box::new(MemorySource {
        name: name.to_string(),
        props,
        inputs: Vec::new(),
        cursor: 0,
    }))
}

/// Parses raw CSV blocks into `(a, b)` batches; fails on block `fail_at_seq`.
struct ParseAlgorithm {
    /// Configured name.
    name: String,
    /// Properties.
    props: Properties,
}

impl Algorithm for ParseAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.props
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.props
    }

    fn execute(&mut self, element: &mut Element, _ctx: &mut JobContext) -> Result<(), ComponentError> {
        let fail_at = self.props.int_or("fail_at_seq", -1)?;
        if i64::try_from(element.seq()).unwrap() == fail_at {
            return Err(ComponentError::Input(format!("refusing block {fail_at}")));
        }
        let raw = element.current_raw().cloned().ok_or_else(|| ComponentError::Input("no raw block".to_string()))?;
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, false),
            Field::new("b", DataType::Int64, false),
        ]));
        let mut reader = ReaderBuilder::new(schema).with_header(true).with_batch_size(4096).build(Cursor::new(raw))?;
        let batch = reader.next().transpose()?.ok_or_else(|| ComponentError::Input("empty block".to_string()))?;
        element.set(Datum::Batch(batch));
        Ok(())
    }
}

/// Builds a [`ParseAlgorithm`].
fn parse_algorithm(name: &str, props: Properties) -> Result<Box<dyn Algorithm>, ComponentError> {
    Ok(Box::new(ParseAlgorithm {
        name: name.to_string(),
        props,
    }))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Registry with the test source and algorithm.
fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register_source("test", "memsource", memory_source).unwrap();
    registry.register_algorithm("test", "parser", parse_algorithm).unwrap();
    registry
}

/// One-node menu running `parser` under the root.
fn menu() -> Menu {
    Menu {
        uuid: String::new(),
        name: "parse-only".to_string(),
        chains: vec![Chain {
            name: "main".to_string(),
            nodes: vec![Node {
                name: "parse".to_string(),
                parents: vec!["initial".to_string()],
                algorithms: vec!["parser".to_string()],
            }],
        }],
    }
}

/// Configuration with 16-byte CSV blocks and the given sampler and parser properties.
fn configuration(sampler: SamplerConfig, parser: Properties) -> Configuration {
    Configuration {
        uuid: String::new(),
        name: "test-config".to_string(),
        input: Some(InputConfig {
            generator: Some(ComponentConfig {
                name: "source".to_string(),
                class: "memsource".to_string(),
                module: "test".to_string(),
                properties: Some(Properties::new().with("nfiles", 2_i64).with("nrows", 20_i64).to_message()),
            }),
            filehandler: Some(FileHandlerConfig {
                kind: Some(Kind::Csv(CsvHandlerConfig {
                    blocksize: 16,
                    delimiter: "\n".to_string(),
                    separator: ",".to_string(),
                    header_rows: 1,
                    schema: Vec::new(),
                })),
            }),
        }),
        tools: Vec::new(),
        algos: vec![ComponentConfig {
            name: "parser".to_string(),
            class: "parser".to_string(),
            module: String::new(),
            properties: Some(parser.to_message()),
        }],
        sampler: Some(sampler),
        max_malloc_size_bytes: 0,
    }
}

/// Stores the menu and configuration and returns a controller for them.
fn controller(dir: &TempDir, config: &Configuration) -> Controller {
    let mut store = ObjectStore::create(dir.path(), "ctl").unwrap();
    let menu = store.register_menu(&menu()).unwrap();
    let config = store.register_config(config).unwrap();
    let info = JobInfo {
        name: "controller-test".to_string(),
        menu_id: menu.uuid,
        config_id: config.uuid,
        ..JobInfo::default()
    };
    Controller::with_context(JobContext::new(info, store), registry())
}

/// Rows in every Arrow file of `partition`.
fn arrow_rows(ctx: &JobContext, partition: &str) -> usize {
    ctx.store()
        .list_files(ctx.output_id(), Some(partition))
        .unwrap()
        .iter()
        .filter(|f| f.name.ends_with(".arrow"))
        .map(|f| match ctx.store().open(&f.uuid).unwrap() {
            strata_core::store::StoreStream::Arrow(reader) => reader.map(|b| b.unwrap().num_rows()).sum::<usize>(),
            _ => panic!("{} is not arrow", f.name),
        })
        .sum()
}

/// State recorded in the dataset's only job record.
fn recorded_state(ctx: &JobContext) -> JobState {
    let jobs = ctx.store().list_jobs(ctx.output_id()).unwrap();
    assert_eq!(jobs.len(), 1);
    let info: JobInfo = ctx.store().get_message(&jobs[0].uuid).unwrap();
    JobState::try_from(info.state).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies a clean job walks every phase and persists outputs and records.
#[test]
fn success_runs_every_phase() {
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&dir, &configuration(SamplerConfig::default(), Properties::new()));
    assert!(controller.control(), "{:?}", controller.fault());
    assert_eq!(controller.history(), [
        JobState::Starting,
        JobState::Configure,
        JobState::Lock,
        JobState::Initialize,
        JobState::Book,
        JobState::Sample,
        JobState::Rebook,
        JobState::Execute,
        JobState::Finalize,
        JobState::Success,
    ]);
    assert!(controller.fault().is_none());
    let ctx = controller.context();
    assert_eq!(arrow_rows(ctx, "parse"), 40);
    assert_eq!(ctx.store().list_files(ctx.output_id(), Some("input")).unwrap().len(), 2);
    assert_eq!(recorded_state(ctx), JobState::Success);
    assert_eq!(ctx.store().list_histograms(ctx.output_id()).unwrap().len(), 1);
    let summary = ctx.meta().summary.clone().unwrap();
    assert_eq!(summary.processed_ndatums, 2);
    assert_eq!(summary.tables.len(), 1);
    assert!(summary.timers.iter().any(|t| t.name == "steer.time.parser"));
    assert_eq!(ctx.hbook().get("artemis.counts").unwrap().entries(), 2);

    // A finished job stays finished.
    assert!(controller.step());
    assert_eq!(controller.history().len(), 10);
}

/// Verifies sampling steers without collecting and rebook clears its fills.
#[test]
fn sampling_steers_without_output() {
    let dir = TempDir::new().unwrap();
    let sampler = SamplerConfig {
        ndatums: 1,
        nchunks: 3,
        seed: 11,
    };
    let mut controller = controller(&dir, &configuration(sampler, Properties::new()));
    while controller.state() != JobState::Sample {
        assert!(controller.step(), "{:?}", controller.fault());
    }
    {
        let ctx = controller.context();
        assert_eq!(ctx.hbook().get("artemis.time.execute").unwrap().entries(), 3);
        assert_eq!(ctx.hbook().timer_samples("steer.time.parser").unwrap().len(), 3);
        assert_eq!(arrow_rows(ctx, "parse"), 0);
    }
    assert!(controller.step());
    assert_eq!(controller.state(), JobState::Rebook);
    assert_eq!(controller.context().hbook().get("artemis.time.execute").unwrap().entries(), 0);
    assert!(controller.control());
    assert_eq!(arrow_rows(controller.context(), "parse"), 40);
}

/// Verifies an unknown menu aborts during configuration and nothing runs afterwards.
#[test]
fn missing_menu_aborts_in_configure() {
    let dir = TempDir::new().unwrap();
    let store = ObjectStore::create(dir.path(), "ctl").unwrap();
    let info = JobInfo {
        name: "no-menu".to_string(),
        menu_id: "nope".to_string(),
        config_id: "nope".to_string(),
        ..JobInfo::default()
    };
    let mut controller = Controller::with_context(JobContext::new(info, store), registry());
    assert!(!controller.control());
    assert_eq!(controller.history(), [JobState::Starting, JobState::Configure, JobState::Abort]);
    assert!(matches!(controller.fault(), Some(ControllerError::Store(StoreError::NotFound(_)))));
    assert!(!controller.step());
    assert!(!controller.control());
    assert_eq!(controller.history().len(), 3);
}

/// Verifies an algorithm failure aborts the job but keeps finished output.
#[test]
fn algorithm_failure_keeps_partial_output() {
    let dir = TempDir::new().unwrap();
    let parser = Properties::new().with("fail_at_seq", 2_i64);
    let mut controller = controller(&dir, &configuration(SamplerConfig::default(), parser));
    assert!(!controller.control());
    assert_eq!(controller.history().last(), Some(&JobState::Abort));
    assert!(controller.history().contains(&JobState::Execute));
    assert!(!controller.history().contains(&JobState::Finalize));
    let Some(ControllerError::Steering(err)) = controller.fault() else {
        panic!("expected a steering fault, got {:?}", controller.fault());
    };
    assert!(err.to_string().contains("parser"), "{err}");
    assert!(controller.cleanup_fault().is_none());
    let ctx = controller.context();
    let rows = arrow_rows(ctx, "parse");
    assert!(rows > 0 && rows < 40, "partial rows {rows}");
    assert_eq!(recorded_state(ctx), JobState::Abort);
}

/// Verifies a failed store save during finalize leaves a single job record marked `ABORT`.
#[test]
fn failed_finalize_writes_one_job_record() {
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&dir, &configuration(SamplerConfig::default(), Properties::new()));
    while controller.state() != JobState::Execute {
        assert!(controller.step(), "{:?}", controller.fault());
    }
    // A directory where the metastore file goes makes every save fail.
    let metastore = {
        let store = controller.context().store();
        store.root_path().join(&store.catalog().name)
    };
    fs::create_dir(&metastore).unwrap();

    assert!(!controller.control());
    assert_eq!(&controller.history()[7 ..], [JobState::Execute, JobState::Finalize, JobState::Abort]);
    assert!(matches!(controller.fault(), Some(ControllerError::Store(StoreError::Io(_)))));
    assert!(controller.cleanup_fault().is_none());

    let ctx = controller.context();
    assert_eq!(recorded_state(ctx), JobState::Abort);
    assert_eq!(ctx.store().list_histograms(ctx.output_id()).unwrap().len(), 1);
    let jobs = ctx.store().list_jobs(ctx.output_id()).unwrap();
    let Ok(Some(Info::Job(job))) = ctx.store().object(&jobs[0].uuid).map(|o| o.info.clone()) else {
        panic!("{} is not a job record", jobs[0].uuid);
    };
    assert_eq!(job.state, JobState::Abort as i32);

    // Once the path is writable the catalog still holds a single record.
    fs::remove_dir(&metastore).unwrap();
    ctx.store().save_store().unwrap();
    let store_id = ctx.store().uuid().to_string();
    let dataset_id = ctx.output_id().to_string();
    let reloaded = ObjectStore::load(dir.path(), "ctl", &store_id).unwrap();
    assert_eq!(reloaded.list_jobs(&dataset_id).unwrap().len(), 1);
}
