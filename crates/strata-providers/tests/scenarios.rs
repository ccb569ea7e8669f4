// crates/strata-providers/tests/scenarios.rs
// ============================================================================
// Module: End-to-End Scenarios
// Description: Whole jobs run through the controller with built-in components.
// ============================================================================
//! ## Overview
//! Each test stores a menu and configuration in a fresh object store, runs
//! the controller with [`builtin_registry`], and inspects what the job left
//! behind: generated CSV parsing, fixed-width decoding with a column filter,
//! the sampling pass, writer rollover, merging independent workers, and an
//! abort on a header change between inputs.

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
use std::path::Path;
use std::sync::Arc;

use arrow::array::Int64Array;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use strata_core::BufferOutputWriter;
use strata_core::Controller;
use strata_core::ControllerError;
use strata_core::HistogramBook;
use strata_core::JobContext;
use strata_core::ObjectStore;
use strata_core::Properties;
use strata_core::ReaderError;
use strata_core::TDigestBook;
use strata_core::io::WriterConfig;
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
use strata_core::proto::file_handler_config::Kind;
use strata_core::store::MetaObject;
use strata_core::store::StoreStream;
use strata_providers::CsvGenerator;
use strata_providers::LegacyGenerator;
use strata_providers::builtin_registry;
use strata_providers::generators::csvgen::column_names;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Component descriptor named after its class.
fn component(class: &str, properties: Properties) -> ComponentConfig {
    ComponentConfig {
        name: class.to_string(),
        class: class.to_string(),
        module: String::new(),
        properties: Some(properties.to_message()),
    }
}

/// Menu node.
fn node(name: &str, parent: &str, algorithms: &[&str]) -> Node {
    Node {
        name: name.to_string(),
        parents: vec![parent.to_string()],
        algorithms: algorithms.iter().map(ToString::to_string).collect(),
    }
}

/// Single-chain menu.
fn menu(name: &str, nodes: Vec<Node>) -> Menu {
    Menu {
        uuid: String::new(),
        name: name.to_string(),
        chains: vec![Chain {
            name: "main".to_string(),
            nodes,
        }],
    }
}

/// Comma-separated handler with one header row.
fn csv_handler(blocksize: u64) -> FileHandlerConfig {
    FileHandlerConfig {
        kind: Some(Kind::Csv(CsvHandlerConfig {
            blocksize,
            delimiter: "\r\n".to_string(),
            separator: ",".to_string(),
            header_rows: 1,
            schema: Vec::new(),
        })),
    }
}

/// Job configuration around a generator and handler.
fn configuration(
    generator: ComponentConfig,
    filehandler: FileHandlerConfig,
    tools: Vec<ComponentConfig>,
    algos: Vec<ComponentConfig>,
    sampler: SamplerConfig,
) -> Configuration {
    Configuration {
        uuid: String::new(),
        name: "scenario".to_string(),
        input: Some(InputConfig {
            generator: Some(generator),
            filehandler: Some(filehandler),
        }),
        tools,
        algos,
        sampler: Some(sampler),
        max_malloc_size_bytes: 0,
    }
}

/// Stores the menu and configuration in a new store and returns a controller.
fn controller(root: &Path, menu: &Menu, config: &Configuration) -> Controller {
    let mut store = ObjectStore::create(root, "scenario").unwrap();
    let menu = store.register_menu(menu).unwrap();
    let config = store.register_config(config).unwrap();
    let info = JobInfo {
        name: "scenario-job".to_string(),
        menu_id: menu.uuid,
        config_id: config.uuid,
        ..JobInfo::default()
    };
    Controller::with_context(JobContext::new(info, store), builtin_registry().unwrap())
}

/// Arrow files of a partition.
fn arrow_files(ctx: &JobContext, partition: &str) -> Vec<MetaObject> {
    ctx.store()
        .list_files(ctx.output_id(), Some(partition))
        .unwrap()
        .into_iter()
        .filter(|f| f.name.ends_with(".arrow"))
        .collect()
}

/// Every batch of every Arrow file in a partition.
fn stored_batches(ctx: &JobContext, partition: &str) -> Vec<RecordBatch> {
    arrow_files(ctx, partition)
        .iter()
        .flat_map(|f| match ctx.store().open(&f.uuid).unwrap() {
            StoreStream::Arrow(reader) => reader.map(|b| b.unwrap()).collect::<Vec<_>>(),
            _ => panic!("{} is not arrow", f.name),
        })
        .collect()
}

/// Total rows in a partition.
fn stored_rows(ctx: &JobContext, partition: &str) -> usize {
    stored_batches(ctx, partition).iter().map(RecordBatch::num_rows).sum()
}

/// State recorded in the dataset's only job record.
fn recorded_state(ctx: &JobContext) -> JobState {
    let jobs = ctx.store().list_jobs(ctx.output_id()).unwrap();
    assert_eq!(jobs.len(), 1);
    let info: JobInfo = ctx.store().get_message(&jobs[0].uuid).unwrap();
    JobState::try_from(info.state).unwrap()
}

/// Column names of a batch.
fn names(batch: &RecordBatch) -> Vec<String> {
    batch.schema().fields().iter().map(|f| f.name().clone()).collect()
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Verifies generated CSV parses into every row with the generated column names.
#[test]
fn generated_csv_parses_completely() {
    let dir = TempDir::new().unwrap();
    let generator = component(
        "csvgen",
        Properties::new().with("seed", 42_i64).with("num_rows", 10_000_i64).with("num_cols", 20_i64),
    );
    let config = configuration(
        generator,
        csv_handler(65_536),
        vec![component("csvtool", Properties::new())],
        vec![component("csvparser", Properties::new())],
        SamplerConfig::default(),
    );
    let menu = menu("parse", vec![node("parse", "initial", &["csvparser"])]);
    let mut controller = controller(dir.path(), &menu, &config);
    assert!(controller.control(), "{:?}", controller.fault());

    let ctx = controller.context();
    let partitions = ctx.store().list_partitions(ctx.output_id()).unwrap();
    assert!(partitions.iter().any(|p| p == "parse"), "{partitions:?}");
    for partition in partitions.iter().filter(|p| p.as_str() != "input") {
        assert_eq!(arrow_files(ctx, partition).len(), 1, "partition {partition}");
    }
    let tables = ctx.meta().summary.clone().unwrap().tables;
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].num_rows, 10_000);
    assert_eq!(tables[0].num_columns, 20);
    let batches = stored_batches(ctx, "parse");
    assert_eq!(batches.iter().map(RecordBatch::num_rows).sum::<usize>(), 10_000);
    let expected = column_names(20);
    assert_eq!(expected.first().map(String::as_str), Some("aa"));
    assert_eq!(expected.last().map(String::as_str), Some("at"));
    assert!(batches.iter().all(|b| names(b) == expected));
    assert!(ctx.hbook().get("csvparser.time.parse").unwrap().entries() > 1);
    assert_eq!(ctx.meta().summary.clone().unwrap().processed_ndatums, 1);
    assert_eq!(recorded_state(ctx), JobState::Success);
}

/// Verifies fixed-width records decode and the filter keeps only the selected column.
#[test]
fn legacy_records_decode_and_filter() {
    let dir = TempDir::new().unwrap();
    let generator_props = Properties::new().with("num_rows", 10_000_i64).with("seed", 3_i64);
    let handler = LegacyGenerator::new("legacygen", generator_props.clone()).unwrap().handler_config(4095);
    assert_eq!(handler.fields.iter().map(|f| f.length).collect::<Vec<_>>(), [10, 6, 4]);
    let config = configuration(
        component("legacygen", generator_props),
        FileHandlerConfig {
            kind: Some(Kind::Legacy(handler)),
        },
        vec![
            component("legacytool", Properties::new()),
            component("filtercoltool", Properties::new().with("columns", vec!["column_b".to_string()])),
        ],
        vec![component("legacy", Properties::new()), component("filter", Properties::new())],
        SamplerConfig::default(),
    );
    let menu = menu("legacy", vec![node("decode", "initial", &["legacy"]), node("select", "decode", &["filter"])]);
    let mut controller = controller(dir.path(), &menu, &config);
    assert!(controller.control(), "{:?}", controller.fault());

    let ctx = controller.context();
    let batches = stored_batches(ctx, "select");
    assert_eq!(batches.iter().map(RecordBatch::num_rows).sum::<usize>(), 10_000);
    for batch in &batches {
        assert_eq!(names(batch), ["column_b"]);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::UInt64);
    }
    assert!(stored_batches(ctx, "decode").is_empty());
    assert_eq!(ctx.hbook().get("legacy.time.decode").unwrap().entries(), 3);
}

// ============================================================================
// SECTION: Sampling
// ============================================================================

/// Verifies sampling over a fifty-block input writes nothing, then execution
/// steers every block and rolls output over without losing rows.
#[test]
fn sampling_steers_without_output() {
    let dir = TempDir::new().unwrap();
    let generator_props = Properties::new().with("num_rows", 5_000_i64).with("seed", 5_i64);
    let content = CsvGenerator::new("csvgen", generator_props.clone()).unwrap().make_csv(0);
    let header_len = content.iter().position(|&b| b == b'\n').unwrap() as u64 + 1;
    let blocksize = (content.len() as u64 - header_len) / 50;
    let sampler = SamplerConfig {
        ndatums: 1,
        nchunks: 10,
        seed: 1,
    };
    let config = configuration(
        component("csvgen", generator_props),
        csv_handler(blocksize),
        vec![
            component("csvtool", Properties::new()),
            component("bufferwriter", Properties::new().with("BUFFER_MAX_SIZE", 16_384_i64)),
        ],
        vec![component("csvparser", Properties::new())],
        sampler,
    );
    let menu = menu("parse", vec![node("parse", "initial", &["csvparser"])]);
    let mut controller = controller(dir.path(), &menu, &config);
    while controller.state() != JobState::Sample {
        assert!(controller.step(), "{:?}", controller.fault());
    }
    {
        let ctx = controller.context();
        assert_eq!(ctx.hbook().get("artemis.time.execute").unwrap().entries(), 10);
        assert_eq!(ctx.hbook().timer_samples("steer.time.csvparser").unwrap().len(), 10);
        assert_eq!(ctx.hbook().get("csvparser.time.parse").unwrap().entries(), 10);
        assert!(arrow_files(ctx, "parse").is_empty());
    }
    assert!(controller.step());
    assert_eq!(controller.state(), JobState::Rebook);
    assert_eq!(controller.context().hbook().get("csvparser.time.parse").unwrap().entries(), 0);
    assert!(controller.control(), "{:?}", controller.fault());

    let ctx = controller.context();
    let nblocks = ctx.hbook().get("artemis.nblocks").unwrap().mean();
    assert!((45.0 ..= 50.0).contains(&nblocks), "blocks {nblocks}");
    assert_eq!(ctx.hbook().get("csvparser.time.parse").unwrap().entries() as f64, nblocks);

    let files = arrow_files(ctx, "parse");
    let tables = ctx.meta().summary.clone().unwrap().tables;
    assert!(files.len() > 1, "expected rollover, got {} file(s)", files.len());
    assert_eq!(tables.len(), files.len());
    assert_eq!(tables.iter().map(|t| t.num_batches).sum::<u64>() as f64, nblocks);
    assert_eq!(tables.iter().map(|t| t.num_rows).sum::<u64>(), 5_000);
    assert_eq!(stored_rows(ctx, "parse"), 5_000);
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Verifies a 1 MB budget splits ten 300 KB batches into four files.
#[test]
fn writer_rolls_over_at_budget() {
    let dir = TempDir::new().unwrap();
    let mut store = ObjectStore::create(dir.path(), "rollover").unwrap();
    let dataset = store.register_dataset(None, None).unwrap();
    let job_id = store.new_job(&dataset.uuid).unwrap();
    let info = JobInfo {
        name: "rollover".to_string(),
        job_id,
        dataset_id: dataset.uuid,
        ..JobInfo::default()
    };
    let mut ctx = JobContext::new(info, store);
    ctx.new_partition("out").unwrap();

    let schema = Arc::new(Schema::new(vec![Field::new("value", DataType::Int64, false)]));
    let config = WriterConfig {
        max_size: 1024 * 1024,
        write_csv: false,
    };
    let mut writer = BufferOutputWriter::new("out", config);
    for i in 0 .. 10_i64 {
        let values = Int64Array::from((i * 37_500 .. (i + 1) * 37_500).collect::<Vec<_>>());
        let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(values)]).unwrap();
        writer.write(&batch, &mut ctx).unwrap();
    }
    assert_eq!(writer.file_counter(), 3);
    let files = writer.finalize(&mut ctx).unwrap().to_vec();
    assert_eq!(writer.file_counter(), 4);
    assert_eq!(files.iter().map(|f| f.num_batches).collect::<Vec<_>>(), [3, 3, 3, 1]);
    assert_eq!(files.iter().map(|f| f.num_rows).sum::<u64>(), 375_000);
    assert_eq!(stored_rows(&ctx, "out"), 375_000);
}

// ============================================================================
// SECTION: Merging
// ============================================================================

/// Runs a parse-and-profile job over the files of `inputs` matching `glob`.
fn profile_job(root: &Path, inputs: &Path, glob: &str) -> JobContext {
    let generator = component(
        "filegen",
        Properties::new().with("path", inputs.display().to_string()).with("glob", glob),
    );
    let config = configuration(
        generator,
        csv_handler(1024),
        vec![component("csvtool", Properties::new()), component("tdigesttool", Properties::new())],
        vec![component("csvparser", Properties::new()), component("profiler", Properties::new())],
        SamplerConfig::default(),
    );
    let menu = menu("profile", vec![
        node("parse", "initial", &["csvparser"]),
        node("profile", "parse", &["profiler"]),
    ]);
    let mut controller = controller(root, &menu, &config);
    assert!(controller.control(), "{:?}", controller.fault());
    controller.into_context()
}

/// Verifies merged worker histograms equal a single pass and merged digests stay accurate.
#[test]
fn independent_workers_merge_to_single_pass() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    fs::create_dir_all(&inputs).unwrap();
    let generator = CsvGenerator::new(
        "parts",
        Properties::new().with("num_rows", 200_i64).with("num_cols", 3_i64).with("seed", 7_i64),
    )
    .unwrap();
    let mut exact: Vec<f64> = Vec::new();
    for part in 0 .. 10_u64 {
        let data = generator.make_csv(part);
        let text = String::from_utf8(data.to_vec()).unwrap();
        exact.extend(text.lines().skip(1).map(|line| line.trim().split(',').next().unwrap().parse::<f64>().unwrap()));
        fs::write(inputs.join(format!("part_{part}.csv")), &data).unwrap();
    }
    exact.sort_by(f64::total_cmp);

    let single = profile_job(&dir.path().join("single"), &inputs, "part_*.csv");
    let workers: Vec<JobContext> = (0 .. 10)
        .map(|part| profile_job(&dir.path().join(format!("worker_{part}")), &inputs, &format!("part_{part}.csv")))
        .collect();

    let mut hbook = HistogramBook::new();
    let mut tbook = TDigestBook::new();
    for worker in &workers {
        hbook = hbook.merge(worker.hbook()).unwrap();
        tbook = tbook.merge(worker.tbook());
    }
    for key in ["artemis.counts", "artemis.nblocks", "artemis.payload"] {
        let merged = hbook.get(key).unwrap();
        let reference = single.hbook().get(key).unwrap();
        assert_eq!(merged.entries(), reference.entries(), "{key}");
        assert_eq!(merged.frequencies(), reference.frequencies(), "{key}");
    }
    assert_eq!(hbook.get("artemis.counts").unwrap().entries(), 10);

    let digest = tbook.get("profiler.aa").unwrap();
    assert!((digest.count() - 2000.0).abs() < f64::EPSILON);
    assert!((single.tbook().get("profiler.aa").unwrap().count() - 2000.0).abs() < f64::EPSILON);
    for (percent, fraction) in [(10_usize, 0.1), (50, 0.5), (90, 0.9)] {
        let index = percent * (exact.len() - 1) / 100;
        let estimate = digest.cdf(exact[index]).unwrap();
        assert!((estimate - fraction).abs() < 0.02, "p{percent}: cdf {estimate}");
    }
}

// ============================================================================
// SECTION: Abort
// ============================================================================

/// Verifies a header change aborts the job and leaves the first file's output listable.
#[test]
fn header_change_aborts_with_partial_output() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.csv"), "a,b\r\n1,2\r\n3,4\r\n").unwrap();
    fs::write(inputs.join("b.csv"), "a,b,c\r\n1,2,3\r\n").unwrap();

    let generator = component("filegen", Properties::new().with("path", inputs.display().to_string()));
    let config = configuration(
        generator,
        csv_handler(1024),
        vec![component("csvtool", Properties::new())],
        vec![component("csvparser", Properties::new())],
        SamplerConfig::default(),
    );
    let menu = menu("parse", vec![node("parse", "initial", &["csvparser"])]);
    let mut controller = controller(&dir.path().join("store"), &menu, &config);
    assert!(!controller.control());
    assert_eq!(controller.history().last(), Some(&JobState::Abort));
    assert!(matches!(controller.fault(), Some(ControllerError::Reader(ReaderError::HeaderInvalid(_)))));
    assert!(controller.cleanup_fault().is_none());

    let ctx = controller.context();
    let listed = ctx.store().list(ctx.output_id(), "arrow");
    assert_eq!(listed.len(), 1);
    assert_eq!(stored_rows(ctx, "parse"), 2);
    assert_eq!(recorded_state(ctx), JobState::Abort);
}
