// crates/strata-core/tests/writer.rs
// ============================================================================
// Module: Output Writer Tests
// Description: Buffered Arrow output, file rollover, and leaf collection.
// ============================================================================
//! ## Overview
//! Drives [`BufferOutputWriter`] and [`Collector`] against a job context over
//! a temporary store and checks the registered files and tables.

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

use std::sync::Arc;

use arrow::array::Int64Array;
use arrow::array::StringArray;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use strata_core::BufferOutputWriter;
use strata_core::Collector;
use strata_core::JobContext;
use strata_core::MenuGraph;
use strata_core::ObjectStore;
use strata_core::Properties;
use strata_core::io::WriterConfig;
use strata_core::proto::Chain;
use strata_core::proto::JobInfo;
use strata_core::proto::Node;
use strata_core::runtime::Datum;
use strata_core::runtime::ExecutionTree;
use strata_core::store::StoreStream;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens a job context on a fresh dataset with partition `out`.
fn context(dir: &TempDir) -> JobContext {
    let mut store = ObjectStore::create(dir.path(), "writer").unwrap();
    let dataset = store.register_dataset(None, None).unwrap();
    let job_id = store.new_job(&dataset.uuid).unwrap();
    let info = JobInfo {
        name: "writer-test".to_string(),
        job_id,
        dataset_id: dataset.uuid,
        ..JobInfo::default()
    };
    let mut ctx = JobContext::new(info, store);
    ctx.new_partition("out").unwrap();
    ctx
}

/// Batch of `n` rows with columns `id` and `label`.
fn batch(start: i64, n: i64) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("label", DataType::Utf8, false),
    ]));
    let ids = Int64Array::from((start .. start + n).collect::<Vec<_>>());
    let labels = StringArray::from((start .. start + n).map(|i| format!("v{i}")).collect::<Vec<_>>());
    RecordBatch::try_new(schema, vec![Arc::new(ids), Arc::new(labels)]).unwrap()
}

/// Rows of every Arrow file in a partition, read back through the store.
fn stored_rows(ctx: &JobContext, partition: &str) -> Vec<usize> {
    let files = ctx.store().list_files(ctx.output_id(), Some(partition)).unwrap();
    files
        .iter()
        .filter(|f| f.name.ends_with(".arrow"))
        .map(|f| match ctx.store().open(&f.uuid).unwrap() {
            StoreStream::Arrow(reader) => reader.map(|b| b.unwrap().num_rows()).sum(),
            _ => panic!("{} did not open as arrow", f.name),
        })
        .collect()
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Verifies batches share one file while under budget.
#[test]
fn batches_share_a_file_under_budget() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let mut writer = BufferOutputWriter::new("out", WriterConfig::default());
    for i in 0 .. 3 {
        writer.write(&batch(i * 10, 10), &mut ctx).unwrap();
    }
    assert!(writer.buffered_bytes() > 0);
    assert_eq!(writer.total_records(), 30);
    let files = writer.finalize(&mut ctx).unwrap().to_vec();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].num_batches, 3);
    assert_eq!(files[0].num_rows, 30);
    assert_eq!(files[0].num_columns, 2);
    assert!(files[0].name.starts_with(&format!("{}.job_0.part_out.", ctx.output_id())));
    assert!(files[0].name.ends_with(".arrow"));
    assert_eq!(stored_rows(&ctx, "out"), [30]);
    assert_eq!(ctx.store().list_tables(ctx.output_id()).unwrap().len(), 1);
}

/// Verifies a tiny budget rolls every batch into its own file.
#[test]
fn small_budget_rolls_files() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let config = WriterConfig {
        max_size: 1,
        write_csv: false,
    };
    let mut writer = BufferOutputWriter::new("out", config);
    for i in 0 .. 4 {
        writer.write(&batch(i * 5, 5), &mut ctx).unwrap();
    }
    assert_eq!(writer.file_counter(), 3);
    let files = writer.finalize(&mut ctx).unwrap();
    assert_eq!(files.len(), 4);
    assert!(files.iter().all(|f| f.num_batches == 1 && f.num_rows == 5));
    assert_eq!(writer.file_counter(), 4);
    assert_eq!(stored_rows(&ctx, "out"), [5, 5, 5, 5]);
    assert_eq!(ctx.store().list_tables(ctx.output_id()).unwrap().len(), 4);
}

/// Verifies a batch with a different schema is skipped, not written.
#[test]
fn schema_mismatch_is_skipped() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let mut writer = BufferOutputWriter::new("out", WriterConfig::default());
    writer.write(&batch(0, 4), &mut ctx).unwrap();
    let other = RecordBatch::try_new(
        Arc::new(Schema::new(vec![Field::new("other", DataType::Int64, false)])),
        vec![Arc::new(Int64Array::from(vec![1, 2, 3]))],
    )
    .unwrap();
    writer.write(&other, &mut ctx).unwrap();
    assert_eq!(writer.total_records(), 4);
    let files = writer.finalize(&mut ctx).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].num_rows, 4);
}

/// Verifies a writer that never received a batch registers nothing.
#[test]
fn empty_writer_registers_nothing() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let mut writer = BufferOutputWriter::new("out", WriterConfig::default());
    assert!(writer.finalize(&mut ctx).unwrap().is_empty());
    assert!(ctx.store().list_files(ctx.output_id(), None).unwrap().is_empty());
}

/// Verifies the CSV copy option stores a readable text rendition.
#[test]
fn csv_copy_is_registered() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let props = Properties::new().with("write_csv", true).with("BUFFER_MAX_SIZE", 1_000_000_i64);
    let config = WriterConfig::from_properties(&props).unwrap();
    assert!(config.write_csv);
    assert_eq!(config.max_size, 1_000_000);
    let mut writer = BufferOutputWriter::new("out", config);
    writer.write(&batch(0, 2), &mut ctx).unwrap();
    writer.finalize(&mut ctx).unwrap();
    let files = ctx.store().list_files(ctx.output_id(), Some("out")).unwrap();
    let csv = files.iter().find(|f| f.name.ends_with(".csv")).unwrap();
    let text = String::from_utf8(ctx.store().get(&csv.uuid).unwrap()).unwrap();
    assert_eq!(text.lines().collect::<Vec<_>>(), ["id,label", "0,v0", "1,v1"]);
}

// ============================================================================
// SECTION: Collector
// ============================================================================

/// Verifies only leaf outputs are collected, one writer per leaf.
#[test]
fn collector_writes_leaf_batches() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    let menu = MenuGraph::from_chains("m", "menu", vec![Chain {
        name: "main".to_string(),
        nodes: vec![Node {
            name: "parse".to_string(),
            parents: vec!["initial".to_string()],
            algorithms: vec!["parser".to_string()],
        }],
    }])
    .unwrap();
    let mut tree = ExecutionTree::from_menu(&menu);
    let mut collector = Collector::new(menu.leaves(), WriterConfig::default());
    collector.initialize(&mut ctx).unwrap();
    assert!(ctx.store().list_partitions(ctx.output_id()).unwrap().contains(&"parse".to_string()));

    for i in 0 .. 2 {
        tree.element_mut("initial").unwrap().set(Datum::Batch(batch(100, 1)));
        tree.element_mut("parse").unwrap().set(Datum::Batch(batch(i * 3, 3)));
        collector.collect(&tree, &mut ctx).unwrap();
        tree.flush();
    }
    assert!(collector.writer("initial").is_none());
    let files = collector.finalize(&mut ctx).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].num_rows, 6);
    assert_eq!(stored_rows(&ctx, "parse"), [6]);

    // A second finalize, as on abort after success, records nothing new.
    let again = collector.finalize(&mut ctx).unwrap();
    assert_eq!(again.len(), 1);
    ctx.finalize_job(strata_core::proto::JobState::Success).unwrap();
    let summary = ctx.meta().summary.clone().unwrap();
    assert_eq!(summary.tables.len(), 1);
}

/// Verifies collector options come from the buffer writer tool entry.
#[test]
fn collector_reads_tool_options() {
    let tools = vec![strata_core::proto::ComponentConfig {
        name: "bufferwriter".to_string(),
        class: "bufferwriter".to_string(),
        properties: Some(Properties::new().with("BUFFER_MAX_SIZE", 4096_i64).to_message()),
        ..Default::default()
    }];
    let collector = Collector::from_tools(vec!["leaf".to_string()], &tools).unwrap();
    assert_eq!(collector.config().max_size, 4096);
    assert_eq!(collector.leaves(), ["leaf"]);
}
