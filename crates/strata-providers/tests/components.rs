// crates/strata-providers/tests/components.rs
// ============================================================================
// Module: Component Tests
// Description: Tools, algorithms, and registration outside a running job.
// ============================================================================
//! ## Overview
//! Exercises each built-in tool directly, drives the profiler algorithm
//! against a hand-built job context, and checks that the built-in registry
//! exposes every class exactly once.

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

use arrow::array::Array;
use arrow::array::Int64Array;
use arrow::array::StringArray;
use arrow::array::UInt64Array;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use strata_core::Algorithm;
use strata_core::ComponentError;
use strata_core::JobContext;
use strata_core::ObjectStore;
use strata_core::Properties;
use strata_core::RegistryError;
use strata_core::proto::JobInfo;
use strata_core::runtime::Datum;
use strata_core::runtime::Element;
use strata_providers::CsvTool;
use strata_providers::FilterColTool;
use strata_providers::LegacyGenerator;
use strata_providers::LegacyTool;
use strata_providers::ProfilerAlgo;
use strata_providers::TDigestTool;
use strata_providers::builtin_registry;
use strata_providers::fields::parse_fields;
use strata_providers::register_builtins;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Batch with an integer, an unsigned and a text column.
fn mixed_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("count", DataType::UInt64, false),
        Field::new("label", DataType::Utf8, false),
    ]));
    RecordBatch::try_new(schema, vec![
        Arc::new(Int64Array::from(vec![-2, 0, 5, 9])),
        Arc::new(UInt64Array::from(vec![1, 2, 3, 4])),
        Arc::new(StringArray::from(vec!["w", "x", "y", "z"])),
    ])
    .unwrap()
}

/// Job context with one tool and the given header columns.
fn context(dir: &TempDir, tool: Box<dyn strata_core::Tool>, columns: &[&str]) -> JobContext {
    let store = ObjectStore::create(dir.path(), "components").unwrap();
    let mut ctx = JobContext::new(JobInfo::default(), store);
    ctx.tools_mut().insert(tool);
    let columns: Vec<String> = columns.iter().map(ToString::to_string).collect();
    ctx.set_current_file("input.csv", &columns);
    ctx
}

/// Element holding `batch` as its only input.
fn element(batch: RecordBatch) -> Element {
    let mut element = Element::new("profile", vec!["initial".to_string()]);
    element.load(vec![Datum::Batch(batch)], 0);
    element
}

// ============================================================================
// SECTION: CSV Tool
// ============================================================================

/// Verifies the first block fixes inferred types for every later block.
#[test]
fn csv_schema_is_fixed_by_first_block() {
    let mut tool = CsvTool::new("csvtool", Properties::new()).unwrap();
    let first = tool.parse(b"a,b,c\r\n1,0.5,x\r\n2,1.5,y\r\n").unwrap();
    assert_eq!(first.num_rows(), 2);
    let types: Vec<DataType> = first.schema().fields().iter().map(|f| f.data_type().clone()).collect();
    assert_eq!(types, [DataType::Int64, DataType::Float64, DataType::Utf8]);

    let second = tool.parse(b"a,b,c\r\n3,2,z\r\n").unwrap();
    assert_eq!(second.schema(), first.schema());
    assert!(tool.parse(b"a,b,c\r\nnope,2,z\r\n").is_err());

    tool.reset_schema();
    assert!(tool.schema().is_none());
}

/// Verifies a custom separator and headerless blocks.
#[test]
fn csv_dialect_follows_properties() {
    let props = Properties::new().with("delimiter", "|").with("has_header", false);
    let mut tool = CsvTool::new("pipes", props).unwrap();
    let batch = tool.parse(b"1|2\n3|4\n5|6\n").unwrap();
    assert_eq!(batch.num_rows(), 3);
    assert_eq!(batch.num_columns(), 2);
    assert!(CsvTool::new("bad", Properties::new().with("delimiter", "||")).is_err());
}

// ============================================================================
// SECTION: Filter Tool
// ============================================================================

/// Verifies keep, drop, and pass-through projections.
#[test]
fn filter_projects_by_name() {
    let batch = mixed_batch();
    let keep = FilterColTool::new("keep", Properties::new().with("columns", vec!["label".to_string()])).unwrap();
    let kept = keep.filter(&batch).unwrap();
    assert_eq!(kept.num_columns(), 1);
    assert_eq!(kept.schema().field(0).name(), "label");

    let drop_props = Properties::new().with("columns", vec!["label".to_string()]).with("invert", true);
    let dropped = FilterColTool::new("drop", drop_props).unwrap().filter(&batch).unwrap();
    assert_eq!(dropped.num_columns(), 2);
    assert!(dropped.schema().column_with_name("label").is_none());

    let all = FilterColTool::new("all", Properties::new()).unwrap().filter(&batch).unwrap();
    assert_eq!(all, batch);
}

// ============================================================================
// SECTION: Legacy Tool
// ============================================================================

/// Verifies generated fixed-width files decode into typed columns within bounds.
#[test]
fn legacy_tool_decodes_generated_records() {
    let entries = vec!["amount:7:int:-500:500".to_string(), "units:4:uint".to_string(), "code:3:str".to_string()];
    let generator =
        LegacyGenerator::new("gen", Properties::new().with("fields", entries.clone()).with("num_rows", 50_i64)).unwrap();
    let data = generator.make_file(0).unwrap();
    assert_eq!(data.len(), 50 * 14);

    let tool = LegacyTool::new("legacytool", Properties::new().with("fields", entries)).unwrap();
    let batch = tool.decode(&data).unwrap();
    assert_eq!(batch.num_rows(), 50);
    let amounts = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    assert!(amounts.values().iter().all(|v| (-500 ..= 500).contains(v)));
    let units = batch.column(1).as_any().downcast_ref::<UInt64Array>().unwrap();
    assert!(units.values().iter().all(|v| *v <= 9999));
    let codes = batch.column(2).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(codes.null_count(), 0);
    assert!(codes.iter().flatten().all(|c| c.len() <= 3));

    assert!(tool.decode(&data[.. 20]).unwrap_err().to_string().contains("whole number"));
}

/// Verifies an unconfigured tool refuses blocks until given a layout.
#[test]
fn legacy_tool_needs_a_layout() {
    let mut tool = LegacyTool::new("legacytool", Properties::new()).unwrap();
    assert!(!tool.is_configured());
    assert!(tool.decode(&[0x40; 4]).is_err());
    tool.configure(parse_fields(&["name:4:str".to_string()]).unwrap());
    let batch = tool.decode(&[0xC1, 0xC2, 0x40, 0x40]).unwrap();
    let names = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(names.value(0), "AB");
    assert!(LegacyTool::new("ascii", Properties::new().with("encoding", "ascii")).is_err());
}

// ============================================================================
// SECTION: Profiling
// ============================================================================

/// Verifies digests cover numeric columns only and honor the configured delta.
#[test]
fn tdigest_tool_skips_text_columns() {
    let tool = TDigestTool::new("tdigesttool", Properties::new().with("delta", 0.05)).unwrap();
    let digests = tool.digest_batch(&mixed_batch()).unwrap();
    assert_eq!(digests.keys().map(String::as_str).collect::<Vec<_>>(), ["count", "id"]);
    assert!((digests["id"].count() - 4.0).abs() < f64::EPSILON);
    assert!((digests["id"].delta() - 0.05).abs() < f64::EPSILON);
    assert!(TDigestTool::new("bad", Properties::new().with("delta", 1.5)).is_err());
}

/// Verifies the profiler fills the job's digests and tolerates a column mismatch.
#[test]
fn profiler_fills_digests() {
    let dir = TempDir::new().unwrap();
    let tool = TDigestTool::build("tdigesttool", Properties::new()).unwrap();
    let mut ctx = context(&dir, tool, &["id", "count"]);
    let mut profiler = ProfilerAlgo::new("profiler", Properties::new()).unwrap();
    profiler.initialize(&mut ctx).unwrap();
    let mut element = element(mixed_batch());
    profiler.execute(&mut element, &mut ctx).unwrap();
    assert_eq!(element.current_batch().unwrap().num_rows(), 4);
    let keys: Vec<&str> = ctx.tbook().keys().collect();
    assert_eq!(keys, ["profiler.count", "profiler.id"]);
    profiler.finalize(&mut ctx).unwrap();
}

/// Verifies strict profiling rejects a batch wider than the input header.
#[test]
fn strict_profiler_rejects_column_mismatch() {
    let dir = TempDir::new().unwrap();
    let tool = TDigestTool::build("tdigesttool", Properties::new()).unwrap();
    let mut ctx = context(&dir, tool, &["id"]);
    let mut profiler = ProfilerAlgo::new("profiler", Properties::new().with("strict", true)).unwrap();
    profiler.initialize(&mut ctx).unwrap();
    let err = profiler.execute(&mut element(mixed_batch()), &mut ctx).unwrap_err();
    assert!(matches!(err, ComponentError::Input(_)));
    assert!(ctx.tbook().is_empty());
}

/// Verifies initialize fails when the named tool is not loaded.
#[test]
fn profiler_requires_its_tool() {
    let dir = TempDir::new().unwrap();
    let tool = CsvTool::build("csvtool", Properties::new()).unwrap();
    let mut ctx = context(&dir, tool, &[]);
    let mut profiler = ProfilerAlgo::new("profiler", Properties::new()).unwrap();
    assert!(matches!(profiler.initialize(&mut ctx), Err(ComponentError::Tool(_))));
}

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Verifies every built-in class is registered once.
#[test]
fn builtin_registry_lists_every_class() {
    let mut registry = builtin_registry().unwrap();
    assert_eq!(registry.algorithm_classes().collect::<Vec<_>>(), ["csvparser", "filter", "legacy", "profiler"]);
    assert_eq!(registry.tool_classes().collect::<Vec<_>>(), ["csvtool", "filtercoltool", "legacytool", "tdigesttool"]);
    assert_eq!(registry.source_classes().collect::<Vec<_>>(), ["csvgen", "filegen", "legacygen"]);
    assert!(matches!(register_builtins(&mut registry), Err(RegistryError::Duplicate(_))));
}
