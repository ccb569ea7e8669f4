// crates/strata-cli/tests/reports.rs
// ============================================================================
// Module: CLI Report Tests
// Description: Log capture and report rendering without a process.
// ============================================================================
//! ## Overview
//! Checks that the capture writer collects formatted events, that level
//! filters reject nonsense directives, and that reports render one fact per
//! line and serialize with stable field names.

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

use std::collections::BTreeMap;

use serde_json::json;
use strata_cli::LogCapture;
use strata_cli::ObjectList;
use strata_cli::ObjectReport;
use strata_cli::ObjectRow;
use strata_cli::RunReport;
use strata_cli::logging;
use strata_cli::report::TableRow;

/// Row with fixed ids.
fn row(kind: &str) -> ObjectRow {
    ObjectRow {
        kind: kind.to_string(),
        name: format!("ds.{kind}"),
        uuid: format!("{kind}-id"),
        parent_uuid: "ds".to_string(),
        address: format!("file:///store/ds.{kind}"),
    }
}

/// Verifies events written through a capture land in its buffer without color codes.
#[test]
fn capture_collects_events() {
    let capture = LogCapture::new();
    let subscriber = tracing_subscriber::fmt().with_writer(capture.clone()).with_ansi(false).finish();
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(dataset_id = "ds", "job finished");
        tracing::debug!("hidden at the default level");
    });
    let text = String::from_utf8(capture.contents()).unwrap();
    assert!(text.contains("job finished"));
    assert!(text.contains("dataset_id=\"ds\""));
    assert!(!text.contains("hidden"));
    assert!(!text.contains('\u{1b}'));
}

/// Verifies level directives are validated.
#[test]
fn filter_accepts_levels() {
    if std::env::var_os("RUST_LOG").is_none() {
        assert!(logging::filter("DEBUG").is_ok());
        assert!(logging::filter("strata_core=trace,warn").is_ok());
        assert!(logging::filter("strata=loudest").is_err());
    }
}

/// Verifies the run report text and success flag.
#[test]
fn run_report_renders() {
    let report = RunReport {
        job: "nightly".to_string(),
        store_id: "store".to_string(),
        dataset_id: "ds".to_string(),
        job_id: 3,
        state: "ABORT".to_string(),
        phases: vec!["STARTING".to_string(), "CONFIGURE".to_string(), "ABORT".to_string()],
        processed_bytes: 10,
        processed_ndatums: 1,
        tables: vec![TableRow {
            name: "ds.part_parse.x.arrow".to_string(),
            num_rows: 5,
            num_batches: 1,
            num_columns: 2,
        }],
        fault: Some("header invalid: b.csv".to_string()),
        log_id: None,
    };
    assert!(!report.succeeded());
    let text = report.render_text();
    assert!(text.starts_with("job: nightly (ABORT)\n"));
    assert!(text.contains("dataset: ds job 3\n"));
    assert!(text.contains("table: ds.part_parse.x.arrow rows=5 batches=1 columns=2\n"));
    assert!(text.contains("fault: header invalid: b.csv\n"));
    assert!(!text.contains("log:"));

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["tables"][0]["num_rows"], 5);
    assert!(value["log_id"].is_null());
}

/// Verifies catalog listings and object descriptions render per line.
#[test]
fn catalog_reports_render() {
    let list = ObjectList {
        store_id: "store".to_string(),
        objects: vec![row("dataset"), row("log")],
    };
    assert_eq!(list.render_text(), "dataset\tdataset-id\tds.dataset\nlog\tlog-id\tds.log\n");

    let mut details = BTreeMap::new();
    details.insert("keys".to_string(), json!(["a.b", "c.d"]));
    details.insert("state".to_string(), json!("SUCCESS"));
    let report = ObjectReport {
        object: row("job"),
        details,
    };
    let text = report.render_text();
    assert!(text.starts_with("job job-id\nname: ds.job\n"));
    assert!(text.contains("keys: [\"a.b\",\"c.d\"]\n"));
    assert!(text.contains("state: SUCCESS\n"));
}
