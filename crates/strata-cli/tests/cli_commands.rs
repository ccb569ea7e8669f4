// crates/strata-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Runs the `strata` binary against temporary stores.
// ============================================================================
//! ## Overview
//! Drives `run`, `list`, and `inspect` as a user would: a generated CSV job
//! that succeeds and persists its log, a directory job that aborts on a header
//! change, and a job file that fails validation before any store exists.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn strata_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_strata"))
}

/// Runs the binary with `RUST_LOG` cleared.
fn strata(args: &[&str]) -> Output {
    Command::new(strata_bin()).args(args).env_remove("RUST_LOG").output().expect("run strata")
}

/// Parses stdout as JSON.
fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!("stdout is not json ({err}): {}", String::from_utf8_lossy(&output.stdout))
    })
}

/// Writes a job file whose store lives under `root`.
fn write_job(root: &Path, input: &str) -> PathBuf {
    let store = root.join("store");
    let content = format!(
        r#"
[job]
name = "cli-job"
store_path = "{}"
loglevel = "info"

{input}

[[tools]]
name = "csvtool"
class = "csvtool"

[[algorithms]]
name = "csvparser"
class = "csvparser"

[[menu.chains]]
name = "main"

[[menu.chains.nodes]]
name = "parse"
algorithms = ["csvparser"]
"#,
        store.display()
    );
    let path = root.join("job.toml");
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies a generated job succeeds, stores its log, and can be listed and inspected.
#[test]
fn run_list_and_inspect_generated_job() {
    let dir = TempDir::new().unwrap();
    let input = r#"
[input.generator]
name = "csvgen"
class = "csvgen"

[input.generator.properties]
nbatches = 2
num_rows = 200
seed = 5
"#;
    let config = write_job(dir.path(), input);
    let output = strata(&["run", "--config", config.to_str().unwrap(), "--persist-log", "--format", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = json(&output);
    assert_eq!(report["state"], "SUCCESS");
    assert_eq!(report["processed_ndatums"], 2);
    assert_eq!(report["phases"][0], "STARTING");
    let rows: u64 = report["tables"].as_array().unwrap().iter().map(|t| t["num_rows"].as_u64().unwrap()).sum();
    assert_eq!(rows, 400);
    let store_id = report["store_id"].as_str().unwrap().to_string();
    let dataset_id = report["dataset_id"].as_str().unwrap().to_string();
    let log_id = report["log_id"].as_str().unwrap().to_string();

    let store_path = dir.path().join("store");
    let store_path = store_path.to_str().unwrap();
    let listed = strata(&[
        "list", "--store-path", store_path, "--store-id", &store_id, "--prefix", &dataset_id, "--suffix", "arrow",
        "--format", "json",
    ]);
    assert!(listed.status.success(), "{}", String::from_utf8_lossy(&listed.stderr));
    let objects = json(&listed)["objects"].as_array().unwrap().clone();
    assert!(!objects.is_empty());
    assert!(objects.iter().all(|o| o["kind"] == "file"));

    let log = strata(&["inspect", "--store-path", store_path, "--store-id", &store_id, &log_id, "--format", "json"]);
    assert!(log.status.success(), "{}", String::from_utf8_lossy(&log.stderr));
    let log = json(&log);
    assert_eq!(log["object"]["kind"], "log");
    assert!(log["details"]["lines"].as_u64().unwrap() > 0);

    let dataset = strata(&["inspect", "--store-path", store_path, "--store-id", &store_id, &dataset_id]);
    assert!(dataset.status.success());
    let text = String::from_utf8(dataset.stdout).unwrap();
    assert!(text.starts_with(&format!("dataset {dataset_id}")));
    let partitions = text.lines().find(|l| l.starts_with("partitions: ")).unwrap();
    assert!(partitions.contains("\"parse\""));
}

/// Verifies an aborted job prints its report and exits with failure.
#[test]
fn aborted_job_reports_fault() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.csv"), "a,b\r\n1,2\r\n").unwrap();
    fs::write(inputs.join("b.csv"), "a,b,c\r\n1,2,3\r\n").unwrap();
    let input = format!("[input.files]\npath = \"{}\"\nglob = \"*.csv\"\n", inputs.display());
    let config = write_job(dir.path(), &input);

    let output = strata(&["run", "--config", config.to_str().unwrap(), "--format", "json"]);
    assert!(!output.status.success());
    let report = json(&output);
    assert_eq!(report["state"], "ABORT");
    assert!(report["fault"].as_str().unwrap().contains("header"));
    assert!(report["log_id"].is_null());
}

/// Verifies a job file failing validation exits before creating a store.
#[test]
fn invalid_config_fails_early() {
    let dir = TempDir::new().unwrap();
    let config = write_job(dir.path(), "");
    let output = strata(&["run", "--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("input requires a generator or files"), "{stderr}");
    assert!(!dir.path().join("store").exists());
}

/// Verifies an unknown store id is reported on stderr.
#[test]
fn list_unknown_store_fails() {
    let dir = TempDir::new().unwrap();
    let output = strata(&["list", "--store-path", dir.path().to_str().unwrap(), "--store-id", "missing"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("strata: "));
}
