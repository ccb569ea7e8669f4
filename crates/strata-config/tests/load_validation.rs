// crates/strata-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Bounded file loading and consistency checks.
// ============================================================================
//! ## Overview
//! Loads job files from disk and from text, covering the size and encoding
//! guards, parse failures, and each validation rule that rejects a job before
//! anything is written to a store.

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
use std::path::PathBuf;

use strata_config::ConfigError;
use strata_config::HandlerSection;
use strata_config::JobConfig;
use strata_config::PropertyEntry;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Smallest valid job: generated input, one algorithm, one node.
const MINIMAL: &str = r#"
[job]
name = "minimal"

[input.generator]
name = "csvgen"
class = "csvgen"

[[algorithms]]
name = "csvparser"
class = "csvparser"

[[menu.chains]]
name = "main"

[[menu.chains.nodes]]
name = "parse"
algorithms = ["csvparser"]
"#;

/// Path of a sample configuration shipped with the workspace.
fn sample(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs").join(name)
}

/// Asserts `content` fails validation with a message containing `needle`.
fn assert_invalid(content: &str, needle: &str) {
    match JobConfig::from_toml_str(content) {
        Err(ConfigError::Invalid(message)) => assert!(message.contains(needle), "{message}"),
        other => panic!("expected invalid config containing {needle}, got {other:?}"),
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Verifies defaults fill every omitted section.
#[test]
fn minimal_config_uses_defaults() {
    let config = JobConfig::from_toml_str(MINIMAL).unwrap();
    assert_eq!(config.job.store_path, ".");
    assert_eq!(config.job.store_name, "strata");
    assert_eq!(config.job.loglevel, "info");
    assert_eq!(config.sampler.ndatums, 0);
    assert!(!config.memory.configures_writer());
    assert!(matches!(config.input.handler, HandlerSection::Csv(ref csv) if csv.header_rows == 1 && csv.separator == ","));
    assert_eq!(config.menu.chains[0].nodes[0].parents, ["initial"]);
}

/// Verifies the shipped sample configurations load.
#[test]
fn sample_configs_load() {
    let profile = JobConfig::load(Some(&sample("csvgen-profile.toml"))).unwrap();
    assert_eq!(profile.tools.len(), 3);
    assert_eq!(profile.memory.max_buffer_size, Some(1_048_576));
    let properties = &profile.input.generator.as_ref().unwrap().properties;
    assert_eq!(properties["nbatches"], PropertyEntry::Int(4));
    assert_eq!(profile.tools[1].properties["columns"], PropertyEntry::List(vec!["aa".into(), "ab".into()]));
    assert_eq!(profile.tools[2].properties["delta"], PropertyEntry::Float(0.01));

    let legacy = JobConfig::load(Some(&sample("legacy-decode.toml"))).unwrap();
    let HandlerSection::Legacy(handler) = &legacy.input.handler else {
        panic!("expected a legacy handler");
    };
    assert_eq!(handler.fields.len(), 3);
    assert_eq!(legacy.input.files.as_ref().unwrap().glob, "*.dat");
}

/// Verifies files over the size cap are rejected before parsing.
#[test]
fn oversized_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.toml");
    let mut content = MINIMAL.to_string();
    content.push_str(&"#".repeat(1_048_577));
    fs::write(&path, content).unwrap();
    let err = JobConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("config file exceeds size limit"));
}

/// Verifies non-UTF-8 bytes are rejected.
#[test]
fn non_utf8_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, [0xFF, 0xFE, b'a']).unwrap();
    let err = JobConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("config file must be utf-8"));
}

/// Verifies a missing file is an io error and an overlong path is invalid.
#[test]
fn path_failures() {
    let dir = TempDir::new().unwrap();
    let missing = JobConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(missing, ConfigError::Io(_)));

    let long = PathBuf::from("a/".repeat(2100));
    let err = JobConfig::load(Some(&long)).unwrap_err();
    assert!(err.to_string().contains("config path exceeds max length"));
}

/// Verifies malformed TOML and unknown keys are parse errors.
#[test]
fn parse_failures() {
    assert!(matches!(JobConfig::from_toml_str("[job"), Err(ConfigError::Parse(_))));
    let unknown = MINIMAL.replace("name = \"minimal\"", "name = \"minimal\"\ncolour = \"red\"");
    assert!(matches!(JobConfig::from_toml_str(&unknown), Err(ConfigError::Parse(_))));
    let bad_kind = format!("{MINIMAL}\n[input.handler]\nkind = \"parquet\"\n");
    assert!(matches!(JobConfig::from_toml_str(&bad_kind), Err(ConfigError::Parse(_))));
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Verifies job identity rules.
#[test]
fn job_rules() {
    assert_invalid(&MINIMAL.replace("name = \"minimal\"", "name = \" \""), "job.name");
    assert_invalid(&MINIMAL.replace("name = \"minimal\"", "name = \"m\"\nloglevel = \"loud\""), "loglevel");
}

/// Verifies the input must name exactly one source.
#[test]
fn input_needs_one_source() {
    let both = format!("{MINIMAL}\n[input.files]\npath = \"data\"\n");
    assert_invalid(&both, "both");
    let none = MINIMAL.replace("[input.generator]\nname = \"csvgen\"\nclass = \"csvgen\"\n", "");
    assert_invalid(&none, "requires a generator or files");
}

/// Verifies handler parameter checks.
#[test]
fn handler_rules() {
    let separator = format!("{MINIMAL}\n[input.handler]\nkind = \"csv\"\nseparator = \";;\"\n");
    assert_invalid(&separator, "single byte");
    let no_fields = format!("{MINIMAL}\n[input.handler]\nkind = \"legacy\"\n");
    assert_invalid(&no_fields, "at least one field");
    let bad_type = format!(
        "{MINIMAL}\n[input.handler]\nkind = \"legacy\"\n[[input.handler.fields]]\nname = \"x\"\nlength = 3\nutype = \"date\"\n"
    );
    assert_invalid(&bad_type, "unknown type date");
}

/// Verifies duplicate component names and undeclared algorithms are rejected.
#[test]
fn component_rules() {
    let duplicate = format!("{MINIMAL}\n[[algorithms]]\nname = \"csvparser\"\nclass = \"filter\"\n");
    assert_invalid(&duplicate, "duplicate algorithm name csvparser");
    let undeclared = MINIMAL.replace("algorithms = [\"csvparser\"]", "algorithms = [\"csvparser\", \"profiler\"]");
    assert_invalid(&undeclared, "undeclared algorithm profiler");
}

/// Verifies the menu graph is checked at load time.
#[test]
fn menu_rules() {
    let cycle = MINIMAL.replace(
        "name = \"parse\"\nalgorithms = [\"csvparser\"]",
        "name = \"parse\"\nparents = [\"parse\"]\nalgorithms = [\"csvparser\"]",
    );
    assert!(matches!(JobConfig::from_toml_str(&cycle), Err(ConfigError::Invalid(_))));
    let orphan = MINIMAL.replace(
        "name = \"parse\"\nalgorithms = [\"csvparser\"]",
        "name = \"parse\"\nparents = [\"missing\"]\nalgorithms = [\"csvparser\"]",
    );
    assert_invalid(&orphan, "unknown parent missing");
    let empty = MINIMAL.split("[[menu.chains]]").next().unwrap().to_string() + "[menu]\n";
    assert_invalid(&empty, "at least one chain");
}

/// Verifies writer settings cannot be given twice.
#[test]
fn memory_rules() {
    let conflict = format!(
        "{MINIMAL}\n[memory]\nwrite_csv = true\n[[tools]]\nname = \"out\"\nclass = \"bufferwriter\"\n"
    );
    assert_invalid(&conflict, "conflict");
    let zero = format!("{MINIMAL}\n[memory]\nmax_buffer_size = 0\n");
    assert_invalid(&zero, "must be positive");
}
