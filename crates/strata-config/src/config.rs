// crates/strata-config/src/config.rs
// ============================================================================
// Module: Job Configuration Model
// Description: TOML sections, bounded loading, and validation.
// Purpose: Reject malformed job files before any store object is written.
// Dependencies: serde, strata-core, thiserror, toml, tracing
// ============================================================================

//! ## Overview
//! [`JobConfig`] mirrors the job file section by section. Loading resolves
//! the path (explicit, then `STRATA_CONFIG`, then `strata.toml`), checks the
//! path and file size limits, requires UTF-8, parses, and validates.
//! Validation checks names, handler parameters, component references, and
//! the menu graph itself, so conversion to messages cannot fail afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use strata_core::MenuGraph;
use strata_core::io::collector::BUFFER_WRITER_CLASS;
use strata_core::menu::ROOT_NODE;
use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// File name used when neither a path nor the environment names one.
pub const DEFAULT_CONFIG_NAME: &str = "strata.toml";
/// Environment variable holding the configuration path.
pub const CONFIG_ENV_VAR: &str = "STRATA_CONFIG";
/// Largest configuration file accepted, in bytes.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;
/// Longest accepted configuration path.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Longest accepted single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Accepted `loglevel` values.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
/// Accepted legacy field types.
const FIELD_TYPES: [&str; 3] = ["int", "uint", "str"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The file is not valid TOML for this model.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The file parsed but breaks a limit or a consistency rule.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Whole job file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Job identity and store location.
    pub job: JobSection,
    /// Preflight sampling.
    #[serde(default)]
    pub sampler: SamplerSection,
    /// Memory and output buffer limits.
    #[serde(default)]
    pub memory: MemorySection,
    /// Input source and file handler.
    #[serde(default)]
    pub input: InputSection,
    /// Tool descriptors.
    #[serde(default)]
    pub tools: Vec<ComponentSection>,
    /// Algorithm descriptors.
    #[serde(default)]
    pub algorithms: Vec<ComponentSection>,
    /// Algorithm chains.
    pub menu: MenuSection,
}

/// `[job]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSection {
    /// Job name.
    pub name: String,
    /// Directory holding the store.
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Store name.
    #[serde(default = "default_store_name")]
    pub store_name: String,
    /// Existing store uuid; empty creates a new store.
    #[serde(default)]
    pub store_id: String,
    /// Existing output dataset; empty registers a new one.
    #[serde(default)]
    pub dataset_id: String,
    /// Dataset the input was produced from, if any.
    #[serde(default)]
    pub parentset_id: String,
    /// Default log level.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

/// `[sampler]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSection {
    /// Input files drawn for the preflight.
    #[serde(default)]
    pub ndatums: u32,
    /// Blocks drawn per sampled file.
    #[serde(default)]
    pub nchunks: u32,
    /// Sampling seed.
    #[serde(default)]
    pub seed: u64,
}

/// `[memory]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemorySection {
    /// Allocation budget reported against at collect time; zero disables.
    #[serde(default)]
    pub max_malloc_size_bytes: u64,
    /// Output file budget for every writer.
    #[serde(default)]
    pub max_buffer_size: Option<u64>,
    /// Also persist a CSV rendering of each output file.
    #[serde(default)]
    pub write_csv: Option<bool>,
}

impl MemorySection {
    /// True when any writer setting is given.
    #[must_use]
    pub const fn configures_writer(&self) -> bool {
        self.max_buffer_size.is_some() || self.write_csv.is_some()
    }
}

/// `[input]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSection {
    /// Source component.
    #[serde(default)]
    pub generator: Option<ComponentSection>,
    /// Directory of input files, read through the file source.
    #[serde(default)]
    pub files: Option<FilesSection>,
    /// Block reader for each input file.
    #[serde(default)]
    pub handler: HandlerSection,
}

/// `[input.files]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesSection {
    /// Directory to scan.
    pub path: String,
    /// Shell-style file name pattern.
    #[serde(default = "default_glob")]
    pub glob: String,
}

/// `[input.handler]`, selected by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HandlerSection {
    /// Delimited text.
    Csv(CsvHandlerSection),
    /// Fixed-width EBCDIC records.
    Legacy(LegacyHandlerSection),
    /// Arrow IPC file or stream.
    Ipc {
        /// Read the stream format instead of the file format.
        #[serde(default)]
        stream: bool,
    },
    /// SAS7BDAT dataset.
    Sas {
        /// Rows per batch; zero uses the reader default.
        #[serde(default)]
        rows_per_batch: u64,
    },
}

impl Default for HandlerSection {
    fn default() -> Self {
        Self::Csv(CsvHandlerSection::default())
    }
}

/// Delimited text handler parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvHandlerSection {
    /// Block size in bytes; zero uses the reader default.
    pub blocksize: u64,
    /// Line delimiter.
    pub delimiter: String,
    /// Field separator.
    pub separator: String,
    /// Header lines; zero means headerless.
    pub header_rows: u32,
    /// Column names for headerless input.
    pub schema: Vec<String>,
}

impl Default for CsvHandlerSection {
    fn default() -> Self {
        Self {
            blocksize: 0,
            delimiter: "\r\n".to_string(),
            separator: ",".to_string(),
            header_rows: 1,
            schema: Vec::new(),
        }
    }
}

/// Fixed-width handler parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacyHandlerSection {
    /// Bytes skipped at the start of each file.
    pub header_size: u64,
    /// Bytes ignored at the end of each file.
    pub footer_size: u64,
    /// Records per block; zero uses the reader default.
    pub records_per_block: u64,
    /// Record layout.
    pub fields: Vec<FieldSection>,
}

/// One fixed-width field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSection {
    /// Column name.
    pub name: String,
    /// Width in bytes.
    pub length: u32,
    /// `int`, `uint`, or `str`.
    #[serde(default = "default_field_type")]
    pub utype: String,
}

/// `[[tools]]`, `[[algorithms]]`, and `[input.generator]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSection {
    /// Instance name, unique within its group.
    pub name: String,
    /// Registered class.
    pub class: String,
    /// Registered module; empty matches any.
    #[serde(default)]
    pub module: String,
    /// Flat property table.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyEntry>,
}

/// Property value as written in TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyEntry {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    Str(String),
    /// List of strings.
    List(Vec<String>),
}

/// `[menu]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuSection {
    /// Menu name; defaults to the job name.
    #[serde(default)]
    pub name: String,
    /// Chains of nodes.
    #[serde(default)]
    pub chains: Vec<ChainSection>,
}

/// `[[menu.chains]]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSection {
    /// Chain name.
    pub name: String,
    /// Nodes in declaration order.
    #[serde(default)]
    pub nodes: Vec<NodeSection>,
}

/// `[[menu.chains.nodes]]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSection {
    /// Node name.
    pub name: String,
    /// Parent nodes; defaults to the root.
    #[serde(default = "default_parents")]
    pub parents: Vec<String>,
    /// Algorithm names run in order.
    #[serde(default)]
    pub algorithms: Vec<String>,
}

fn default_store_path() -> String {
    ".".to_string()
}

fn default_store_name() -> String {
    "strata".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_glob() -> String {
    "*".to_string()
}

fn default_field_type() -> String {
    "str".to_string()
}

fn default_parents() -> Vec<String> {
    vec![ROOT_NODE.to_string()]
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Picks the configuration path: explicit, then the environment, then the default name.
#[must_use]
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_CONFIG_NAME),
    }
}

impl JobConfig {
    /// Loads and validates a job file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the path or file size exceeds its
    /// limit, the file is not UTF-8, or validation fails;
    /// [`ConfigError::Io`] when the file cannot be read; and
    /// [`ConfigError::Parse`] for malformed TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_path(path);
        check_path(&path)?;
        let bytes = read_bounded(&path)?;
        let content =
            std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config = Self::from_toml_str(content)?;
        info!(path = %path.display(), job = %config.job.name, "loaded job config");
        Ok(config)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Rejects overlong paths before touching the filesystem.
fn check_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    if path.components().any(|c| c.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH) {
        return Err(ConfigError::Invalid("config path component too long".to_string()));
    }
    Ok(())
}

/// Reads at most one byte past the size cap.
fn read_bounded(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let file = File::open(path).map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    let mut bytes = Vec::new();
    file.take(MAX_CONFIG_FILE_SIZE + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Validation
// ============================================================================

impl JobConfig {
    /// Checks the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first broken rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_job()?;
        self.validate_input()?;
        validate_group("tool", &self.tools)?;
        validate_group("algorithm", &self.algorithms)?;
        self.validate_memory()?;
        self.validate_menu()
    }

    fn validate_job(&self) -> Result<(), ConfigError> {
        let job = &self.job;
        if job.name.trim().is_empty() {
            return Err(invalid("job.name must not be empty"));
        }
        if job.store_path.is_empty() || job.store_name.is_empty() {
            return Err(invalid("job.store_path and job.store_name must not be empty"));
        }
        if !LOG_LEVELS.contains(&job.loglevel.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!("unknown loglevel {}", job.loglevel)));
        }
        if !job.parentset_id.is_empty() && job.parentset_id == job.dataset_id {
            return Err(invalid("job.parentset_id must differ from job.dataset_id"));
        }
        Ok(())
    }

    fn validate_input(&self) -> Result<(), ConfigError> {
        match (&self.input.generator, &self.input.files) {
            (Some(_), Some(_)) => return Err(invalid("input names both a generator and files")),
            (None, None) => return Err(invalid("input requires a generator or files")),
            (Some(generator), None) => validate_component("generator", generator)?,
            (None, Some(files)) => {
                if files.path.is_empty() {
                    return Err(invalid("input.files.path must not be empty"));
                }
                if files.glob.is_empty() {
                    return Err(invalid("input.files.glob must not be empty"));
                }
            }
        }
        match &self.input.handler {
            HandlerSection::Csv(csv) => validate_csv(csv),
            HandlerSection::Legacy(legacy) => validate_legacy(legacy),
            HandlerSection::Ipc { .. } | HandlerSection::Sas { .. } => Ok(()),
        }
    }

    fn validate_memory(&self) -> Result<(), ConfigError> {
        if let Some(size) = self.memory.max_buffer_size {
            if size == 0 {
                return Err(invalid("memory.max_buffer_size must be positive"));
            }
            if i64::try_from(size).is_err() {
                return Err(invalid("memory.max_buffer_size is out of range"));
            }
        }
        if self.memory.configures_writer() && self.tools.iter().any(|t| t.class == BUFFER_WRITER_CLASS) {
            return Err(ConfigError::Invalid(format!(
                "memory buffer settings conflict with an explicit {BUFFER_WRITER_CLASS} tool"
            )));
        }
        Ok(())
    }

    fn validate_menu(&self) -> Result<(), ConfigError> {
        if self.menu.chains.is_empty() {
            return Err(invalid("menu requires at least one chain"));
        }
        let declared: BTreeSet<&str> = self.algorithms.iter().map(|a| a.name.as_str()).collect();
        let mut used = BTreeSet::new();
        for chain in &self.menu.chains {
            if chain.nodes.is_empty() {
                return Err(ConfigError::Invalid(format!("chain {} has no nodes", chain.name)));
            }
            for node in &chain.nodes {
                for algorithm in &node.algorithms {
                    if !declared.contains(algorithm.as_str()) {
                        return Err(ConfigError::Invalid(format!(
                            "node {} names undeclared algorithm {algorithm}",
                            node.name
                        )));
                    }
                    used.insert(algorithm.as_str());
                }
            }
        }
        for name in declared.difference(&used) {
            warn!(algorithm = %name, "algorithm is declared but not used by the menu");
        }
        MenuGraph::from_message(&self.to_menu()).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn validate_component(group: &str, component: &ComponentSection) -> Result<(), ConfigError> {
    if component.name.is_empty() {
        return Err(ConfigError::Invalid(format!("{group} name must not be empty")));
    }
    if component.class.is_empty() {
        return Err(ConfigError::Invalid(format!("{group} {} has no class", component.name)));
    }
    Ok(())
}

fn validate_group(group: &str, components: &[ComponentSection]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for component in components {
        validate_component(group, component)?;
        if !seen.insert(component.name.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate {group} name {}", component.name)));
        }
    }
    Ok(())
}

fn validate_csv(csv: &CsvHandlerSection) -> Result<(), ConfigError> {
    if csv.delimiter.is_empty() {
        return Err(invalid("csv delimiter must not be empty"));
    }
    if csv.separator.len() != 1 {
        return Err(invalid("csv separator must be a single byte"));
    }
    if csv.delimiter.contains(&csv.separator) {
        return Err(invalid("csv separator must not appear in the line delimiter"));
    }
    if csv.header_rows == 0 && csv.schema.iter().any(String::is_empty) {
        return Err(invalid("csv schema column names must not be empty"));
    }
    Ok(())
}

fn validate_legacy(legacy: &LegacyHandlerSection) -> Result<(), ConfigError> {
    if legacy.fields.is_empty() {
        return Err(invalid("legacy handler requires at least one field"));
    }
    let mut seen = BTreeSet::new();
    for field in &legacy.fields {
        if field.name.is_empty() || field.length == 0 {
            return Err(ConfigError::Invalid(format!(
                "legacy field {} needs a name and a positive length",
                field.name
            )));
        }
        if !FIELD_TYPES.contains(&field.utype.as_str()) {
            return Err(ConfigError::Invalid(format!("legacy field {} has unknown type {}", field.name, field.utype)));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate legacy field {}", field.name)));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    //! Path guards and handler checks that need private helpers.
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_path(Some(Path::new("jobs/a.toml")));
        assert_eq!(path, PathBuf::from("jobs/a.toml"));
    }

    #[test]
    fn long_components_are_rejected() {
        let long = "x".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let err = check_path(Path::new(&long)).unwrap_err();
        assert!(err.to_string().contains("config path component too long"));
        assert!(check_path(Path::new("ok/strata.toml")).is_ok());
    }

    #[test]
    fn csv_separator_must_be_one_byte() {
        let mut csv = CsvHandlerSection::default();
        assert!(validate_csv(&csv).is_ok());
        csv.separator = "::".to_string();
        assert!(validate_csv(&csv).is_err());
        csv.separator = "\n".to_string();
        assert!(validate_csv(&csv).is_err());
    }
}
