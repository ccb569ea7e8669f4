// crates/strata-config/src/convert.rs
// ============================================================================
// Module: Message Conversion
// Description: Builds menu, configuration, and job messages from a job file.
// Purpose: Hand the controller exactly what the store registers.
// Dependencies: strata-core
// ============================================================================

//! ## Overview
//! Conversion is infallible on a validated [`JobConfig`]. A `[input.files]`
//! section becomes a `filegen` source descriptor, and `[memory]` writer
//! settings become a `bufferwriter` tool descriptor appended after the
//! declared tools.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use strata_core::Properties;
use strata_core::PropertyValue;
use strata_core::io::collector::BUFFER_WRITER_CLASS;
use strata_core::io::writer::BUFFER_MAX_SIZE_KEY;
use strata_core::io::writer::WRITE_CSV_KEY;
use strata_core::proto;
use strata_core::proto::Chain;
use strata_core::proto::ComponentConfig;
use strata_core::proto::Configuration;
use strata_core::proto::CsvHandlerConfig;
use strata_core::proto::FieldSpec;
use strata_core::proto::FileHandlerConfig;
use strata_core::proto::InputConfig;
use strata_core::proto::IpcHandlerConfig;
use strata_core::proto::JobInfo;
use strata_core::proto::LegacyHandlerConfig;
use strata_core::proto::Menu;
use strata_core::proto::Node;
use strata_core::proto::SamplerConfig;
use strata_core::proto::SasHandlerConfig;
use strata_core::proto::file_handler_config::Kind;

use crate::config::ComponentSection;
use crate::config::FilesSection;
use crate::config::HandlerSection;
use crate::config::JobConfig;
use crate::config::PropertyEntry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Source class used for `[input.files]`.
pub const FILE_SOURCE_CLASS: &str = "filegen";

// ============================================================================
// SECTION: Conversion
// ============================================================================

impl From<&PropertyEntry> for PropertyValue {
    fn from(entry: &PropertyEntry) -> Self {
        match entry {
            PropertyEntry::Bool(value) => Self::Bool(*value),
            PropertyEntry::Int(value) => Self::Int(*value),
            PropertyEntry::Float(value) => Self::Float(*value),
            PropertyEntry::Str(value) => Self::Str(value.clone()),
            PropertyEntry::List(values) => Self::List(values.clone()),
        }
    }
}

impl JobConfig {
    /// Menu message; the name defaults to the job name.
    #[must_use]
    pub fn to_menu(&self) -> Menu {
        let name = if self.menu.name.is_empty() { &self.job.name } else { &self.menu.name };
        Menu {
            uuid: String::new(),
            name: name.clone(),
            chains: self
                .menu
                .chains
                .iter()
                .map(|chain| Chain {
                    name: chain.name.clone(),
                    nodes: chain
                        .nodes
                        .iter()
                        .map(|node| Node {
                            name: node.name.clone(),
                            parents: node.parents.clone(),
                            algorithms: node.algorithms.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Configuration message.
    #[must_use]
    pub fn to_configuration(&self) -> Configuration {
        let generator = match (&self.input.generator, &self.input.files) {
            (Some(generator), _) => Some(component_message(generator)),
            (None, Some(files)) => Some(file_source(files)),
            (None, None) => None,
        };
        let mut tools: Vec<ComponentConfig> = self.tools.iter().map(component_message).collect();
        if self.memory.configures_writer() {
            let mut props = Properties::new();
            if let Some(size) = self.memory.max_buffer_size {
                props = props.with(BUFFER_MAX_SIZE_KEY, i64::try_from(size).unwrap_or(i64::MAX));
            }
            if let Some(write_csv) = self.memory.write_csv {
                props = props.with(WRITE_CSV_KEY, write_csv);
            }
            tools.push(ComponentConfig {
                name: BUFFER_WRITER_CLASS.to_string(),
                class: BUFFER_WRITER_CLASS.to_string(),
                module: String::new(),
                properties: Some(props.to_message()),
            });
        }
        Configuration {
            uuid: String::new(),
            name: self.job.name.clone(),
            input: Some(InputConfig {
                generator,
                filehandler: Some(handler_message(&self.input.handler)),
            }),
            tools,
            algos: self.algorithms.iter().map(component_message).collect(),
            sampler: Some(SamplerConfig {
                ndatums: self.sampler.ndatums,
                nchunks: self.sampler.nchunks,
                seed: self.sampler.seed,
            }),
            max_malloc_size_bytes: self.memory.max_malloc_size_bytes,
        }
    }

    /// Job record pointing at registered menu and configuration objects.
    #[must_use]
    pub fn job_info(&self, menu_id: &str, config_id: &str) -> JobInfo {
        let job = &self.job;
        JobInfo {
            name: job.name.clone(),
            store_path: job.store_path.clone(),
            store_name: job.store_name.clone(),
            store_id: job.store_id.clone(),
            menu_id: menu_id.to_string(),
            config_id: config_id.to_string(),
            dataset_id: job.dataset_id.clone(),
            parentset_id: job.parentset_id.clone(),
            loglevel: job.loglevel.to_ascii_lowercase(),
            ..JobInfo::default()
        }
    }
}

fn properties_message(entries: &BTreeMap<String, PropertyEntry>) -> proto::Properties {
    entries
        .iter()
        .fold(Properties::new(), |props, (key, entry)| props.with(key, PropertyValue::from(entry)))
        .to_message()
}

fn component_message(component: &ComponentSection) -> ComponentConfig {
    ComponentConfig {
        name: component.name.clone(),
        class: component.class.clone(),
        module: component.module.clone(),
        properties: Some(properties_message(&component.properties)),
    }
}

fn file_source(files: &FilesSection) -> ComponentConfig {
    let props = Properties::new().with("path", files.path.as_str()).with("glob", files.glob.as_str());
    ComponentConfig {
        name: FILE_SOURCE_CLASS.to_string(),
        class: FILE_SOURCE_CLASS.to_string(),
        module: String::new(),
        properties: Some(props.to_message()),
    }
}

fn handler_message(handler: &HandlerSection) -> FileHandlerConfig {
    let kind = match handler {
        HandlerSection::Csv(csv) => Kind::Csv(CsvHandlerConfig {
            blocksize: csv.blocksize,
            delimiter: csv.delimiter.clone(),
            separator: csv.separator.clone(),
            header_rows: csv.header_rows,
            schema: csv.schema.clone(),
        }),
        HandlerSection::Legacy(legacy) => Kind::Legacy(LegacyHandlerConfig {
            header_size: legacy.header_size,
            footer_size: legacy.footer_size,
            records_per_block: legacy.records_per_block,
            fields: legacy
                .fields
                .iter()
                .map(|f| FieldSpec {
                    name: f.name.clone(),
                    length: f.length,
                    utype: f.utype.clone(),
                })
                .collect(),
        }),
        HandlerSection::Ipc { stream } => Kind::Ipc(IpcHandlerConfig { stream: *stream }),
        HandlerSection::Sas { rows_per_batch } => Kind::Sas(SasHandlerConfig {
            rows_per_batch: *rows_per_batch,
        }),
    };
    FileHandlerConfig { kind: Some(kind) }
}
