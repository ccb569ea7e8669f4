// crates/strata-core/src/runtime/tree.rs
// ============================================================================
// Module: Strata Execution Tree
// Description: Per-block node data mirroring the menu DAG.
// Purpose: Hold the data each node produced for the block in flight.
// Dependencies: arrow, bytes, crate::menu
// ============================================================================

//! ## Overview
//! The tree has one [`Element`] per menu node. For each block, steering
//! loads every element's inputs from its parents' current data and then runs
//! the node's algorithms; each algorithm may replace the element's output.
//! Nothing survives [`ExecutionTree::flush`], which steering calls between
//! blocks, between files, and between the sample and execute phases.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use bytes::Bytes;

use crate::menu::MenuGraph;

// ============================================================================
// SECTION: Datum
// ============================================================================

/// Data carried between nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// Unparsed block bytes, including any synthetic header.
    Raw(Bytes),
    /// Parsed columnar batch.
    Batch(RecordBatch),
}

impl Datum {
    /// Returns the batch, if parsed.
    #[must_use]
    pub const fn as_batch(&self) -> Option<&RecordBatch> {
        match self {
            Self::Batch(batch) => Some(batch),
            Self::Raw(_) => None,
        }
    }

    /// Returns the raw bytes, if unparsed.
    #[must_use]
    pub const fn as_raw(&self) -> Option<&Bytes> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Batch(_) => None,
        }
    }

    /// Number of rows for batches, byte length for raw blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Raw(bytes) => bytes.len(),
            Self::Batch(batch) => batch.num_rows(),
        }
    }

    /// True when there is nothing to process.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// SECTION: Element
// ============================================================================

/// Data slot for one menu node.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Node name.
    name: String,
    /// Parent node names in declaration order.
    parents: Vec<String>,
    /// Parent outputs for the current block.
    inputs: Vec<Datum>,
    /// Output written by the node's algorithms.
    output: Option<Datum>,
    /// Sequence id of the block within its file.
    seq: u64,
}

impl Element {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: &str, parents: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            parents,
            inputs: Vec::new(),
            output: None,
            seq: 0,
        }
    }

    /// Node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent names.
    #[must_use]
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Inputs from the parents, in parent order.
    #[must_use]
    pub fn inputs(&self) -> &[Datum] {
        &self.inputs
    }

    /// Sequence id of the block in flight.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// The latest data at this node: the output if set, else the first input.
    #[must_use]
    pub fn current(&self) -> Option<&Datum> {
        self.output.as_ref().or_else(|| self.inputs.first())
    }

    /// The current data as a batch.
    #[must_use]
    pub fn current_batch(&self) -> Option<&RecordBatch> {
        self.current().and_then(Datum::as_batch)
    }

    /// The current data as raw bytes.
    #[must_use]
    pub fn current_raw(&self) -> Option<&Bytes> {
        self.current().and_then(Datum::as_raw)
    }

    /// Replaces the node output.
    pub fn set(&mut self, datum: Datum) {
        self.output = Some(datum);
    }

    /// Loads the inputs for a new block and clears the previous output.
    pub fn load(&mut self, inputs: Vec<Datum>, seq: u64) {
        self.inputs = inputs;
        self.output = None;
        self.seq = seq;
    }

    /// Drops all data.
    pub fn clear(&mut self) {
        self.inputs.clear();
        self.output = None;
    }

    /// True when the element holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.output.is_none()
    }
}

// ============================================================================
// SECTION: Tree
// ============================================================================

/// Elements for every menu node plus the menu's ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionTree {
    /// Node names in execution order.
    order: Vec<String>,
    /// Leaf node names in execution order.
    leaves: Vec<String>,
    /// Elements by node name.
    elements: BTreeMap<String, Element>,
}

impl ExecutionTree {
    /// Builds an empty tree for a menu.
    #[must_use]
    pub fn from_menu(menu: &MenuGraph) -> Self {
        let order = menu.topological_order().to_vec();
        let elements = order
            .iter()
            .filter_map(|name| menu.node(name))
            .map(|node| (node.name.clone(), Element::new(&node.name, node.parents.clone())))
            .collect();
        Self {
            order,
            leaves: menu.leaves(),
            elements,
        }
    }

    /// Node names in execution order.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Leaf node names.
    #[must_use]
    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }

    /// Returns an element.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    /// Returns an element mutably.
    pub fn element_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements.get_mut(name)
    }

    /// Collects the current data of a node's parents.
    #[must_use]
    pub fn parent_data(&self, name: &str) -> Vec<Datum> {
        self.elements.get(name).map_or_else(Vec::new, |element| {
            element
                .parents
                .iter()
                .filter_map(|parent| self.elements.get(parent).and_then(Element::current).cloned())
                .collect()
        })
    }

    /// Current batches of the leaves, skipping leaves without batch output.
    #[must_use]
    pub fn leaf_batches(&self) -> Vec<(&str, &RecordBatch)> {
        self.leaves
            .iter()
            .filter_map(|leaf| {
                self.elements.get(leaf).and_then(Element::current_batch).map(|batch| (leaf.as_str(), batch))
            })
            .collect()
    }

    /// Clears every element.
    pub fn flush(&mut self) {
        self.elements.values_mut().for_each(Element::clear);
    }

    /// True when no element holds data.
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.elements.values().all(Element::is_empty)
    }
}
