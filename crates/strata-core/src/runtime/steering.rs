// crates/strata-core/src/runtime/steering.rs
// ============================================================================
// Module: Strata Steering
// Description: Drives each block through the menu's algorithms in order.
// Purpose: Own the algorithms and execution tree of a job.
// Dependencies: thiserror, tracing, crate::{interfaces, menu, metrics, registry}
// ============================================================================

//! ## Overview
//! Steering instantiates every algorithm the menu references, once, through
//! the [`ComponentRegistry`]. For each block it walks the nodes in
//! topological order: the root receives the block itself, every other node
//! receives its parents' current data, and the node's algorithms run in
//! their declared order. Each algorithm call is timed into
//! `steer.time.<algorithm>`.
//!
//! The walk order depends only on the menu, so every block meets the
//! algorithms in the same sequence on every run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;
use tracing::error;

use super::JobContext;
use super::tree::Datum;
use super::tree::ExecutionTree;
use crate::interfaces::Algorithm;
use crate::interfaces::ComponentError;
use crate::menu::MenuError;
use crate::menu::MenuGraph;
use crate::menu::ROOT_NODE;
use crate::metrics::MetricsError;
use crate::metrics::Stopwatch;
use crate::metrics::float_range;
use crate::proto::ComponentConfig;
use crate::registry::ComponentRegistry;
use crate::registry::RegistryError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Component name of the steering timers.
pub const STEERING_COMPONENT: &str = "steer";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Steering failures.
#[derive(Debug, Error)]
pub enum SteeringError {
    /// The menu is invalid.
    #[error(transparent)]
    Menu(#[from] MenuError),
    /// An algorithm could not be built.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// An algorithm failed.
    #[error("algorithm {name} failed: {source}")]
    Algorithm {
        /// Algorithm name.
        name: String,
        /// Underlying failure.
        #[source]
        source: ComponentError,
    },
    /// A timer could not be booked or filled.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

// ============================================================================
// SECTION: Steering
// ============================================================================

/// Algorithm orchestration over the execution tree.
pub struct Steering {
    /// Compiled menu.
    menu: MenuGraph,
    /// Per-node data.
    tree: ExecutionTree,
    /// Algorithms by configured name.
    algorithms: BTreeMap<String, Box<dyn Algorithm>>,
}

impl std::fmt::Debug for Steering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Steering")
            .field("menu", &self.menu.name())
            .field("algorithms", &self.algorithms.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Steering {
    /// Builds every algorithm the menu references.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::Registry`] when an algorithm has no
    /// descriptor or its constructor fails.
    pub fn new(
        menu: MenuGraph,
        configs: &[ComponentConfig],
        registry: &ComponentRegistry,
    ) -> Result<Self, SteeringError> {
        let mut algorithms = BTreeMap::new();
        for name in menu.algorithms() {
            let config = configs.iter().find(|c| c.name == name).ok_or_else(|| RegistryError::LoadFailed {
                name: name.clone(),
                reason: "no algorithm descriptor in configuration".to_string(),
            })?;
            debug!(algorithm = %name, class = %config.class, "building algorithm");
            algorithms.insert(name, registry.build_algorithm(config)?);
        }
        let tree = ExecutionTree::from_menu(&menu);
        Ok(Self { menu, tree, algorithms })
    }

    /// Compiled menu.
    #[must_use]
    pub const fn menu(&self) -> &MenuGraph {
        &self.menu
    }

    /// Execution tree.
    #[must_use]
    pub const fn tree(&self) -> &ExecutionTree {
        &self.tree
    }

    /// Mutable execution tree.
    pub const fn tree_mut(&mut self) -> &mut ExecutionTree {
        &mut self.tree
    }

    /// Names of the instantiated algorithms.
    pub fn algorithm_names(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }

    /// Properties of one algorithm.
    #[must_use]
    pub fn algorithm(&self, name: &str) -> Option<&dyn Algorithm> {
        self.algorithms.get(name).map(AsRef::as_ref)
    }

    /// Mutable access to one algorithm.
    pub fn algorithm_mut(&mut self, name: &str) -> Option<&mut (dyn Algorithm + 'static)> {
        self.algorithms.get_mut(name).map(AsMut::as_mut)
    }

    /// Freezes every algorithm's properties.
    pub fn lock(&mut self) {
        for algorithm in self.algorithms.values_mut() {
            algorithm.properties_mut().lock();
        }
    }

    /// Initializes every algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::Algorithm`] for the first failure.
    pub fn initialize(&mut self, ctx: &mut JobContext) -> Result<(), SteeringError> {
        for (name, algorithm) in &mut self.algorithms {
            algorithm.initialize(ctx).map_err(|source| SteeringError::Algorithm {
                name: name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Books one timer per algorithm, then the algorithms' own histograms.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError`] for invalid bins or a failing algorithm.
    pub fn book(&mut self, ctx: &mut JobContext) -> Result<(), SteeringError> {
        for (name, algorithm) in &mut self.algorithms {
            ctx.hbook_mut().book(STEERING_COMPONENT, &timer_name(name), float_range(0.0, 100.0, 2.0), "ms", true)?;
            algorithm.book(ctx).map_err(|source| SteeringError::Algorithm {
                name: name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Runs one block through every node in topological order.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::Algorithm`] for the first failing algorithm.
    pub fn execute(&mut self, datum: Datum, seq: u64, ctx: &mut JobContext) -> Result<(), SteeringError> {
        let mut block = Some(datum);
        for name in self.menu.topological_order() {
            let inputs = if name == ROOT_NODE {
                block.take().into_iter().collect()
            } else {
                self.tree.parent_data(name)
            };
            let (Some(node), Some(element)) = (self.menu.node(name), self.tree.element_mut(name)) else {
                continue;
            };
            element.load(inputs, seq);
            for algo_name in &node.algorithms {
                let Some(algorithm) = self.algorithms.get_mut(algo_name) else {
                    continue;
                };
                let watch = Stopwatch::start();
                algorithm.execute(element, ctx).map_err(|source| SteeringError::Algorithm {
                    name: algo_name.clone(),
                    source,
                })?;
                ctx.hbook_mut().fill(STEERING_COMPONENT, &timer_name(algo_name), watch.elapsed_ms())?;
            }
        }
        Ok(())
    }

    /// Finalizes every algorithm; returns the first failure after trying all.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::Algorithm`] for the first failure.
    pub fn finalize(&mut self, ctx: &mut JobContext) -> Result<(), SteeringError> {
        let mut first = None;
        for (name, algorithm) in &mut self.algorithms {
            if let Err(source) = algorithm.finalize(ctx) {
                error!(algorithm = %name, error = %source, "algorithm finalize failed");
                if first.is_none() {
                    first = Some(SteeringError::Algorithm {
                        name: name.clone(),
                        source,
                    });
                }
            }
        }
        self.tree.flush();
        first.map_or(Ok(()), Err)
    }
}

/// Timer name of an algorithm.
fn timer_name(algorithm: &str) -> String {
    format!("time.{algorithm}")
}
