// crates/strata-core/src/runtime/mod.rs
// ============================================================================
// Module: Strata Job Runtime
// Description: Job context, execution tree, steering, and controller.
// Purpose: Run one job through its phases over a menu of algorithms.
// Dependencies: crate::{interfaces, io, menu, metrics, registry, store}
// ============================================================================

//! ## Overview
//! A job is driven by a [`Controller`], which owns the [`JobContext`], the
//! [`Steering`] over an [`ExecutionTree`], and the output collector. Runtime
//! state is single-threaded; every component receives the context explicitly.

pub mod context;
pub mod controller;
pub mod steering;
pub mod tree;

pub use context::JobContext;
pub use controller::CONTROLLER_COMPONENT;
pub use controller::Controller;
pub use controller::ControllerError;
pub use controller::INPUT_PARTITION;
pub use steering::Steering;
pub use steering::SteeringError;
pub use tree::Datum;
pub use tree::Element;
pub use tree::ExecutionTree;
