// crates/strata-core/src/menu/mod.rs
// ============================================================================
// Module: Strata Menus
// Description: Algorithm DAG definition and deterministic ordering.
// Purpose: Turn a serialized menu into a validated, topologically ordered graph.
// Dependencies: crate::proto
// ============================================================================

//! ## Overview
//! A menu is a set of chains; each chain lists nodes with their parents and
//! the algorithms applied at that node. Nodes from all chains form one DAG
//! rooted at [`ROOT_NODE`]. Ordering uses Kahn's algorithm with a name-ordered
//! ready set, so the order is identical across runs and processes.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod dag;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dag::MenuError;
pub use dag::MenuGraph;
pub use dag::MenuNode;
pub use dag::ROOT_NODE;
