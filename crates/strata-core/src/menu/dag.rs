// crates/strata-core/src/menu/dag.rs
// ============================================================================
// Module: Strata Menu DAG
// Description: Node graph, validation, and topological ordering.
// Purpose: Provide the execution order and leaf set for steering.
// Dependencies: crate::proto, thiserror
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::proto::Chain;
use crate::proto::Menu;
use crate::proto::Node;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Implicit root node that receives every input block.
pub const ROOT_NODE: &str = "initial";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Menu validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuError {
    /// A node names a parent that does not exist.
    #[error("node {node} references unknown parent {parent}")]
    UnknownParent {
        /// Offending node.
        node: String,
        /// Missing parent.
        parent: String,
    },
    /// Two chains define the same node differently.
    #[error("node {0} is defined more than once with different contents")]
    DuplicateNode(String),
    /// The graph has a cycle through these nodes.
    #[error("menu contains a cycle through {}", .0.join(", "))]
    Cycle(Vec<String>),
    /// Structural problem.
    #[error("invalid menu: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Graph
// ============================================================================

/// One node of the DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuNode {
    /// Node name.
    pub name: String,
    /// Parent names.
    pub parents: Vec<String>,
    /// Algorithms applied in order.
    pub algorithms: Vec<String>,
    /// Child names, sorted.
    pub children: Vec<String>,
}

/// Validated algorithm DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuGraph {
    /// Menu id.
    uuid: String,
    /// Menu name.
    name: String,
    /// Source chains, kept for serialization.
    chains: Vec<Chain>,
    /// Nodes by name, including the root.
    nodes: BTreeMap<String, MenuNode>,
    /// Deterministic topological order, root first.
    order: Vec<String>,
}

impl MenuGraph {
    /// Builds and validates a graph from chains.
    ///
    /// # Errors
    ///
    /// Returns [`MenuError`] for unknown parents, conflicting duplicate
    /// nodes, parentless non-root nodes, or cycles.
    pub fn from_chains(uuid: &str, name: &str, chains: Vec<Chain>) -> Result<Self, MenuError> {
        let mut nodes: BTreeMap<String, MenuNode> = BTreeMap::new();
        nodes.insert(ROOT_NODE.to_string(), MenuNode {
            name: ROOT_NODE.to_string(),
            parents: Vec::new(),
            algorithms: Vec::new(),
            children: Vec::new(),
        });
        for chain in &chains {
            for node in &chain.nodes {
                add_node(&mut nodes, node)?;
            }
        }
        let names: Vec<String> = nodes.keys().cloned().collect();
        for name in &names {
            let parents = nodes.get(name).map(|n| n.parents.clone()).unwrap_or_default();
            for parent in parents {
                let Some(parent_node) = nodes.get_mut(&parent) else {
                    return Err(MenuError::UnknownParent {
                        node: name.clone(),
                        parent,
                    });
                };
                if !parent_node.children.contains(name) {
                    parent_node.children.push(name.clone());
                    parent_node.children.sort();
                }
            }
        }
        let order = topological_order(&nodes)?;
        Ok(Self {
            uuid: uuid.to_string(),
            name: name.to_string(),
            chains,
            nodes,
            order,
        })
    }

    /// Builds a graph from its serialized form.
    ///
    /// # Errors
    ///
    /// See [`MenuGraph::from_chains`].
    pub fn from_message(menu: &Menu) -> Result<Self, MenuError> {
        Self::from_chains(&menu.uuid, &menu.name, menu.chains.clone())
    }

    /// Serializes the graph.
    #[must_use]
    pub fn to_message(&self) -> Menu {
        Menu {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            chains: self.chains.clone(),
        }
    }

    /// Menu name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node names in execution order, root first.
    #[must_use]
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Returns a node by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&MenuNode> {
        self.nodes.get(name)
    }

    /// Nodes without children, in execution order. A bare root is its own leaf.
    #[must_use]
    pub fn leaves(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| self.nodes.get(*name).is_some_and(|n| n.children.is_empty()))
            .cloned()
            .collect()
    }

    /// Distinct algorithm names in first-use order.
    #[must_use]
    pub fn algorithms(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for name in &self.order {
            if let Some(node) = self.nodes.get(name) {
                for algo in &node.algorithms {
                    if seen.insert(algo.clone()) {
                        out.push(algo.clone());
                    }
                }
            }
        }
        out
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Adds a declared node, accepting identical redeclarations.
fn add_node(nodes: &mut BTreeMap<String, MenuNode>, node: &Node) -> Result<(), MenuError> {
    if node.name.is_empty() {
        return Err(MenuError::Invalid("node with empty name".to_string()));
    }
    if node.name == ROOT_NODE {
        let root = nodes
            .get_mut(ROOT_NODE)
            .ok_or_else(|| MenuError::Invalid("missing root".to_string()))?;
        if !node.parents.is_empty() {
            return Err(MenuError::Invalid(format!("{ROOT_NODE} cannot have parents")));
        }
        if !root.algorithms.is_empty() && root.algorithms != node.algorithms {
            return Err(MenuError::DuplicateNode(node.name.clone()));
        }
        root.algorithms.clone_from(&node.algorithms);
        return Ok(());
    }
    if node.parents.is_empty() {
        return Err(MenuError::Invalid(format!("node {} has no parents", node.name)));
    }
    if let Some(parent) = node.parents.iter().enumerate().find_map(|(i, p)| node.parents[.. i].contains(p).then_some(p))
    {
        return Err(MenuError::Invalid(format!("node {} lists parent {parent} more than once", node.name)));
    }
    let candidate = MenuNode {
        name: node.name.clone(),
        parents: node.parents.clone(),
        algorithms: node.algorithms.clone(),
        children: Vec::new(),
    };
    match nodes.get(&node.name) {
        Some(existing) if existing.parents != candidate.parents || existing.algorithms != candidate.algorithms => {
            Err(MenuError::DuplicateNode(node.name.clone()))
        }
        Some(_) => Ok(()),
        None => {
            nodes.insert(node.name.clone(), candidate);
            Ok(())
        }
    }
}

/// Kahn's algorithm with a name-ordered ready set.
fn topological_order(nodes: &BTreeMap<String, MenuNode>) -> Result<Vec<String>, MenuError> {
    let mut indegree: BTreeMap<&str, usize> =
        nodes.iter().map(|(name, node)| (name.as_str(), node.parents.len())).collect();
    let mut ready: BTreeSet<&str> =
        indegree.iter().filter(|(_, deg)| **deg == 0).map(|(name, _)| *name).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(name) = ready.pop_first() {
        order.push(name.to_string());
        if let Some(node) = nodes.get(name) {
            for child in &node.children {
                if let Some(deg) = indegree.get_mut(child.as_str()) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(child.as_str());
                    }
                }
            }
        }
    }
    if order.len() != nodes.len() {
        let stuck = indegree.into_iter().filter(|(_, deg)| *deg > 0).map(|(name, _)| name.to_string()).collect();
        return Err(MenuError::Cycle(stuck));
    }
    Ok(order)
}
