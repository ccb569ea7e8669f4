// crates/strata-core/src/proto/menu.rs
// ============================================================================
// Module: Strata Menu Messages
// Description: Serialized form of an algorithm DAG.
// Purpose: Persist menus in the object store and hand them to the runtime.
// Dependencies: prost
// ============================================================================

/// Serialized algorithm DAG.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Menu {
    /// Menu id; empty means the store derives one from the content hash.
    #[prost(string, tag = "1")]
    pub uuid: String,
    /// Human-readable menu name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Chains whose nodes together form the DAG.
    #[prost(message, repeated, tag = "3")]
    pub chains: Vec<Chain>,
}

/// Named group of nodes.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Chain {
    /// Chain name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Nodes in declaration order.
    #[prost(message, repeated, tag = "2")]
    pub nodes: Vec<Node>,
}

/// A single DAG node.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Node {
    /// Node name, unique across the menu.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Parent node names; the root is `initial`.
    #[prost(string, repeated, tag = "2")]
    pub parents: Vec<String>,
    /// Algorithm names applied in order.
    #[prost(string, repeated, tag = "3")]
    pub algorithms: Vec<String>,
}
