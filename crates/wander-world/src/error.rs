//! Error types for the `wander-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use wander_types::{BiomeKind, EdgeKey};

/// Errors that can occur during biome-graph operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    /// A node was not found in the graph.
    #[error("node not found: {0}")]
    NodeNotFound(BiomeKind),

    /// A node with this biome already exists.
    #[error("duplicate node: {0}")]
    DuplicateNode(BiomeKind),

    /// An edge between these nodes already exists.
    #[error("duplicate edge: {0}")]
    DuplicateEdge(EdgeKey),

    /// Edges from a node to itself are not allowed.
    #[error("self-loop on {0}")]
    SelfLoop(BiomeKind),

    /// The sink cannot have outgoing edges.
    #[error("sink {0} cannot have outgoing edges")]
    SinkOutgoing(BiomeKind),

    /// No edge with this identity exists.
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeKey),

    /// A weight was negative, NaN, or infinite.
    #[error("invalid weight {weight} for edge {edge}")]
    InvalidWeight {
        /// The edge being written.
        edge: EdgeKey,
        /// The rejected weight.
        weight: f64,
    },

    /// The walker stands on a node with no way out.
    #[error("no outgoing edges from {0}")]
    NoOutgoingEdges(BiomeKind),

    /// Generator parameters are out of range.
    #[error("invalid generator config: {0}")]
    InvalidConfig(String),
}
