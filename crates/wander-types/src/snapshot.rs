//! Read-only graph snapshot served to the renderer.
//!
//! The renderer never reads engine internals. It receives a
//! [`GraphSnapshot`] on demand and a change notification whenever topology,
//! a weight, a variant, or a `discovered` flag changes, then re-queries.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BiomeKind, Regime, VariantKind};

/// A node as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NodeView {
    /// Node identity.
    pub biome: BiomeKind,
    /// Current variant.
    pub variant: VariantKind,
    /// Whether the agent has visited this node.
    pub discovered: bool,
    /// Whether a permanent effect sealed this node against weight changes.
    pub sealed: bool,
    /// Whether this is the sink.
    pub is_sink: bool,
}

/// An edge as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EdgeView {
    /// Source node.
    pub from: BiomeKind,
    /// Target node.
    pub to: BiomeKind,
    /// Transition probability.
    pub weight: f64,
    /// Whether an active effect currently exempts this edge from entropy.
    pub locked: bool,
}

/// Full renderer snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GraphSnapshot {
    /// All nodes in graph order.
    pub nodes: Vec<NodeView>,
    /// All edges, grouped by source in graph order.
    pub edges: Vec<EdgeView>,
    /// Where the agent currently stands.
    pub current: BiomeKind,
    /// Current entropy value.
    pub entropy: f64,
    /// Entropy ceiling.
    pub entropy_max: f64,
    /// Current regime, if entropy has been updated at least once.
    pub regime: Option<Regime>,
}

/// What changed, pushed to graph observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum GraphChange {
    /// One or more edge weights were rewritten.
    Weights {
        /// Source nodes whose outgoing weights changed.
        nodes: Vec<BiomeKind>,
    },
    /// A node was visited for the first time.
    Discovered {
        /// The newly discovered node.
        biome: BiomeKind,
    },
    /// A node's variant or seal flag changed, or an edge was removed.
    Topology {
        /// The affected node.
        biome: BiomeKind,
    },
    /// The agent moved.
    Moved {
        /// Origin node.
        from: BiomeKind,
        /// Destination node.
        to: BiomeKind,
    },
}
