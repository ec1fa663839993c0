//! Biome nodes and their outgoing edges.
//!
//! A [`Node`] owns its outgoing [`Edge`]s in insertion order. The order is
//! significant: the walker accumulates weights in stored order, so two
//! graphs with the same weights in a different order walk differently for
//! the same random draw.

use wander_types::{BiomeKind, EdgeKey, VariantKind};

/// Tolerance used when checking that outgoing weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// A directed transition owned by its source node.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    /// Target node.
    pub to: BiomeKind,
    /// Transition probability in `[0, 1]`.
    pub weight: f64,
}

/// A state in the biome graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    biome: BiomeKind,
    variant: VariantKind,
    edges: Vec<Edge>,
    discovered: bool,
    /// Set by a permanent effect; effects and entropy leave a sealed node's
    /// weights alone.
    sealed: bool,
}

impl Node {
    /// Create an undiscovered node with the default variant and no edges.
    pub const fn new(biome: BiomeKind) -> Self {
        Self {
            biome,
            variant: VariantKind::Normal,
            edges: Vec::new(),
            discovered: false,
            sealed: false,
        }
    }

    /// The node's identity.
    pub const fn biome(&self) -> BiomeKind {
        self.biome
    }

    /// The node's current variant.
    pub const fn variant(&self) -> VariantKind {
        self.variant
    }

    /// Outgoing edges in stored order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Whether the agent has been here.
    pub const fn discovered(&self) -> bool {
        self.discovered
    }

    /// Whether a permanent effect has sealed this node.
    pub const fn sealed(&self) -> bool {
        self.sealed
    }

    /// Whether the node has at least one way out.
    pub fn has_outgoing(&self) -> bool {
        !self.edges.is_empty()
    }

    /// The edge to `to`, if one exists.
    pub fn edge_to(&self, to: BiomeKind) -> Option<&Edge> {
        self.edges.iter().find(|e| e.to == to)
    }

    /// Identity of every outgoing edge, in stored order.
    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges.iter().map(|e| EdgeKey::new(self.biome, e.to))
    }

    /// Sum of outgoing weights.
    pub fn weight_sum(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// Whether outgoing weights sum to one within [`WEIGHT_TOLERANCE`].
    /// A node with no outgoing edges is trivially normalized.
    pub fn is_normalized(&self) -> bool {
        self.edges.is_empty() || (self.weight_sum() - 1.0).abs() <= WEIGHT_TOLERANCE
    }

    /// Scale outgoing weights so they sum to one.
    ///
    /// If every weight is zero the mass is spread evenly instead.
    pub fn normalize(&mut self) {
        normalize_edges(&mut self.edges);
    }

    pub(crate) fn edges_mut(&mut self) -> &mut Vec<Edge> {
        &mut self.edges
    }

    pub(crate) const fn set_variant(&mut self, variant: VariantKind) {
        self.variant = variant;
    }

    pub(crate) const fn set_discovered(&mut self) -> bool {
        let newly = !self.discovered;
        self.discovered = true;
        newly
    }

    pub(crate) const fn set_sealed(&mut self) {
        self.sealed = true;
    }
}

/// Scale a set of edges so their weights sum to one.
///
/// Zero total mass is spread evenly. An empty slice is left alone.
pub fn normalize_edges(edges: &mut [Edge]) {
    if edges.is_empty() {
        return;
    }
    let total: f64 = edges.iter().map(|e| e.weight).sum();
    if total > 0.0 {
        for edge in edges.iter_mut() {
            edge.weight /= total;
        }
    } else {
        let even = uniform_share(edges.len());
        for edge in edges.iter_mut() {
            edge.weight = even;
        }
    }
}

/// `1 / n` for a collection length, without lossy casts.
pub fn uniform_share(n: usize) -> f64 {
    let n = u32::try_from(n).unwrap_or(u32::MAX);
    if n == 0 { 0.0 } else { 1.0 / f64::from(n) }
}
