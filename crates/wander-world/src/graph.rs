//! Biome graph: biome nodes with weighted directed edges.
//!
//! The [`BiomeGraph`] is the single owned table of nodes and edge weights
//! for a session. Topology is fixed once generation finishes; afterwards
//! only weights, variants, seal flags, and discovery flags change (plus
//! edge removal through the permanent-effect hook).
//!
//! Nodes are stored in insertion order in a `Vec`, with a
//! `BTreeMap<BiomeKind, usize>` index. Insertion order defines the
//! flattened edge order used by the entropy snapshot.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;
use wander_types::{BiomeKind, EdgeKey, VariantKind};

use crate::error::WorldError;
use crate::node::{Edge, Node};

/// The graph holding every node and edge of a session.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct BiomeGraph {
    /// Nodes in insertion order.
    nodes: Vec<Node>,
    /// Biome -> position in `nodes`.
    index: BTreeMap<BiomeKind, usize>,
    /// The designated sink, once added.
    sink: Option<BiomeKind>,
}

impl BiomeGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: BTreeMap::new(),
            sink: None,
        }
    }

    // -------------------------------------------------------------------
    // Node operations
    // -------------------------------------------------------------------

    /// Add an undiscovered node with no edges.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateNode`] if the biome is already present.
    pub fn add_node(&mut self, biome: BiomeKind) -> Result<(), WorldError> {
        if self.index.contains_key(&biome) {
            return Err(WorldError::DuplicateNode(biome));
        }
        self.index.insert(biome, self.nodes.len());
        self.nodes.push(Node::new(biome));
        Ok(())
    }

    /// Add a node and designate it as the sink.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateNode`] if the biome is already present.
    pub fn add_sink(&mut self, biome: BiomeKind) -> Result<(), WorldError> {
        self.add_node(biome)?;
        self.sink = Some(biome);
        Ok(())
    }

    /// The designated sink, if one was added.
    pub const fn sink(&self) -> Option<BiomeKind> {
        self.sink
    }

    /// Get a node.
    pub fn node(&self, biome: BiomeKind) -> Option<&Node> {
        self.index.get(&biome).and_then(|&i| self.nodes.get(i))
    }

    fn node_mut(&mut self, biome: BiomeKind) -> Result<&mut Node, WorldError> {
        let i = *self
            .index
            .get(&biome)
            .ok_or(WorldError::NodeNotFound(biome))?;
        self.nodes.get_mut(i).ok_or(WorldError::NodeNotFound(biome))
    }

    /// Whether the graph contains this biome.
    pub fn contains(&self, biome: BiomeKind) -> bool {
        self.index.contains_key(&biome)
    }

    /// Number of nodes, sink included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges across all nodes.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.edges().len()).sum()
    }

    /// Iterate over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Every biome in insertion order.
    pub fn biomes(&self) -> Vec<BiomeKind> {
        self.nodes.iter().map(Node::biome).collect()
    }

    /// Set a node's variant.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NodeNotFound`] if the biome is absent.
    pub fn set_variant(&mut self, biome: BiomeKind, variant: VariantKind) -> Result<(), WorldError> {
        self.node_mut(biome)?.set_variant(variant);
        Ok(())
    }

    /// Seal a node against further weight changes.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NodeNotFound`] if the biome is absent.
    pub fn seal(&mut self, biome: BiomeKind) -> Result<(), WorldError> {
        self.node_mut(biome)?.set_sealed();
        Ok(())
    }

    /// Whether a node is sealed. Missing nodes are not sealed.
    pub fn is_sealed(&self, biome: BiomeKind) -> bool {
        self.node(biome).is_some_and(Node::sealed)
    }

    /// Mark a node discovered. Returns `true` on the first visit.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NodeNotFound`] if the biome is absent.
    pub fn mark_discovered(&mut self, biome: BiomeKind) -> Result<bool, WorldError> {
        Ok(self.node_mut(biome)?.set_discovered())
    }

    /// Every discovered biome in insertion order.
    pub fn discovered(&self) -> Vec<BiomeKind> {
        self.nodes
            .iter()
            .filter(|n| n.discovered())
            .map(Node::biome)
            .collect()
    }

    // -------------------------------------------------------------------
    // Edge operations
    // -------------------------------------------------------------------

    /// Append an edge to `from`'s outgoing list.
    ///
    /// The caller is responsible for renormalizing `from` afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NodeNotFound`] for a missing endpoint,
    /// [`WorldError::SelfLoop`], [`WorldError::SinkOutgoing`],
    /// [`WorldError::DuplicateEdge`], or [`WorldError::InvalidWeight`].
    pub fn add_edge(&mut self, from: BiomeKind, to: BiomeKind, weight: f64) -> Result<(), WorldError> {
        let key = EdgeKey::new(from, to);
        if !self.contains(to) {
            return Err(WorldError::NodeNotFound(to));
        }
        if from == to {
            return Err(WorldError::SelfLoop(from));
        }
        if self.sink == Some(from) {
            return Err(WorldError::SinkOutgoing(from));
        }
        validate_weight(key, weight)?;
        let node = self.node_mut(from)?;
        if node.edge_to(to).is_some() {
            return Err(WorldError::DuplicateEdge(key));
        }
        node.edges_mut().push(Edge { to, weight });
        Ok(())
    }

    /// Remove an edge and renormalize its source. Returns the removed weight.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EdgeNotFound`] if the edge does not exist.
    pub fn remove_edge(&mut self, key: EdgeKey) -> Result<f64, WorldError> {
        let node = self.node_mut(key.from)?;
        let position = node
            .edges()
            .iter()
            .position(|e| e.to == key.to)
            .ok_or(WorldError::EdgeNotFound(key))?;
        let removed = node.edges_mut().remove(position);
        node.normalize();
        debug!(edge = %key, weight = removed.weight, "edge removed");
        Ok(removed.weight)
    }

    /// Outgoing edges of a node in stored order; empty for a missing node.
    pub fn outgoing(&self, biome: BiomeKind) -> &[Edge] {
        match self.node(biome) {
            Some(node) => node.edges(),
            None => &[],
        }
    }

    /// Mutable outgoing edges, for transform functions that rewrite a
    /// node's weights in place.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NodeNotFound`] if the biome is absent.
    pub fn outgoing_mut(&mut self, biome: BiomeKind) -> Result<&mut [Edge], WorldError> {
        Ok(self.node_mut(biome)?.edges_mut().as_mut_slice())
    }

    /// Number of edges arriving at a node.
    pub fn incoming_count(&self, biome: BiomeKind) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.edge_to(biome).is_some())
            .count()
    }

    /// Whether a node has neither outgoing nor incoming edges.
    pub fn is_isolated(&self, biome: BiomeKind) -> bool {
        self.outgoing(biome).is_empty() && self.incoming_count(biome) == 0
    }

    /// Current weight of an edge.
    pub fn weight(&self, key: EdgeKey) -> Option<f64> {
        self.node(key.from)
            .and_then(|n| n.edge_to(key.to))
            .map(|e| e.weight)
    }

    /// Overwrite an edge's weight without renormalizing.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EdgeNotFound`] or [`WorldError::InvalidWeight`].
    pub fn set_weight(&mut self, key: EdgeKey, weight: f64) -> Result<(), WorldError> {
        validate_weight(key, weight)?;
        let edge = self
            .node_mut(key.from)
            .map_err(|_missing| WorldError::EdgeNotFound(key))?
            .edges_mut()
            .iter_mut()
            .find(|e| e.to == key.to)
            .ok_or(WorldError::EdgeNotFound(key))?;
        edge.weight = weight;
        Ok(())
    }

    /// Every edge identity, flattened: nodes in insertion order, edges in
    /// stored order.
    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.nodes.iter().flat_map(Node::edge_keys).collect()
    }

    /// Renormalize one node's outgoing weights.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NodeNotFound`] if the biome is absent.
    pub fn normalize(&mut self, biome: BiomeKind) -> Result<(), WorldError> {
        self.node_mut(biome)?.normalize();
        Ok(())
    }

    /// Renormalize every node's outgoing weights.
    pub fn normalize_all(&mut self) {
        for node in &mut self.nodes {
            node.normalize();
        }
    }

    /// Whether every node with outgoing edges sums to one.
    pub fn is_normalized(&self) -> bool {
        self.nodes.iter().all(Node::is_normalized)
    }

    // -------------------------------------------------------------------
    // Graph queries
    // -------------------------------------------------------------------

    /// Hop distance from `start` to every node reachable over outgoing
    /// edges, `start` included at distance 0. Breadth-first.
    pub fn hop_distances(&self, start: BiomeKind) -> BTreeMap<BiomeKind, u32> {
        let mut dist = BTreeMap::new();
        if !self.contains(start) {
            return dist;
        }

        let mut queue = VecDeque::new();
        dist.insert(start, 0_u32);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let next = dist.get(&current).copied().unwrap_or(0).saturating_add(1);
            for edge in self.outgoing(current) {
                if !dist.contains_key(&edge.to) {
                    dist.insert(edge.to, next);
                    queue.push_back(edge.to);
                }
            }
        }

        dist
    }
}

/// Reject weights that are negative or not finite.
fn validate_weight(edge: EdgeKey, weight: f64) -> Result<(), WorldError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(WorldError::InvalidWeight { edge, weight })
    }
}
