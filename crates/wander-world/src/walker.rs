//! Single-step weighted random walk.
//!
//! The walker draws `r` uniformly from `[0, 1)` and walks the current
//! node's outgoing edges in stored order, accumulating weight. The first
//! edge whose running total reaches `r` is taken. If drift leaves the
//! total just short of `r`, the last edge is taken.

use rand::Rng;
use tracing::debug;
use wander_types::BiomeKind;

use crate::error::WorldError;
use crate::graph::BiomeGraph;
use crate::node::Edge;

/// The agent's position in the graph.
///
/// Discovery is not the walker's concern: whoever calls [`Walker::step`]
/// marks the destination discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Walker {
    current: BiomeKind,
}

impl Walker {
    /// Place a walker on a node.
    pub const fn new(start: BiomeKind) -> Self {
        Self { current: start }
    }

    /// Where the walker stands.
    pub const fn current(&self) -> BiomeKind {
        self.current
    }

    /// Take one weighted step and return the new node.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoOutgoingEdges`] if the current node is a
    /// dead end (the sink, or a node missing from the graph).
    pub fn step<R: Rng + ?Sized>(&mut self, graph: &BiomeGraph, rng: &mut R) -> Result<BiomeKind, WorldError> {
        let edges = graph.outgoing(self.current);
        let roll: f64 = rng.random();
        let edge = pick_edge(edges, roll).ok_or(WorldError::NoOutgoingEdges(self.current))?;
        debug!(from = %self.current, to = %edge.to, weight = edge.weight, roll, "walker step");
        self.current = edge.to;
        Ok(self.current)
    }
}

/// Select an edge for a uniform draw `roll` in `[0, 1)`.
///
/// Returns `None` only for an empty edge list.
pub fn pick_edge(edges: &[Edge], roll: f64) -> Option<&Edge> {
    let mut cumulative = 0.0;
    for edge in edges {
        cumulative += edge.weight;
        if cumulative >= roll {
            return Some(edge);
        }
    }
    edges.last()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    use BiomeKind::{Desert, Forest, Tundra};

    fn edges(weights: &[(BiomeKind, f64)]) -> Vec<Edge> {
        weights
            .iter()
            .map(|&(to, weight)| Edge { to, weight })
            .collect()
    }

    #[test]
    fn pick_edge_cumulative() {
        let list = edges(&[(Desert, 0.3), (Tundra, 0.7)]);
        assert_eq!(pick_edge(&list, 0.0).map(|e| e.to), Some(Desert));
        assert_eq!(pick_edge(&list, 0.3).map(|e| e.to), Some(Desert));
        assert_eq!(pick_edge(&list, 0.31).map(|e| e.to), Some(Tundra));
        assert_eq!(pick_edge(&list, 0.99).map(|e| e.to), Some(Tundra));
    }

    #[test]
    fn pick_edge_falls_back_to_last_on_drift() {
        let list = edges(&[(Desert, 0.4), (Tundra, 0.5)]);
        assert_eq!(pick_edge(&list, 0.95).map(|e| e.to), Some(Tundra));
    }

    #[test]
    fn pick_edge_empty_is_none() {
        assert!(pick_edge(&[], 0.5).is_none());
    }

    #[test]
    fn weighted_draw_matches_weights() {
        let mut graph = BiomeGraph::new();
        for biome in [Forest, Desert, Tundra] {
            graph.add_node(biome).unwrap();
        }
        graph.add_edge(Forest, Desert, 0.9).unwrap();
        graph.add_edge(Forest, Tundra, 0.1).unwrap();

        let mut rng = SmallRng::seed_from_u64(42);
        let trials: u32 = 10_000;
        let mut hits: u32 = 0;
        for _ in 0..trials {
            let mut walker = Walker::new(Forest);
            if walker.step(&graph, &mut rng).unwrap() == Desert {
                hits = hits.saturating_add(1);
            }
        }
        let share = f64::from(hits) / f64::from(trials);
        assert!((share - 0.9).abs() <= 0.02, "landed on first target {share} of the time");
    }

    #[test]
    fn chain_walk_then_stuck() {
        let mut graph = BiomeGraph::new();
        for biome in [Forest, Desert, Tundra] {
            graph.add_node(biome).unwrap();
        }
        graph.add_edge(Forest, Desert, 1.0).unwrap();
        graph.add_edge(Desert, Tundra, 1.0).unwrap();

        let mut rng = SmallRng::seed_from_u64(0);
        let mut walker = Walker::new(Forest);
        assert_eq!(walker.step(&graph, &mut rng), Ok(Desert));
        assert_eq!(walker.step(&graph, &mut rng), Ok(Tundra));
        assert_eq!(walker.current(), Tundra);
        assert_eq!(walker.step(&graph, &mut rng), Err(WorldError::NoOutgoingEdges(Tundra)));
        assert_eq!(walker.current(), Tundra);
    }
}
