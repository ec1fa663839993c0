//! Weight transforms that artifacts build on.
//!
//! Every transform works on one node's outgoing edges, refuses sealed nodes
//! and nodes another active effect holds, and snapshots each edge into the
//! effect before writing to it.

use wander_types::{BiomeKind, EdgeKey, VariantKind};
use wander_world::{BiomeGraph, normalize_edges, uniform_share};

use crate::effects::{ActiveEffect, EffectError, EffectRegistry};

/// What a bias transform favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiasTarget {
    /// Edges leading into this biome.
    Biome(BiomeKind),
    /// Edges leading into nodes currently painted this variant.
    Variant(VariantKind),
}

impl BiasTarget {
    fn matches(self, graph: &BiomeGraph, to: BiomeKind) -> bool {
        match self {
            Self::Biome(biome) => to == biome,
            Self::Variant(variant) => graph.node(to).is_some_and(|n| n.variant() == variant),
        }
    }
}

fn check_writable(graph: &BiomeGraph, registry: &EffectRegistry, node: BiomeKind) -> Result<(), EffectError> {
    if graph.is_sealed(node) {
        return Err(EffectError::NodeSealed(node));
    }
    if let Some(holder) = registry.holder_of(node) {
        return Err(EffectError::NodeHeld {
            node,
            holder: holder.id().clone(),
        });
    }
    Ok(())
}

fn snapshot_all(graph: &BiomeGraph, node: BiomeKind, effect: &mut ActiveEffect) {
    for edge in graph.outgoing(node) {
        effect.snapshot(EdgeKey::new(node, edge.to), edge.weight);
    }
}

/// Multiply the weight of every matching edge and renormalize the node.
///
/// Returns how many edges matched; zero means nothing was written.
///
/// # Errors
///
/// Returns [`EffectError::NodeSealed`], [`EffectError::NodeHeld`], or a
/// graph error for a missing node.
pub fn bias_toward(
    graph: &mut BiomeGraph,
    registry: &EffectRegistry,
    node: BiomeKind,
    target: BiasTarget,
    multiplier: f64,
    effect: &mut ActiveEffect,
) -> Result<usize, EffectError> {
    check_writable(graph, registry, node)?;
    let view: &BiomeGraph = graph;
    let hits: Vec<bool> = view
        .outgoing(node)
        .iter()
        .map(|e| target.matches(view, e.to))
        .collect();
    let matched = hits.iter().filter(|&&hit| hit).count();
    if matched == 0 {
        return Ok(0);
    }

    snapshot_all(graph, node, effect);
    let edges = graph.outgoing_mut(node)?;
    for (edge, hit) in edges.iter_mut().zip(hits) {
        if hit {
            edge.weight *= multiplier;
        }
    }
    normalize_edges(edges);
    Ok(matched)
}

/// Exchange the weights of the two heaviest edges. Ties keep stored order.
///
/// Returns `false` without writing when the node has fewer than two edges.
///
/// # Errors
///
/// Returns [`EffectError::NodeSealed`], [`EffectError::NodeHeld`], or a
/// graph error for a missing node.
pub fn swap_top_two(
    graph: &mut BiomeGraph,
    registry: &EffectRegistry,
    node: BiomeKind,
    effect: &mut ActiveEffect,
) -> Result<bool, EffectError> {
    check_writable(graph, registry, node)?;
    let mut ranked: Vec<(usize, f64)> = graph
        .outgoing(node)
        .iter()
        .map(|e| e.weight)
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let (Some(&(first, _)), Some(&(second, _))) = (ranked.first(), ranked.get(1)) else {
        return Ok(false);
    };

    let edges = graph.outgoing_mut(node)?;
    let (Some(a), Some(b)) = (edges.get(first).cloned(), edges.get(second).cloned()) else {
        return Ok(false);
    };
    effect.snapshot(EdgeKey::new(node, a.to), a.weight);
    effect.snapshot(EdgeKey::new(node, b.to), b.weight);
    if let Some(edge) = edges.get_mut(first) {
        edge.weight = b.weight;
    }
    if let Some(edge) = edges.get_mut(second) {
        edge.weight = a.weight;
    }
    Ok(true)
}

/// Give every outgoing edge the same weight.
///
/// Returns `false` without writing when the node has no edges.
///
/// # Errors
///
/// Returns [`EffectError::NodeSealed`], [`EffectError::NodeHeld`], or a
/// graph error for a missing node.
pub fn equalize(
    graph: &mut BiomeGraph,
    registry: &EffectRegistry,
    node: BiomeKind,
    effect: &mut ActiveEffect,
) -> Result<bool, EffectError> {
    check_writable(graph, registry, node)?;
    if graph.outgoing(node).is_empty() {
        return Ok(false);
    }
    snapshot_all(graph, node, effect);
    let edges = graph.outgoing_mut(node)?;
    let share = uniform_share(edges.len());
    for edge in edges.iter_mut() {
        edge.weight = share;
    }
    Ok(true)
}

/// Lock every outgoing edge of a node against entropy. Weights are not
/// written, so sealed or held nodes are fine.
///
/// Returns how many edges were locked.
pub fn lock_outgoing(graph: &BiomeGraph, node: BiomeKind, effect: &mut ActiveEffect) -> usize {
    let edges = graph.outgoing(node);
    for edge in edges {
        effect.lock(EdgeKey::new(node, edge.to));
    }
    edges.len()
}
