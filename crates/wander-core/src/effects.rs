//! Active effects and the registry that owns their bookkeeping.
//!
//! A reversible effect snapshots each edge's weight before the first
//! mutation and writes the snapshot back verbatim when it expires. Weight
//! effects hold whole nodes: a second effect may not touch edges an active
//! effect already touched, so every restoration puts back true originals.
//!
//! Permanent changes (variant, seal, sever) bypass the registry's
//! restoration machinery entirely and are only logged.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wander_types::{BiomeKind, EdgeKey, EffectId, VariantKind};
use wander_world::{BiomeGraph, WorldError};

use crate::entropy::EdgeGuard;

/// Errors raised by effect bookkeeping and transforms.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EffectError {
    /// An effect with this id is already active.
    #[error("effect {0} is already active")]
    Duplicate(EffectId),

    /// No active effect has this id.
    #[error("effect {0} is not active")]
    NotFound(EffectId),

    /// The node's weights are frozen by a permanent seal.
    #[error("{0} is sealed")]
    NodeSealed(BiomeKind),

    /// Another active effect already holds this node's weights.
    #[error("{node} is held by effect {holder}")]
    NodeHeld {
        /// The contested node.
        node: BiomeKind,
        /// The effect that holds it.
        holder: EffectId,
    },

    /// A new effect touched an edge another active effect owns.
    #[error("edge {edge} is already owned by effect {holder}")]
    Overlap {
        /// The contested edge.
        edge: EdgeKey,
        /// The effect that owns it.
        holder: EffectId,
    },

    /// Severing would leave a node with no way out.
    #[error("severing {0} would leave its source without exits")]
    LastExit(EdgeKey),

    /// A graph operation failed.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// How long a reversible effect lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifetime {
    /// Expires after this many agent steps.
    Uses(u32),
    /// Expires when the agent stands anywhere but this node.
    WhileAt(BiomeKind),
}

/// A reversible modifier with its restoration map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    id: EffectId,
    name: String,
    description: String,
    lifetime: Lifetime,
    modified: Vec<(EdgeKey, f64)>,
    locked: Vec<EdgeKey>,
}

impl ActiveEffect {
    /// Start an effect with an empty restoration map.
    pub fn new(
        id: impl Into<EffectId>,
        name: impl Into<String>,
        description: impl Into<String>,
        lifetime: Lifetime,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            lifetime,
            modified: Vec::new(),
            locked: Vec::new(),
        }
    }

    /// Unique id.
    pub const fn id(&self) -> &EffectId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Lifetime as it stands now.
    pub const fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Steps left, for step-counted effects.
    pub const fn remaining_uses(&self) -> Option<u32> {
        match self.lifetime {
            Lifetime::Uses(n) => Some(n),
            Lifetime::WhileAt(_) => None,
        }
    }

    /// The node this effect is bound to, for scope-bound effects.
    pub const fn scope(&self) -> Option<BiomeKind> {
        match self.lifetime {
            Lifetime::Uses(_) => None,
            Lifetime::WhileAt(node) => Some(node),
        }
    }

    /// Record an edge's pre-mutation weight. Only the first snapshot of an
    /// edge is kept.
    pub fn snapshot(&mut self, edge: EdgeKey, weight: f64) {
        if !self.touches(edge) {
            self.modified.push((edge, weight));
        }
    }

    /// Exempt an edge from entropy while this effect lives.
    pub fn lock(&mut self, edge: EdgeKey) {
        if !self.locked.contains(&edge) {
            self.locked.push(edge);
        }
    }

    /// Restoration map in snapshot order.
    pub fn modified_edges(&self) -> &[(EdgeKey, f64)] {
        &self.modified
    }

    /// Edges this effect locked.
    pub fn locked_edges(&self) -> &[EdgeKey] {
        &self.locked
    }

    /// Whether this effect snapshotted the edge.
    pub fn touches(&self, edge: EdgeKey) -> bool {
        self.modified.iter().any(|(k, _)| *k == edge)
    }

    /// Whether this effect snapshotted any outgoing edge of the node.
    pub fn holds(&self, node: BiomeKind) -> bool {
        self.modified.iter().any(|(k, _)| k.from == node)
    }

    /// Count one step off a step-counted lifetime. Returns whether the
    /// effect is now spent.
    fn tick(&mut self) -> bool {
        match &mut self.lifetime {
            Lifetime::Uses(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
            Lifetime::WhileAt(_) => false,
        }
    }

    /// Write every snapshot back verbatim. Edges severed since the snapshot
    /// are skipped.
    fn restore(&self, graph: &mut BiomeGraph) {
        for &(edge, weight) in &self.modified {
            if let Err(e) = graph.set_weight(edge, weight) {
                debug!(effect = %self.id, edge = %edge, error = %e, "restore skipped");
            }
        }
    }
}

/// An irreversible structural or cosmetic change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermanentChange {
    /// Repaint a node.
    SetVariant {
        /// Target node.
        node: BiomeKind,
        /// New variant.
        variant: VariantKind,
    },
    /// Freeze a node's outgoing weights against entropy and transforms.
    Seal {
        /// Target node.
        node: BiomeKind,
    },
    /// Remove an edge and renormalize its source.
    Sever {
        /// Edge to cut.
        edge: EdgeKey,
    },
}

impl PermanentChange {
    /// The node whose appearance or topology changed.
    pub const fn node(self) -> BiomeKind {
        match self {
            Self::SetVariant { node, .. } | Self::Seal { node } => node,
            Self::Sever { edge } => edge.from,
        }
    }
}

/// Registry of active reversible effects plus the permanent-change log.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    active: Vec<ActiveEffect>,
    permanent: Vec<PermanentChange>,
}

impl EffectRegistry {
    /// An empty registry.
    pub const fn new() -> Self {
        Self {
            active: Vec::new(),
            permanent: Vec::new(),
        }
    }

    /// Active effects in insertion order.
    pub fn active(&self) -> &[ActiveEffect] {
        &self.active
    }

    /// Permanent changes applied so far, oldest first.
    pub fn permanent_changes(&self) -> &[PermanentChange] {
        &self.permanent
    }

    /// Whether an effect with this id is active.
    pub fn has_effect(&self, id: &EffectId) -> bool {
        self.active.iter().any(|e| e.id == *id)
    }

    /// Look up an active effect.
    pub fn get(&self, id: &EffectId) -> Option<&ActiveEffect> {
        self.active.iter().find(|e| e.id == *id)
    }

    /// The active effect holding a node's weights, if any.
    pub fn holder_of(&self, node: BiomeKind) -> Option<&ActiveEffect> {
        self.active.iter().find(|e| e.holds(node))
    }

    /// Register an effect whose transform has already run.
    ///
    /// On rejection the newcomer's own snapshots are written back, so the
    /// graph is left as it was before the transform.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::Duplicate`] for a repeated id or
    /// [`EffectError::Overlap`] when an edge is already owned.
    pub fn add_effect(&mut self, effect: ActiveEffect, graph: &mut BiomeGraph) -> Result<(), EffectError> {
        if self.has_effect(&effect.id) {
            effect.restore(graph);
            return Err(EffectError::Duplicate(effect.id));
        }
        let clash = effect.modified.iter().find_map(|&(edge, _)| {
            self.active
                .iter()
                .find(|other| other.touches(edge))
                .map(|other| (edge, other.id.clone()))
        });
        if let Some((edge, holder)) = clash {
            effect.restore(graph);
            return Err(EffectError::Overlap { edge, holder });
        }
        info!(
            effect = %effect.id,
            edges = effect.modified.len(),
            locks = effect.locked.len(),
            lifetime = ?effect.lifetime,
            "effect applied"
        );
        self.active.push(effect);
        Ok(())
    }

    /// Remove an effect and restore every edge it modified.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::NotFound`] if no effect has this id.
    pub fn remove_effect(&mut self, id: &EffectId, graph: &mut BiomeGraph) -> Result<ActiveEffect, EffectError> {
        let position = self
            .active
            .iter()
            .position(|e| e.id == *id)
            .ok_or_else(|| EffectError::NotFound(id.clone()))?;
        let effect = self.active.remove(position);
        effect.restore(graph);
        info!(effect = %effect.id, restored = effect.modified.len(), "effect removed");
        Ok(effect)
    }

    /// Count one agent step off every step-counted effect and remove the
    /// spent ones. Returns the removed effects.
    pub fn advance_one_step(&mut self, graph: &mut BiomeGraph) -> Vec<ActiveEffect> {
        let spent: Vec<EffectId> = self
            .active
            .iter_mut()
            .filter_map(|e| e.tick().then(|| e.id.clone()))
            .collect();
        self.remove_all(&spent, graph)
    }

    /// Remove every scope-bound effect whose node is not `now_at`.
    pub fn depart(&mut self, now_at: BiomeKind, graph: &mut BiomeGraph) -> Vec<ActiveEffect> {
        let left: Vec<EffectId> = self
            .active
            .iter()
            .filter(|e| e.scope().is_some_and(|scope| scope != now_at))
            .map(|e| e.id.clone())
            .collect();
        self.remove_all(&left, graph)
    }

    /// Apply and log an irreversible change.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::NodeHeld`] when severing an edge an active
    /// effect holds, [`EffectError::LastExit`] when severing a node's only
    /// edge, or [`EffectError::World`] when the target does not exist.
    pub fn apply_permanent(&mut self, change: PermanentChange, graph: &mut BiomeGraph) -> Result<(), EffectError> {
        match change {
            PermanentChange::SetVariant { node, variant } => graph.set_variant(node, variant)?,
            PermanentChange::Seal { node } => graph.seal(node)?,
            PermanentChange::Sever { edge } => {
                if let Some(holder) = self.holder_of(edge.from) {
                    return Err(EffectError::NodeHeld {
                        node: edge.from,
                        holder: holder.id.clone(),
                    });
                }
                if graph.weight(edge).is_none() {
                    return Err(WorldError::EdgeNotFound(edge).into());
                }
                if graph.outgoing(edge.from).len() <= 1 {
                    return Err(EffectError::LastExit(edge));
                }
                graph.remove_edge(edge)?;
            }
        }
        info!(change = ?change, "permanent change applied");
        self.permanent.push(change);
        Ok(())
    }

    fn remove_all(&mut self, ids: &[EffectId], graph: &mut BiomeGraph) -> Vec<ActiveEffect> {
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.remove_effect(id, graph) {
                Ok(effect) => removed.push(effect),
                Err(e) => warn!(effect = %id, error = %e, "expiry failed"),
            }
        }
        removed
    }
}

impl EdgeGuard for EffectRegistry {
    fn is_locked(&self, edge: EdgeKey) -> bool {
        self.active.iter().any(|e| e.locked.contains(&edge))
    }

    fn is_modified(&self, edge: EdgeKey) -> bool {
        self.active.iter().any(|e| e.touches(edge))
    }

    fn holds_node(&self, node: BiomeKind) -> bool {
        self.active.iter().any(|e| e.holds(node))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    fn graph() -> BiomeGraph {
        let mut g = BiomeGraph::new();
        for b in [BiomeKind::Forest, BiomeKind::Desert, BiomeKind::Tundra] {
            g.add_node(b).unwrap();
        }
        g.add_edge(BiomeKind::Forest, BiomeKind::Desert, 0.7).unwrap();
        g.add_edge(BiomeKind::Forest, BiomeKind::Tundra, 0.3).unwrap();
        g.add_edge(BiomeKind::Desert, BiomeKind::Forest, 1.0).unwrap();
        g
    }

    fn fd() -> EdgeKey {
        EdgeKey::new(BiomeKind::Forest, BiomeKind::Desert)
    }

    fn ft() -> EdgeKey {
        EdgeKey::new(BiomeKind::Forest, BiomeKind::Tundra)
    }

    /// Snapshot then flip Forest's two edges, the way a transform would.
    fn flipped(g: &mut BiomeGraph, id: &str, lifetime: Lifetime) -> ActiveEffect {
        let mut effect = ActiveEffect::new(id, id, "test", lifetime);
        effect.snapshot(fd(), g.weight(fd()).unwrap());
        effect.snapshot(ft(), g.weight(ft()).unwrap());
        g.set_weight(fd(), 0.3).unwrap();
        g.set_weight(ft(), 0.7).unwrap();
        effect
    }

    #[test]
    fn snapshot_keeps_first_value() {
        let mut effect = ActiveEffect::new("e", "E", "", Lifetime::Uses(1));
        effect.snapshot(fd(), 0.7);
        effect.snapshot(fd(), 0.1);
        assert_eq!(effect.modified_edges(), &[(fd(), 0.7)]);
        assert!(effect.holds(BiomeKind::Forest));
        assert!(!effect.holds(BiomeKind::Desert));
    }

    #[test]
    fn one_shot_restores_after_one_advance() {
        let mut g = graph();
        let mut reg = EffectRegistry::new();
        let effect = flipped(&mut g, "mirror", Lifetime::Uses(1));
        reg.add_effect(effect, &mut g).unwrap();
        assert!(reg.is_modified(fd()));
        assert!(reg.holds_node(BiomeKind::Forest));

        let expired = reg.advance_one_step(&mut g);
        assert_eq!(expired.len(), 1);
        assert!(reg.active().is_empty());
        assert!((g.weight(fd()).unwrap() - 0.7).abs() < TOL);
        assert!((g.weight(ft()).unwrap() - 0.3).abs() < TOL);
    }

    #[test]
    fn multi_use_counts_down() {
        let mut g = graph();
        let mut reg = EffectRegistry::new();
        reg.add_effect(flipped(&mut g, "e", Lifetime::Uses(2)), &mut g).unwrap();
        assert!(reg.advance_one_step(&mut g).is_empty());
        assert_eq!(reg.active().first().unwrap().remaining_uses(), Some(1));
        assert_eq!(reg.advance_one_step(&mut g).len(), 1);
    }

    #[test]
    fn scoped_effect_survives_until_departure() {
        let mut g = graph();
        let mut reg = EffectRegistry::new();
        let mut anchor = ActiveEffect::new("anchor", "Anchor", "", Lifetime::WhileAt(BiomeKind::Forest));
        anchor.lock(fd());
        reg.add_effect(anchor, &mut g).unwrap();
        assert!(reg.advance_one_step(&mut g).is_empty());
        assert!(reg.depart(BiomeKind::Forest, &mut g).is_empty());
        assert!(reg.is_locked(fd()));
        assert_eq!(reg.depart(BiomeKind::Desert, &mut g).len(), 1);
        assert!(!reg.is_locked(fd()));
    }

    #[test]
    fn duplicate_id_is_rejected_and_undone() {
        let mut g = graph();
        let mut reg = EffectRegistry::new();
        let mut lock = ActiveEffect::new("x", "X", "", Lifetime::Uses(1));
        lock.lock(fd());
        reg.add_effect(lock, &mut g).unwrap();
        let second = flipped(&mut g, "x", Lifetime::Uses(1));
        assert_eq!(
            reg.add_effect(second, &mut g),
            Err(EffectError::Duplicate(EffectId::new("x")))
        );
        assert!((g.weight(fd()).unwrap() - 0.7).abs() < TOL);
    }

    #[test]
    fn overlap_is_rejected_and_undone() {
        let mut g = graph();
        let mut reg = EffectRegistry::new();
        reg.add_effect(flipped(&mut g, "a", Lifetime::Uses(3)), &mut g).unwrap();

        let mut b = ActiveEffect::new("b", "B", "", Lifetime::Uses(1));
        b.snapshot(fd(), g.weight(fd()).unwrap());
        g.set_weight(fd(), 0.5).unwrap();
        let err = reg.add_effect(b, &mut g).unwrap_err();
        assert!(matches!(err, EffectError::Overlap { .. }));
        // b's own snapshot (a's flipped value) came back.
        assert!((g.weight(fd()).unwrap() - 0.3).abs() < TOL);

        reg.remove_effect(&EffectId::new("a"), &mut g).unwrap();
        assert!((g.weight(fd()).unwrap() - 0.7).abs() < TOL);
    }

    #[test]
    fn remove_unknown_effect_fails() {
        let mut g = graph();
        let mut reg = EffectRegistry::new();
        assert!(matches!(
            reg.remove_effect(&EffectId::new("nope"), &mut g),
            Err(EffectError::NotFound(_))
        ));
    }

    #[test]
    fn permanent_changes_are_logged_not_restored() {
        let mut g = graph();
        let mut reg = EffectRegistry::new();
        reg.apply_permanent(
            PermanentChange::SetVariant {
                node: BiomeKind::Forest,
                variant: VariantKind::Frozen,
            },
            &mut g,
        )
        .unwrap();
        reg.apply_permanent(PermanentChange::Sever { edge: ft() }, &mut g).unwrap();
        reg.apply_permanent(PermanentChange::Seal { node: BiomeKind::Forest }, &mut g).unwrap();

        assert_eq!(reg.permanent_changes().len(), 3);
        assert!(reg.active().is_empty());
        assert_eq!(g.node(BiomeKind::Forest).unwrap().variant(), VariantKind::Frozen);
        assert!(g.weight(ft()).is_none());
        assert!((g.weight(fd()).unwrap() - 1.0).abs() < 1e-9);
        assert!(g.is_sealed(BiomeKind::Forest));
        assert!(reg.advance_one_step(&mut g).is_empty());
    }

    #[test]
    fn sever_refuses_last_exit_and_held_nodes() {
        let mut g = graph();
        let mut reg = EffectRegistry::new();
        let last = EdgeKey::new(BiomeKind::Desert, BiomeKind::Forest);
        assert_eq!(
            reg.apply_permanent(PermanentChange::Sever { edge: last }, &mut g),
            Err(EffectError::LastExit(last))
        );
        reg.add_effect(flipped(&mut g, "a", Lifetime::Uses(1)), &mut g).unwrap();
        assert!(matches!(
            reg.apply_permanent(PermanentChange::Sever { edge: ft() }, &mut g),
            Err(EffectError::NodeHeld { .. })
        ));
        assert!(reg.permanent_changes().is_empty());
    }
}
