//! Global entropy scalar and the weight-perturbation state machine.
//!
//! Entropy lives in `[0, max]` and maps to a [`Regime`] through two
//! ascending thresholds. A perturbation pass rewrites edge weights from
//! the base weights captured at construction, never from the current
//! weights, so repeated passes cannot compound.
//!
//! A pass fires on the first update (for whichever regime it lands in) and
//! afterwards only when an update crosses a threshold or the ceiling on the
//! way up. Falling back below a threshold never fires.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, info};
use wander_types::{BiomeKind, EdgeKey, Regime};
use wander_world::BiomeGraph;

use crate::config::{EntropyConfig, Normalization, StablePolicy};

/// Which edges a perturbation pass must leave alone.
pub trait EdgeGuard {
    /// Whether an active effect has locked this edge's weight.
    fn is_locked(&self, edge: EdgeKey) -> bool;

    /// Whether an active effect has snapshotted this edge.
    fn is_modified(&self, edge: EdgeKey) -> bool;

    /// Whether an active effect holds any outgoing edge of this node.
    fn holds_node(&self, node: BiomeKind) -> bool;
}

/// A guard that protects nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unguarded;

impl EdgeGuard for Unguarded {
    fn is_locked(&self, _edge: EdgeKey) -> bool {
        false
    }

    fn is_modified(&self, _edge: EdgeKey) -> bool {
        false
    }

    fn holds_node(&self, _node: BiomeKind) -> bool {
        false
    }
}

/// What a call to [`EntropyEngine::update`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyUpdate {
    /// Entropy before the update.
    pub previous: f64,
    /// Entropy after clamping.
    pub current: f64,
    /// Regime of the new value.
    pub regime: Regime,
    /// Regime of the pass that fired, if one did.
    pub perturbed: Option<Regime>,
    /// Source nodes whose outgoing weights the pass rewrote.
    pub touched: Vec<BiomeKind>,
}

/// Owns the entropy value, the current regime, and the base weights.
#[derive(Debug, Clone)]
pub struct EntropyEngine {
    config: EntropyConfig,
    current: f64,
    regime: Option<Regime>,
    base_weights: Vec<(EdgeKey, f64)>,
    perturbations: u64,
}

impl EntropyEngine {
    /// Capture the graph's current weights as the immutable base.
    pub fn new(config: &EntropyConfig, graph: &BiomeGraph) -> Self {
        let base_weights = graph
            .edge_keys()
            .into_iter()
            .filter_map(|key| graph.weight(key).map(|w| (key, w)))
            .collect();
        Self {
            config: config.clone(),
            current: config.initial.clamp(0.0, config.max),
            regime: None,
            base_weights,
            perturbations: 0,
        }
    }

    /// Current entropy.
    pub const fn current(&self) -> f64 {
        self.current
    }

    /// Entropy ceiling.
    pub const fn max(&self) -> f64 {
        self.config.max
    }

    /// Regime recorded by the last update; `None` before the first.
    pub const fn regime(&self) -> Option<Regime> {
        self.regime
    }

    /// Regime of the current entropy value, settled or not.
    pub const fn current_regime(&self) -> Regime {
        self.regime_for(self.current)
    }

    /// Weights captured at construction, in graph order.
    pub fn base_weights(&self) -> &[(EdgeKey, f64)] {
        &self.base_weights
    }

    /// Number of perturbation passes fired so far.
    pub const fn perturbation_count(&self) -> u64 {
        self.perturbations
    }

    /// Regime a given entropy value belongs to.
    pub const fn regime_for(&self, value: f64) -> Regime {
        let [low, high] = self.config.thresholds;
        if value < low {
            Regime::Stable
        } else if value < high {
            Regime::Shifting
        } else {
            Regime::Chaotic
        }
    }

    /// Add `delta` (clamped into `[0, max]`) and fire at most one
    /// perturbation pass.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        delta: f64,
        graph: &mut BiomeGraph,
        guard: &dyn EdgeGuard,
        rng: &mut R,
    ) -> EntropyUpdate {
        let previous = self.current;
        let delta = if delta.is_finite() { delta } else { 0.0 };
        let current = (previous + delta).clamp(0.0, self.config.max);
        self.current = current;

        let regime = self.regime_for(current);
        let fire = self.regime.is_none() || self.crossed_upward(previous, current);
        self.regime = Some(regime);

        let mut touched = Vec::new();
        let perturbed = if fire {
            touched = self.perturb(regime, graph, guard, rng);
            self.perturbations = self.perturbations.saturating_add(1);
            info!(
                previous,
                current,
                regime = ?regime,
                nodes = touched.len(),
                "entropy perturbation pass"
            );
            Some(regime)
        } else {
            None
        };

        EntropyUpdate {
            previous,
            current,
            regime,
            perturbed,
            touched,
        }
    }

    /// Lower entropy by `amount` without firing a pass.
    ///
    /// Returns the new value. The recorded regime follows the value down so
    /// that climbing back up counts as a fresh crossing.
    pub fn drain(&mut self, amount: f64) -> f64 {
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        self.current = (self.current - amount).clamp(0.0, self.config.max);
        if self.regime.is_some() {
            self.regime = Some(self.regime_for(self.current));
        }
        debug!(current = self.current, amount, "entropy drained");
        self.current
    }

    fn crossed_upward(&self, previous: f64, current: f64) -> bool {
        let [low, high] = self.config.thresholds;
        [low, high, self.config.max]
            .iter()
            .any(|&t| previous < t && current >= t)
    }

    fn perturb<R: Rng + ?Sized>(
        &self,
        regime: Regime,
        graph: &mut BiomeGraph,
        guard: &dyn EdgeGuard,
        rng: &mut R,
    ) -> Vec<BiomeKind> {
        let skip = |graph: &BiomeGraph, key: EdgeKey| {
            guard.is_locked(key) || guard.holds_node(key.from) || graph.is_sealed(key.from)
        };

        let amplitude = match regime {
            Regime::Stable => {
                return match self.config.stable_policy {
                    StablePolicy::Keep => Vec::new(),
                    StablePolicy::Zero => self.zero_all(graph, &skip),
                };
            }
            Regime::Shifting => self.config.shifting_amplitude,
            Regime::Chaotic => self.config.chaotic_amplitude,
        };

        let mut written: Vec<(EdgeKey, f64)> = Vec::new();
        for &(key, base) in &self.base_weights {
            if skip(&*graph, key) || graph.weight(key).is_none() {
                continue;
            }
            let jitter = if rng.random_bool(0.5) { amplitude } else { -amplitude };
            written.push((key, (base * (1.0 + jitter)).max(0.0)));
        }

        match self.config.normalization {
            Normalization::PerNode => scale_per_node(graph, &mut written),
            Normalization::Global => scale_global(&mut written),
        }

        let mut touched: Vec<BiomeKind> = Vec::new();
        for (key, weight) in written {
            if let Err(e) = graph.set_weight(key, weight) {
                debug!(edge = %key, error = %e, "perturbed weight rejected");
                continue;
            }
            if !touched.contains(&key.from) {
                touched.push(key.from);
            }
        }
        touched
    }

    fn zero_all(
        &self,
        graph: &mut BiomeGraph,
        skip: &dyn Fn(&BiomeGraph, EdgeKey) -> bool,
    ) -> Vec<BiomeKind> {
        let mut touched: Vec<BiomeKind> = Vec::new();
        for &(key, _) in &self.base_weights {
            if skip(&*graph, key) || graph.set_weight(key, 0.0).is_err() {
                continue;
            }
            if !touched.contains(&key.from) {
                touched.push(key.from);
            }
        }
        touched
    }
}

/// Scale each node's perturbed edges into the mass its skipped edges left
/// free.
fn scale_per_node(graph: &BiomeGraph, written: &mut [(EdgeKey, f64)]) {
    let mut groups: BTreeMap<BiomeKind, (f64, usize)> = BTreeMap::new();
    for &(key, weight) in written.iter() {
        let entry = groups.entry(key.from).or_insert((0.0, 0));
        entry.0 += weight;
        entry.1 = entry.1.saturating_add(1);
    }

    let mut budgets: BTreeMap<BiomeKind, f64> = BTreeMap::new();
    for &node in groups.keys() {
        let fixed: f64 = graph
            .outgoing(node)
            .iter()
            .filter(|e| !written.iter().any(|(k, _)| k.from == node && k.to == e.to))
            .map(|e| e.weight)
            .sum();
        budgets.insert(node, (1.0 - fixed).max(0.0));
    }

    for (key, weight) in written.iter_mut() {
        let (Some(&(sum, count)), Some(&budget)) = (groups.get(&key.from), budgets.get(&key.from))
        else {
            continue;
        };
        *weight = if sum > 0.0 {
            *weight * budget / sum
        } else {
            budget * wander_world::uniform_share(count)
        };
    }
}

/// Scale every perturbed edge so the whole pool sums to one.
fn scale_global(written: &mut [(EdgeKey, f64)]) {
    let total: f64 = written.iter().map(|(_, w)| w).sum();
    if total > 0.0 {
        for (_, weight) in written.iter_mut() {
            *weight /= total;
        }
    }
}
