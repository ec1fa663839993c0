//! One game: graph, walker, entropy, effects, and inventory under a single
//! owner.
//!
//! # Step ordering
//!
//! Each [`GameSession::step`]:
//!
//! 1. fails with [`SessionError::NoOutgoingEdges`] at a dead end, before
//!    touching anything;
//! 2. adds the step increment to entropy, which may fire a perturbation
//!    pass;
//! 3. draws the next node from the post-perturbation weights;
//! 4. counts one step off every step-counted effect, restoring the spent
//!    ones;
//! 5. expires scope-bound effects for nodes the agent is no longer on;
//! 6. marks the destination discovered;
//! 7. notifies observers.
//!
//! The perturbation pass skips every node an effect holds, so the
//! restoration in step 4 never overwrites freshly perturbed weights.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wander_types::{
    BiomeKind, DecisionRequest, EdgeKey, EdgeView, EffectId, GraphChange, GraphSnapshot, NodeView,
    TransitionView,
};
use wander_world::{BiomeGraph, GenerationAnomaly, Node, Walker, WorldError, generate};

use crate::artifact::{Artifact, ArtifactOutcome, EffectContext};
use crate::config::GameConfig;
use crate::effects::{ActiveEffect, EffectError, EffectRegistry, PermanentChange};
use crate::entropy::{EdgeGuard, EntropyEngine, EntropyUpdate};
use crate::inventory::Inventory;

/// Errors surfaced by session operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The agent stands on a node with no way out.
    #[error("no outgoing edges from {0}")]
    NoOutgoingEdges(BiomeKind),

    /// The inventory has no item at this index.
    #[error("no item at inventory index {0}")]
    NoSuchItem(usize),

    /// Generation produced nothing to stand on.
    #[error("graph has no node to start on")]
    EmptyGraph,

    /// A graph operation failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// An effect operation failed.
    #[error(transparent)]
    Effect(#[from] EffectError),
}

/// Where the game stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// The agent can still move.
    Wandering,
    /// The agent reached the sink.
    ReachedGateway,
    /// The agent is on a dead end that is not the sink.
    Stuck,
}

impl SessionStatus {
    /// Whether no further step can succeed.
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Wandering)
    }
}

/// Receives a notification after every graph change.
///
/// Observers re-query [`GameSession::snapshot`] rather than reading the
/// change as a full delta.
pub trait GraphObserver: Send {
    /// Called once per change, in the order changes happen.
    fn on_change(&mut self, change: &GraphChange);
}

/// What one step did.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// 1-based step number.
    pub step: u64,
    /// Node the agent left.
    pub from: BiomeKind,
    /// Node the agent arrived at.
    pub to: BiomeKind,
    /// The entropy update made before the draw.
    pub entropy: EntropyUpdate,
    /// Step-counted effects that ran out.
    pub expired: Vec<EffectId>,
    /// Scope-bound effects dropped because the agent left their node.
    pub departed: Vec<EffectId>,
    /// Whether `to` was visited for the first time.
    pub newly_discovered: bool,
    /// Status after the step.
    pub status: SessionStatus,
}

/// What using an item did.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// A reversible effect is now active. The item was consumed.
    Applied {
        /// The item used.
        artifact: Artifact,
        /// The effect it registered.
        effect: EffectId,
    },
    /// A permanent change was made. The item was consumed.
    Changed {
        /// The item used.
        artifact: Artifact,
        /// The change applied.
        change: PermanentChange,
    },
    /// Entropy was drained. The item was consumed.
    Drained {
        /// The item used.
        artifact: Artifact,
        /// Entropy afterwards.
        entropy: f64,
    },
    /// The artifact's effect is already active. The item was kept.
    AlreadyActive(Artifact),
    /// There was nothing for the artifact to act on. The item was kept.
    NoEffect(Artifact),
    /// The node refused the change. The item was kept.
    Blocked {
        /// The item tried.
        artifact: Artifact,
        /// Why it was refused.
        reason: EffectError,
    },
}

/// A running game.
pub struct GameSession {
    graph: BiomeGraph,
    walker: Walker,
    entropy: EntropyEngine,
    effects: EffectRegistry,
    inventory: Inventory,
    rng: StdRng,
    step_increment: f64,
    steps: u64,
    status: SessionStatus,
    anomaly: Option<GenerationAnomaly>,
    observers: Vec<Box<dyn GraphObserver>>,
}

impl GameSession {
    /// Generate a graph and start a session on it.
    ///
    /// Seeds from `world.seed`, or from OS entropy when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyGraph`] if generation produced no
    /// node to start on.
    pub fn new(config: &GameConfig) -> Result<Self, SessionError> {
        let mut rng = config
            .world
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let generated = generate(&config.generation, &mut rng);
        if let Some(anomaly) = generated.anomaly {
            warn!(anomaly = ?anomaly, "graph generated with an anomaly");
        }
        let start = pick_start(&generated.graph, &mut rng).ok_or(SessionError::EmptyGraph)?;
        let mut session = Self::with_graph(generated.graph, start, config, rng)?;
        session.anomaly = generated.anomaly;
        Ok(session)
    }

    /// Start a session on an existing graph.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::World`] if `start` is not in the graph.
    pub fn with_graph(
        mut graph: BiomeGraph,
        start: BiomeKind,
        config: &GameConfig,
        rng: StdRng,
    ) -> Result<Self, SessionError> {
        graph.mark_discovered(start)?;
        let entropy = EntropyEngine::new(&config.entropy, &graph);
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            start = %start,
            items = config.inventory.starting_items.len(),
            "session started"
        );
        Ok(Self {
            graph,
            walker: Walker::new(start),
            entropy,
            effects: EffectRegistry::new(),
            inventory: Inventory::new(config.inventory.starting_items.clone()),
            rng,
            step_increment: config.entropy.step_increment,
            steps: 0,
            status: SessionStatus::Wandering,
            anomaly: None,
            observers: Vec::new(),
        })
    }

    // -------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------

    /// The graph.
    pub const fn graph(&self) -> &BiomeGraph {
        &self.graph
    }

    /// Where the agent stands.
    pub const fn current(&self) -> BiomeKind {
        self.walker.current()
    }

    /// The entropy engine.
    pub const fn entropy(&self) -> &EntropyEngine {
        &self.entropy
    }

    /// The effect registry.
    pub const fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    /// The inventory.
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Current status.
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Steps taken so far.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Generation anomaly, if the graph came from [`GameSession::new`] and
    /// had one.
    pub const fn anomaly(&self) -> Option<GenerationAnomaly> {
        self.anomaly
    }

    /// Register an observer for graph changes.
    pub fn subscribe(&mut self, observer: Box<dyn GraphObserver>) {
        self.observers.push(observer);
    }

    // -------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------

    /// Advance the agent by one weighted random step.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoOutgoingEdges`] on a dead end; the status
    /// becomes [`SessionStatus::ReachedGateway`] on the sink and
    /// [`SessionStatus::Stuck`] anywhere else.
    pub fn step(&mut self) -> Result<StepReport, SessionError> {
        let from = self.walker.current();
        if self.graph.outgoing(from).is_empty() {
            self.status = if self.graph.sink() == Some(from) {
                SessionStatus::ReachedGateway
            } else {
                SessionStatus::Stuck
            };
            warn!(at = %from, status = ?self.status, "no way out");
            return Err(SessionError::NoOutgoingEdges(from));
        }

        let update = self
            .entropy
            .update(self.step_increment, &mut self.graph, &self.effects, &mut self.rng);
        let to = self.walker.step(&self.graph, &mut self.rng)?;
        self.steps = self.steps.saturating_add(1);

        let expired = self.effects.advance_one_step(&mut self.graph);
        let departed = self.effects.depart(to, &mut self.graph);
        let newly_discovered = self.graph.mark_discovered(to)?;
        if self.graph.sink() == Some(to) {
            self.status = SessionStatus::ReachedGateway;
            info!(step = self.steps, "reached the gateway");
        }

        debug!(
            step = self.steps,
            from = %from,
            to = %to,
            entropy = update.current,
            expired = expired.len(),
            departed = departed.len(),
            "step"
        );

        if !update.touched.is_empty() {
            self.notify(&GraphChange::Weights {
                nodes: update.touched.clone(),
            });
        }
        self.notify(&GraphChange::Moved { from, to });
        let restored = restored_nodes(expired.iter().chain(departed.iter()));
        if !restored.is_empty() {
            self.notify(&GraphChange::Weights { nodes: restored });
        }
        if newly_discovered {
            self.notify(&GraphChange::Discovered { biome: to });
        }

        Ok(StepReport {
            step: self.steps,
            from,
            to,
            entropy: update,
            expired: expired.iter().map(|e| e.id().clone()).collect(),
            departed: departed.iter().map(|e| e.id().clone()).collect(),
            newly_discovered,
            status: self.status,
        })
    }

    /// Use the inventory item at `index` on the agent's current node.
    ///
    /// Items are consumed only when they change something.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSuchItem`] for a bad index. Refusals by
    /// the graph are reported as [`ItemOutcome::Blocked`], not as errors.
    pub fn use_item(&mut self, index: usize) -> Result<ItemOutcome, SessionError> {
        let artifact = self.inventory.get(index).ok_or(SessionError::NoSuchItem(index))?;
        let id = artifact.effect_id();
        if self.effects.has_effect(&id) {
            info!(item = %artifact, "effect already active, item kept");
            return Ok(ItemOutcome::AlreadyActive(artifact));
        }

        let current = self.walker.current();
        let mut ctx = EffectContext {
            graph: &mut self.graph,
            registry: &self.effects,
            entropy: &mut self.entropy,
            current,
        };
        let outcome = match artifact.apply(&mut ctx) {
            Ok(outcome) => outcome,
            Err(reason) => return Ok(blocked(artifact, reason)),
        };

        let result = match outcome {
            ArtifactOutcome::Effect(effect) => {
                let writes = !effect.modified_edges().is_empty() || !effect.locked_edges().is_empty();
                if let Err(reason) = self.effects.add_effect(effect, &mut self.graph) {
                    return Ok(blocked(artifact, reason));
                }
                if writes {
                    self.notify(&GraphChange::Weights { nodes: vec![current] });
                }
                ItemOutcome::Applied { artifact, effect: id }
            }
            ArtifactOutcome::Permanent(change) => {
                match self.effects.apply_permanent(change, &mut self.graph) {
                    Ok(()) => {}
                    Err(reason @ (EffectError::NodeHeld { .. } | EffectError::LastExit(_))) => {
                        return Ok(blocked(artifact, reason));
                    }
                    Err(e) => return Err(e.into()),
                }
                self.notify(&GraphChange::Topology { biome: change.node() });
                ItemOutcome::Changed { artifact, change }
            }
            ArtifactOutcome::Drained(entropy) => ItemOutcome::Drained { artifact, entropy },
            ArtifactOutcome::NoOp => {
                info!(item = %artifact, at = %current, "nothing to act on, item kept");
                return Ok(ItemOutcome::NoEffect(artifact));
            }
        };

        self.inventory.take(index);
        info!(item = %artifact, at = %current, remaining = self.inventory.len(), "item used");
        Ok(result)
    }

    // -------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------

    /// Full read-only view for a renderer.
    pub fn snapshot(&self) -> GraphSnapshot {
        let sink = self.graph.sink();
        let nodes = self
            .graph
            .nodes()
            .map(|n| NodeView {
                biome: n.biome(),
                variant: n.variant(),
                discovered: n.discovered(),
                sealed: n.sealed(),
                is_sink: sink == Some(n.biome()),
            })
            .collect();
        let edges = self
            .graph
            .nodes()
            .flat_map(|n| {
                n.edges().iter().map(move |e| {
                    let key = EdgeKey::new(n.biome(), e.to);
                    EdgeView {
                        from: key.from,
                        to: key.to,
                        weight: e.weight,
                        locked: self.effects.is_locked(key),
                    }
                })
            })
            .collect();
        GraphSnapshot {
            nodes,
            edges,
            current: self.walker.current(),
            entropy: self.entropy.current(),
            entropy_max: self.entropy.max(),
            regime: self.entropy.regime(),
        }
    }

    /// The read-only state handed to a decision service.
    pub fn decision_request(&self, goal: &str) -> DecisionRequest {
        let current = self.walker.current();
        let variant = self.graph.node(current).map(Node::variant).unwrap_or_default();
        DecisionRequest {
            current_biome: current.name().to_owned(),
            current_variant: variant.name().to_owned(),
            transitions: self
                .graph
                .outgoing(current)
                .iter()
                .map(|e| TransitionView {
                    target_biome: e.to.name().to_owned(),
                    weight: e.weight,
                })
                .collect(),
            inventory: self.inventory.views(),
            entropy_level: self.entropy.current(),
            entropy_max: self.entropy.max(),
            discovered_biomes: self
                .graph
                .discovered()
                .into_iter()
                .map(|b| b.name().to_owned())
                .collect(),
            active_effects: self
                .effects
                .active()
                .iter()
                .map(|e| e.name().to_owned())
                .collect(),
            goal: goal.to_owned(),
        }
    }

    fn notify(&mut self, change: &GraphChange) {
        for observer in &mut self.observers {
            observer.on_change(change);
        }
    }
}

fn blocked(artifact: Artifact, reason: EffectError) -> ItemOutcome {
    warn!(item = %artifact, reason = %reason, "item refused, kept");
    ItemOutcome::Blocked { artifact, reason }
}

fn restored_nodes<'a>(effects: impl Iterator<Item = &'a ActiveEffect>) -> Vec<BiomeKind> {
    let mut nodes: Vec<BiomeKind> = Vec::new();
    for effect in effects {
        for (key, _) in effect.modified_edges() {
            if !nodes.contains(&key.from) {
                nodes.push(key.from);
            }
        }
    }
    nodes
}

/// A random non-sink node with a way out, else any non-sink node.
fn pick_start(graph: &BiomeGraph, rng: &mut StdRng) -> Option<BiomeKind> {
    let sink = graph.sink();
    let candidates: Vec<BiomeKind> = graph
        .biomes()
        .into_iter()
        .filter(|&b| Some(b) != sink)
        .collect();
    let movable: Vec<BiomeKind> = candidates
        .iter()
        .copied()
        .filter(|&b| !graph.outgoing(b).is_empty())
        .collect();
    movable
        .choose(rng)
        .or_else(|| candidates.first())
        .copied()
}
