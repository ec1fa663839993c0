//! Decision-service boundary types.
//!
//! The autoplay runner hands a [`DecisionRequest`] to an external decision
//! service and expects a [`Decision`] back. Anything the service returns
//! that does not fit this shape degrades to [`Decision::fallback_move`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One outgoing transition from the agent's current node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TransitionView {
    /// Target biome name.
    pub target_biome: String,
    /// Transition probability.
    pub weight: f64,
}

/// One inventory slot as the decision service sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ItemView {
    /// Position in the inventory, used as `item_index` in a decision.
    pub index: u32,
    /// Artifact name.
    pub name: String,
    /// What using it does.
    pub description: String,
}

/// Read-only game state sent to the decision service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DecisionRequest {
    /// Name of the agent's current biome.
    pub current_biome: String,
    /// Current node variant name.
    pub current_variant: String,
    /// Outgoing transitions in stored order.
    pub transitions: Vec<TransitionView>,
    /// Inventory contents.
    pub inventory: Vec<ItemView>,
    /// Current entropy.
    pub entropy_level: f64,
    /// Entropy ceiling.
    pub entropy_max: f64,
    /// Names of every discovered biome.
    pub discovered_biomes: Vec<String>,
    /// Names of active effects.
    pub active_effects: Vec<String>,
    /// Free-text objective.
    pub goal: String,
}

/// The discrete action a decision selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Take one weighted step.
    Move,
    /// Use the inventory item at `item_index`.
    UseItem,
}

/// A decision returned by the decision service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Decision {
    /// What to do.
    pub action: DecisionAction,
    /// Inventory slot for [`DecisionAction::UseItem`].
    #[serde(default)]
    pub item_index: Option<u32>,
    /// The service's stated reasoning (logged, not interpreted).
    pub reasoning: String,
}

impl Decision {
    /// A plain move decision.
    pub fn moving(reasoning: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Move,
            item_index: None,
            reasoning: reasoning.into(),
        }
    }

    /// The safe default used whenever a decision cannot be obtained.
    pub fn fallback_move(reason: &str) -> Self {
        let reasoning = if reason.trim().is_empty() {
            "No usable decision; defaulting to move".to_owned()
        } else {
            reason.to_owned()
        };
        Self::moving(reasoning)
    }
}
