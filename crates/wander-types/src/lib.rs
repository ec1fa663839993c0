//! Shared type definitions for the Wander simulation.
//!
//! This crate is the single source of truth for the world vocabulary and
//! for every type that crosses a boundary: the renderer snapshot and the
//! decision-service request/response. Boundary types flow to `TypeScript`
//! via `ts-rs`.
//!
//! # Modules
//!
//! - [`enums`] -- Biome kinds, variant kinds, entropy regimes
//! - [`ids`] -- Edge identity and effect identifiers
//! - [`snapshot`] -- Renderer-facing graph snapshot and change notifications
//! - [`decision`] -- Decision-service request and response shapes

pub mod decision;
pub mod enums;
pub mod ids;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use decision::{Decision, DecisionAction, DecisionRequest, ItemView, TransitionView};
pub use enums::{BiomeKind, Regime, VariantKind};
pub use ids::{EdgeKey, EffectId};
pub use snapshot::{EdgeView, GraphChange, GraphSnapshot, NodeView};
