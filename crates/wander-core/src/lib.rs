//! Entropy, effects, artifacts, and session orchestration for Wander.
//!
//! This crate drives a game on top of the `wander-world` graph: it owns the
//! entropy state machine that perturbs edge weights, the registry that
//! applies and restores reversible effects, the artifact catalog, and the
//! [`GameSession`] that sequences every agent step.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `wander-config.yaml` into
//!   strongly-typed structs.
//! - [`entropy`] -- [`EntropyEngine`] and the [`EdgeGuard`] seam.
//! - [`effects`] -- [`EffectRegistry`], [`ActiveEffect`], permanent changes.
//! - [`transform`] -- Weight transforms that artifacts build on.
//! - [`artifact`] -- The [`Artifact`] catalog.
//! - [`inventory`] -- The agent's ordered item list.
//! - [`session`] -- [`GameSession`]: step ordering, item use, views.
//!
//! [`EntropyEngine`]: entropy::EntropyEngine
//! [`EdgeGuard`]: entropy::EdgeGuard
//! [`EffectRegistry`]: effects::EffectRegistry
//! [`ActiveEffect`]: effects::ActiveEffect
//! [`Artifact`]: artifact::Artifact
//! [`GameSession`]: session::GameSession

pub mod artifact;
pub mod config;
pub mod effects;
pub mod entropy;
pub mod inventory;
pub mod session;
pub mod transform;

pub use artifact::{Artifact, ArtifactOutcome, EffectContext};
pub use config::{ConfigError, EntropyConfig, GameConfig, Normalization, StablePolicy};
pub use effects::{ActiveEffect, EffectError, EffectRegistry, Lifetime, PermanentChange};
pub use entropy::{EdgeGuard, EntropyEngine, EntropyUpdate, Unguarded};
pub use inventory::Inventory;
pub use session::{GameSession, GraphObserver, ItemOutcome, SessionError, SessionStatus, StepReport};
