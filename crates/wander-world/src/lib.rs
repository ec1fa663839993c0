//! Biome graph, generator, and walker for the Wander simulation.
//!
//! This crate models the world an agent wanders: biome nodes joined by
//! weighted directed edges whose weights are transition probabilities.
//!
//! # Modules
//!
//! - [`error`] -- Error types for graph operations.
//! - [`node`] -- [`Node`] and [`Edge`], per-node normalization.
//! - [`graph`] -- [`BiomeGraph`]: the owned node/edge table with lookups,
//!   weight access, and breadth-first hop distances.
//! - [`generator`] -- Random generation with isolated-node repair and a
//!   distant, rarely reached Gateway sink.
//! - [`walker`] -- [`Walker`]: one weighted random step at a time.
//!
//! [`Node`]: node::Node
//! [`Edge`]: node::Edge
//! [`BiomeGraph`]: graph::BiomeGraph
//! [`Walker`]: walker::Walker

pub mod error;
pub mod generator;
pub mod graph;
pub mod node;
pub mod walker;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use generator::{GenerationAnomaly, Generated, GeneratorConfig, generate, generate_over};
pub use graph::BiomeGraph;
pub use node::{Edge, Node, WEIGHT_TOLERANCE, normalize_edges, uniform_share};
pub use walker::{Walker, pick_edge};
