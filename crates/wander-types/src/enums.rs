//! Enumeration types for the Wander simulation.
//!
//! The world vocabulary: which biomes a graph is built from, the variants
//! a biome node can carry, and the entropy regimes. Pure data, no logic
//! beyond naming and ordering.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Biomes
// ---------------------------------------------------------------------------

/// The kind of a node in the biome graph.
///
/// A biome doubles as the node's identity: a generated graph holds at most
/// one node per kind. [`BiomeKind::Gateway`] is the designated sink and is
/// never part of the regular wandering set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BiomeKind {
    /// Dense woodland.
    Forest,
    /// Open sand and dunes.
    Desert,
    /// Frozen treeless plain.
    Tundra,
    /// Waterlogged lowland.
    Swamp,
    /// High rocky ground.
    Mountains,
    /// Grassland.
    Plains,
    /// Open water.
    Ocean,
    /// Tropical rainforest.
    Jungle,
    /// Active volcanic field.
    Volcano,
    /// Underground cave system.
    Caverns,
    /// Dry grassland with scattered trees.
    Savanna,
    /// Moving ice sheet.
    Glacier,
    /// The exit. Has no outgoing transitions and is reachable only through
    /// rare, low-weight edges.
    Gateway,
}

impl BiomeKind {
    /// Every biome a generated graph builds a regular node for, in
    /// declaration order. Excludes the sink.
    pub const WANDERABLE: [Self; 12] = [
        Self::Forest,
        Self::Desert,
        Self::Tundra,
        Self::Swamp,
        Self::Mountains,
        Self::Plains,
        Self::Ocean,
        Self::Jungle,
        Self::Volcano,
        Self::Caverns,
        Self::Savanna,
        Self::Glacier,
    ];

    /// The designated sink kind.
    pub const SINK: Self = Self::Gateway;

    /// Whether this is the sink kind.
    pub const fn is_sink(self) -> bool {
        matches!(self, Self::Gateway)
    }

    /// Display name used in prompts and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Forest => "Forest",
            Self::Desert => "Desert",
            Self::Tundra => "Tundra",
            Self::Swamp => "Swamp",
            Self::Mountains => "Mountains",
            Self::Plains => "Plains",
            Self::Ocean => "Ocean",
            Self::Jungle => "Jungle",
            Self::Volcano => "Volcano",
            Self::Caverns => "Caverns",
            Self::Savanna => "Savanna",
            Self::Glacier => "Glacier",
            Self::Gateway => "Gateway",
        }
    }
}

impl core::fmt::Display for BiomeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// A secondary modifier carried by a node, independent of its biome.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum VariantKind {
    /// No modifier.
    #[default]
    Normal,
    /// On fire.
    Burning,
    /// Iced over.
    Frozen,
    /// Under water.
    Flooded,
    /// Choked with growth.
    Overgrown,
    /// Drained of life.
    Withered,
    /// Encrusted with crystal.
    Crystalline,
    /// Something lingers here.
    Haunted,
}

impl VariantKind {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Normal,
        Self::Burning,
        Self::Frozen,
        Self::Flooded,
        Self::Overgrown,
        Self::Withered,
        Self::Crystalline,
        Self::Haunted,
    ];

    /// Display name used in prompts and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Burning => "Burning",
            Self::Frozen => "Frozen",
            Self::Flooded => "Flooded",
            Self::Overgrown => "Overgrown",
            Self::Withered => "Withered",
            Self::Crystalline => "Crystalline",
            Self::Haunted => "Haunted",
        }
    }
}

impl core::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Entropy regimes
// ---------------------------------------------------------------------------

/// Discrete entropy regime, a step function of the entropy scalar.
///
/// Ordered from calmest to most volatile so upward transitions compare
/// with `>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Regime {
    /// Below the first threshold.
    Stable,
    /// Between the two thresholds.
    Shifting,
    /// At or above the second threshold.
    Chaotic,
}
