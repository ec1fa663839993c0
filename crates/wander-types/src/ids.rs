//! Identifier types.
//!
//! Nodes are identified by their [`BiomeKind`], so the only composite
//! identity is the edge: a `(from, to)` pair of biomes. Effects carry a
//! string identifier that is unique per effect kind.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::BiomeKind;

/// Stable identity of a directed edge.
///
/// A graph holds at most one edge per ordered pair of biomes, so the pair
/// is a complete key. Used by side tables (effect snapshots, locks, the
/// entropy base-weight snapshot) instead of flags on the edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EdgeKey {
    /// Source biome.
    pub from: BiomeKind,
    /// Target biome.
    pub to: BiomeKind,
}

impl EdgeKey {
    /// Create an edge key.
    pub const fn new(from: BiomeKind, to: BiomeKind) -> Self {
        Self { from, to }
    }
}

impl core::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// Identifier of an active effect.
///
/// Unique per effect kind: two uses of the same artifact produce the same
/// id, which is how the registry detects an already-active effect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EffectId(pub String);

impl EffectId {
    /// Create an effect id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EffectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EffectId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_orders_by_source_then_target() {
        let a = EdgeKey::new(BiomeKind::Forest, BiomeKind::Ocean);
        let b = EdgeKey::new(BiomeKind::Forest, BiomeKind::Glacier);
        let c = EdgeKey::new(BiomeKind::Desert, BiomeKind::Forest);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn edge_key_display() {
        let key = EdgeKey::new(BiomeKind::Swamp, BiomeKind::Gateway);
        assert_eq!(key.to_string(), "Swamp->Gateway");
    }

    #[test]
    fn effect_id_round_trips_through_str() {
        let id = EffectId::from("mirror");
        assert_eq!(id.as_str(), "mirror");
        assert_eq!(id, EffectId::new(String::from("mirror")));
    }
}
