//! The agent's ordered item list.

use serde::{Deserialize, Serialize};
use wander_types::ItemView;

use crate::artifact::Artifact;

/// Ordered artifacts carried by the agent. Indices shift down when an
/// item is consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Artifact>,
}

impl Inventory {
    /// An inventory holding these items in order.
    pub const fn new(items: Vec<Artifact>) -> Self {
        Self { items }
    }

    /// Items in order.
    pub fn items(&self) -> &[Artifact] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is left.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<Artifact> {
        self.items.get(index).copied()
    }

    /// Remove and return the item at `index`.
    pub fn take(&mut self, index: usize) -> Option<Artifact> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Append an item.
    pub fn add(&mut self, artifact: Artifact) {
        self.items.push(artifact);
    }

    /// Items as the decision service sees them.
    pub fn views(&self) -> Vec<ItemView> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, artifact)| ItemView {
                index: u32::try_from(i).unwrap_or(u32::MAX),
                name: artifact.name(),
                description: artifact.description(),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wander_types::BiomeKind;

    use super::*;

    #[test]
    fn take_shifts_indices() {
        let mut inv = Inventory::new(vec![Artifact::Mirror, Artifact::Anchor, Artifact::Stillstone]);
        assert_eq!(inv.take(1), Some(Artifact::Anchor));
        assert_eq!(inv.get(1), Some(Artifact::Stillstone));
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.take(5), None);
    }

    #[test]
    fn views_carry_index_and_text() {
        let inv = Inventory::new(vec![Artifact::Lodestone(BiomeKind::Gateway), Artifact::Leveler]);
        let views = inv.views();
        assert_eq!(views.len(), 2);
        let second = views.get(1).unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.name, "Leveler");
        assert_eq!(views.first().unwrap().name, "Lodestone of Gateway");
    }
}
