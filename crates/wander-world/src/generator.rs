//! Random biome-graph generation with connectivity guarantees.
//!
//! # Algorithm
//!
//! 1. One node per wanderable biome, default variant, no edges.
//! 2. Each node draws a connection count from a fixed distribution and
//!    links to that many distinct other nodes.
//!
//!    | Connections | 0   | 1   | 2   | 3   | 4   |
//!    |-------------|-----|-----|-----|-----|-----|
//!    | Probability | 10% | 35% | 35% | 15% |  5% |
//!
//! 3. Raw weights are uniform random, then normalized per node.
//! 4. Any node with no outgoing and no incoming edge is forced to link to a
//!    random other node with weight 1.0.
//! 5. A reference node is drawn from nodes with a way out, and hop
//!    distances from it are computed.
//! 6. The Gateway sink is appended and fed by one source (80%) or two.
//!    Sources come from nodes at least three hops from the reference, or
//!    any node with a way out if none are that far.
//! 7. Sink edges get a deliberately small weight in `[0.005, 0.05]`.
//! 8. Every node is renormalized.
//!
//! Generation never fails. If no sink source exists at all the sink is
//! left unreachable and a [`GenerationAnomaly`] is reported.

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};
use wander_types::BiomeKind;

use crate::error::WorldError;
use crate::graph::BiomeGraph;

/// Tunable generator parameters. Defaults match the algorithm above.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeneratorConfig {
    /// `connection_distribution[k]` is the probability of drawing `k`
    /// outgoing connections.
    #[serde(default = "default_connection_distribution")]
    pub connection_distribution: Vec<f64>,

    /// Probability that the sink gets exactly one incoming edge (else two).
    #[serde(default = "default_sink_single_source_probability")]
    pub sink_single_source_probability: f64,

    /// Lower bound of a sink edge's raw weight.
    #[serde(default = "default_sink_weight_min")]
    pub sink_weight_min: f64,

    /// Upper bound of a sink edge's raw weight.
    #[serde(default = "default_sink_weight_max")]
    pub sink_weight_max: f64,

    /// Minimum hop distance from the reference node for a sink source.
    #[serde(default = "default_sink_min_distance")]
    pub sink_min_distance: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            connection_distribution: default_connection_distribution(),
            sink_single_source_probability: default_sink_single_source_probability(),
            sink_weight_min: default_sink_weight_min(),
            sink_weight_max: default_sink_weight_max(),
            sink_min_distance: default_sink_min_distance(),
        }
    }
}

fn default_connection_distribution() -> Vec<f64> {
    vec![0.10, 0.35, 0.35, 0.15, 0.05]
}

const fn default_sink_single_source_probability() -> f64 {
    0.8
}

const fn default_sink_weight_min() -> f64 {
    0.005
}

const fn default_sink_weight_max() -> f64 {
    0.05
}

const fn default_sink_min_distance() -> u32 {
    3
}

impl GeneratorConfig {
    /// Check that every probability and range is usable.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.connection_distribution.is_empty() {
            return Err(WorldError::InvalidConfig(
                "connection_distribution must not be empty".to_owned(),
            ));
        }
        if self
            .connection_distribution
            .iter()
            .any(|p| !p.is_finite() || *p < 0.0)
        {
            return Err(WorldError::InvalidConfig(
                "connection_distribution entries must be non-negative".to_owned(),
            ));
        }
        let total: f64 = self.connection_distribution.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(WorldError::InvalidConfig(format!(
                "connection_distribution sums to {total}, expected 1"
            )));
        }
        if !(0.0..=1.0).contains(&self.sink_single_source_probability) {
            return Err(WorldError::InvalidConfig(
                "sink_single_source_probability must be in [0, 1]".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&self.sink_weight_min)
            || !(0.0..=1.0).contains(&self.sink_weight_max)
            || self.sink_weight_min > self.sink_weight_max
        {
            return Err(WorldError::InvalidConfig(format!(
                "sink weight range [{}, {}] is not a sub-range of [0, 1]",
                self.sink_weight_min, self.sink_weight_max
            )));
        }
        Ok(())
    }

    /// Map a uniform draw in `[0, 1)` to a connection count through the
    /// cumulative distribution. Falls back to the largest count.
    pub fn connection_count(&self, roll: f64) -> usize {
        let mut cumulative = 0.0;
        for (count, p) in self.connection_distribution.iter().enumerate() {
            cumulative += p;
            if roll < cumulative {
                return count;
            }
        }
        self.connection_distribution.len().saturating_sub(1)
    }
}

/// A non-fatal problem found while generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GenerationAnomaly {
    /// No node qualified as a sink source; the sink has no incoming edge.
    SinkUnreachable,
}

/// The output of [`generate`].
#[derive(Debug, Clone)]
pub struct Generated {
    /// The finished graph.
    pub graph: BiomeGraph,
    /// The node hop distances were measured from, if any node had a way out.
    pub reference: Option<BiomeKind>,
    /// Set when the sink could not be connected.
    pub anomaly: Option<GenerationAnomaly>,
}

/// Build a random biome graph over every wanderable biome plus the sink.
///
/// Expects a config that passed [`GeneratorConfig::validate`].
pub fn generate<R: Rng + ?Sized>(config: &GeneratorConfig, rng: &mut R) -> Generated {
    generate_over(&BiomeKind::WANDERABLE, config, rng)
}

/// Build a random graph over the given biomes plus the sink.
///
/// Biomes equal to the sink kind or repeated are skipped.
pub fn generate_over<R: Rng + ?Sized>(
    biomes: &[BiomeKind],
    config: &GeneratorConfig,
    rng: &mut R,
) -> Generated {
    let mut graph = BiomeGraph::new();

    // 1. Nodes.
    for &biome in biomes.iter().filter(|b| !b.is_sink()) {
        if let Err(e) = graph.add_node(biome) {
            debug!(error = %e, "skipping biome");
        }
    }
    let order = graph.biomes();

    // 2-3. Random neighbors with random normalized weights.
    for &from in &order {
        let others: Vec<BiomeKind> = order.iter().copied().filter(|&b| b != from).collect();
        let count = config.connection_count(rng.random::<f64>()).min(others.len());
        let targets: Vec<BiomeKind> = others.choose_multiple(rng, count).copied().collect();
        for to in targets {
            let raw: f64 = rng.random();
            link(&mut graph, from, to, raw);
        }
        renormalize(&mut graph, from);
    }

    // 4. Connectivity repair.
    let mut repaired: u32 = 0;
    for &biome in &order {
        if !graph.is_isolated(biome) {
            continue;
        }
        let others: Vec<BiomeKind> = order.iter().copied().filter(|&b| b != biome).collect();
        if let Some(&to) = others.choose(rng) {
            link(&mut graph, biome, to, 1.0);
            renormalize(&mut graph, biome);
            repaired = repaired.saturating_add(1);
        }
    }

    // 5. Reference node and hop distances.
    let with_exit: Vec<BiomeKind> = order
        .iter()
        .copied()
        .filter(|&b| !graph.outgoing(b).is_empty())
        .collect();
    let reference = with_exit.choose(rng).copied();
    let distances = reference.map(|r| graph.hop_distances(r)).unwrap_or_default();

    // 6. Sink and its sources.
    let mut anomaly = None;
    if let Err(e) = graph.add_sink(BiomeKind::SINK) {
        warn!(error = %e, "sink biome already present");
    }
    let wanted: usize = if rng.random_bool(config.sink_single_source_probability.clamp(0.0, 1.0)) {
        1
    } else {
        2
    };
    let distant: Vec<BiomeKind> = with_exit
        .iter()
        .copied()
        .filter(|b| {
            distances
                .get(b)
                .is_some_and(|&d| d >= config.sink_min_distance)
        })
        .collect();
    let pool = if distant.is_empty() { with_exit } else { distant };
    let sources: Vec<BiomeKind> = pool
        .choose_multiple(rng, wanted.min(pool.len()))
        .copied()
        .collect();

    if sources.is_empty() {
        warn!(
            anomaly = ?GenerationAnomaly::SinkUnreachable,
            "no node can feed the sink; gateway is unreachable"
        );
        anomaly = Some(GenerationAnomaly::SinkUnreachable);
    }

    // 7. Low-weight sink edges.
    for &source in &sources {
        let weight = rng.random_range(config.sink_weight_min..=config.sink_weight_max);
        link(&mut graph, source, BiomeKind::SINK, weight);
    }

    // 8. Final renormalization.
    graph.normalize_all();

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        repaired,
        reference = ?reference,
        sink_sources = ?sources,
        "biome graph generated"
    );

    Generated {
        graph,
        reference,
        anomaly,
    }
}

/// Add an edge the generator has already checked. Failures are logged.
fn link(graph: &mut BiomeGraph, from: BiomeKind, to: BiomeKind, weight: f64) {
    if let Err(e) = graph.add_edge(from, to, weight) {
        warn!(error = %e, %from, %to, "generator edge rejected");
    }
}

fn renormalize(graph: &mut BiomeGraph, biome: BiomeKind) {
    if let Err(e) = graph.normalize(biome) {
        warn!(error = %e, %biome, "generator renormalization failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::node::WEIGHT_TOLERANCE;

    #[test]
    fn default_config_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_distribution_rejected() {
        let config = GeneratorConfig {
            connection_distribution: vec![0.5, 0.2],
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());

        let inverted = GeneratorConfig {
            sink_weight_min: 0.5,
            sink_weight_max: 0.1,
            ..GeneratorConfig::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn connection_count_thresholds() {
        let config = GeneratorConfig::default();
        assert_eq!(config.connection_count(0.0), 0);
        assert_eq!(config.connection_count(0.09), 0);
        assert_eq!(config.connection_count(0.10), 1);
        assert_eq!(config.connection_count(0.44), 1);
        assert_eq!(config.connection_count(0.45), 2);
        assert_eq!(config.connection_count(0.80), 3);
        assert_eq!(config.connection_count(0.95), 4);
        assert_eq!(config.connection_count(0.999_999), 4);
    }

    #[test]
    fn generated_graphs_hold_invariants() {
        let config = GeneratorConfig::default();
        for seed in 0_u64..200 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let generated = generate(&config, &mut rng);
            let graph = &generated.graph;

            assert_eq!(graph.node_count(), BiomeKind::WANDERABLE.len() + 1);
            assert_eq!(graph.sink(), Some(BiomeKind::Gateway));

            for node in graph.nodes() {
                if node.has_outgoing() {
                    assert!(
                        (node.weight_sum() - 1.0).abs() <= WEIGHT_TOLERANCE,
                        "seed {seed}: {} sums to {}",
                        node.biome(),
                        node.weight_sum()
                    );
                }
                if !node.biome().is_sink() {
                    assert!(
                        !graph.is_isolated(node.biome()),
                        "seed {seed}: {} is isolated",
                        node.biome()
                    );
                }
            }

            assert!(graph.outgoing(BiomeKind::Gateway).is_empty());
            let sink_in = graph.incoming_count(BiomeKind::Gateway);
            assert!((1..=2).contains(&sink_in), "seed {seed}: sink has {sink_in} sources");
            assert!(generated.anomaly.is_none());
        }
    }

    #[test]
    fn no_self_loops_or_duplicate_targets() {
        let config = GeneratorConfig::default();
        for seed in 0_u64..100 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let graph = generate(&config, &mut rng).graph;
            for node in graph.nodes() {
                let mut targets: Vec<BiomeKind> = node.edges().iter().map(|e| e.to).collect();
                assert!(!targets.contains(&node.biome()));
                let before = targets.len();
                targets.sort();
                targets.dedup();
                assert_eq!(before, targets.len());
            }
        }
    }

    #[test]
    fn sink_edges_are_rare() {
        let config = GeneratorConfig::default();
        for seed in 0_u64..100 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let graph = generate(&config, &mut rng).graph;
            for node in graph.nodes() {
                if let Some(edge) = node.edge_to(BiomeKind::Gateway) {
                    // The raw sink weight is at most 0.05 and the rest of the
                    // node's mass was normalized to 1 before it was added.
                    assert!(edge.weight <= 0.05 / 1.05 + WEIGHT_TOLERANCE || node.edges().len() == 1);
                }
            }
        }
    }

    #[test]
    fn sink_sources_are_distant_when_possible() {
        let config = GeneratorConfig::default();
        for seed in 0_u64..100 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let generated = generate(&config, &mut rng);
            let Some(reference) = generated.reference else {
                continue;
            };
            let graph = &generated.graph;
            let distances = graph.hop_distances(reference);
            let any_far = graph.nodes().any(|n| {
                !n.biome().is_sink()
                    && n.edge_to(BiomeKind::Gateway).is_none()
                    && n.has_outgoing()
                    && distances.get(&n.biome()).is_some_and(|&d| d >= 3)
            });
            let sources: Vec<BiomeKind> = graph
                .nodes()
                .filter(|n| n.edge_to(BiomeKind::Gateway).is_some())
                .map(|n| n.biome())
                .collect();
            // Adding sink edges can only shorten paths to the sink itself, so
            // the measured distances of the sources are unchanged.
            let far_sources = sources
                .iter()
                .filter(|b| distances.get(b).is_some_and(|&d| d >= 3))
                .count();
            if far_sources == 0 {
                assert!(!any_far, "seed {seed}: a distant source was available but unused");
            }
        }
    }

    #[test]
    fn same_seed_same_graph() {
        let config = GeneratorConfig::default();
        let a = generate(&config, &mut SmallRng::seed_from_u64(7)).graph;
        let b = generate(&config, &mut SmallRng::seed_from_u64(7)).graph;
        assert_eq!(a.edge_keys(), b.edge_keys());
        for key in a.edge_keys() {
            assert_eq!(a.weight(key), b.weight(key));
        }
    }

    #[test]
    fn single_biome_reports_unreachable_sink() {
        let config = GeneratorConfig::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let generated = generate_over(&[BiomeKind::Forest], &config, &mut rng);
        assert_eq!(generated.anomaly, Some(GenerationAnomaly::SinkUnreachable));
        assert_eq!(generated.graph.incoming_count(BiomeKind::Gateway), 0);
        assert_eq!(generated.graph.node_count(), 2);
    }

    #[test]
    fn two_biomes_are_repaired_into_a_pair() {
        let config = GeneratorConfig {
            connection_distribution: vec![1.0],
            ..GeneratorConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let generated = generate_over(&[BiomeKind::Forest, BiomeKind::Desert], &config, &mut rng);
        let graph = &generated.graph;
        // With zero connections drawn, the first node is repaired toward the
        // second, which then has an incoming edge and stays as it is.
        assert!(!graph.is_isolated(BiomeKind::Forest));
        assert!(!graph.is_isolated(BiomeKind::Desert));
        assert!(graph.is_normalized());
    }
}
