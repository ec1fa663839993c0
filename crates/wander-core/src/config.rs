//! Configuration loading and typed config structures for a Wander session.
//!
//! The canonical configuration lives in `wander-config.yaml` at the project
//! root. Every section and field has a default, so an empty file (or no
//! file at all) yields the standard game.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wander_world::GeneratorConfig;

use crate::artifact::Artifact;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The values parsed but describe an unusable game.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
///
/// Mirrors the structure of `wander-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GameConfig {
    /// Seed and objective.
    #[serde(default)]
    pub world: WorldConfig,

    /// Graph generation parameters.
    #[serde(default)]
    pub generation: GeneratorConfig,

    /// Entropy engine parameters.
    #[serde(default)]
    pub entropy: EntropyConfig,

    /// Starting inventory.
    #[serde(default)]
    pub inventory: InventoryConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `WANDER_SEED`, when set to an integer, overrides `world.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.world.apply_env_overrides();
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the types cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generation
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.entropy.validate()
    }
}

/// Seed and objective.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Random seed for reproducibility. Absent means a fresh seed per run.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Free-text objective handed to the decision service.
    #[serde(default = "default_goal")]
    pub goal: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: None,
            goal: default_goal(),
        }
    }
}

impl WorldConfig {
    /// Override the seed from `WANDER_SEED` when it holds an integer.
    pub fn apply_env_overrides(&mut self) {
        self.apply_seed_override(std::env::var("WANDER_SEED").ok().as_deref());
    }

    /// Replace the seed with `raw` when it parses as an integer.
    pub fn apply_seed_override(&mut self, raw: Option<&str>) {
        if let Some(seed) = raw.and_then(|v| v.trim().parse::<u64>().ok()) {
            self.seed = Some(seed);
        }
    }
}

/// What the perturbation pass does when entropy lands in the stable regime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StablePolicy {
    /// Leave weights alone.
    #[default]
    Keep,
    /// Force every unguarded weight to zero. Walks then fall through to the
    /// last edge of each node until a higher regime fires.
    Zero,
}

/// How perturbed weights are brought back to a probability distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Each node's outgoing edges sum to one.
    #[default]
    PerNode,
    /// All perturbed edges share one pool that sums to one.
    Global,
}

/// Entropy engine parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EntropyConfig {
    /// Entropy ceiling.
    #[serde(default = "default_entropy_max")]
    pub max: f64,

    /// Ascending regime boundaries: below the first is stable, below the
    /// second is shifting, the rest is chaotic.
    #[serde(default = "default_thresholds")]
    pub thresholds: [f64; 2],

    /// Entropy at session start.
    #[serde(default)]
    pub initial: f64,

    /// Entropy added by every agent step.
    #[serde(default = "default_step_increment")]
    pub step_increment: f64,

    /// Stable-regime behaviour.
    #[serde(default)]
    pub stable_policy: StablePolicy,

    /// Normalization scope.
    #[serde(default)]
    pub normalization: Normalization,

    /// Relative jitter applied to base weights in the shifting regime.
    #[serde(default = "default_shifting_amplitude")]
    pub shifting_amplitude: f64,

    /// Relative jitter applied to base weights in the chaotic regime.
    #[serde(default = "default_chaotic_amplitude")]
    pub chaotic_amplitude: f64,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            max: default_entropy_max(),
            thresholds: default_thresholds(),
            initial: 0.0,
            step_increment: default_step_increment(),
            stable_policy: StablePolicy::default(),
            normalization: Normalization::default(),
            shifting_amplitude: default_shifting_amplitude(),
            chaotic_amplitude: default_chaotic_amplitude(),
        }
    }
}

impl EntropyConfig {
    /// Check that thresholds, amplitudes, and the starting value make sense.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [low, high] = self.thresholds;
        if !self.max.is_finite() || self.max <= 0.0 {
            return Err(ConfigError::Invalid(format!("entropy.max must be positive, got {}", self.max)));
        }
        if !(low > 0.0 && low < high && high < self.max) {
            return Err(ConfigError::Invalid(format!(
                "entropy.thresholds must satisfy 0 < {low} < {high} < {}",
                self.max
            )));
        }
        if !(0.0..=self.max).contains(&self.initial) {
            return Err(ConfigError::Invalid(format!(
                "entropy.initial {} outside [0, {}]",
                self.initial, self.max
            )));
        }
        if !self.step_increment.is_finite() || self.step_increment < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "entropy.step_increment must be non-negative, got {}",
                self.step_increment
            )));
        }
        for (name, amplitude) in [
            ("shifting_amplitude", self.shifting_amplitude),
            ("chaotic_amplitude", self.chaotic_amplitude),
        ] {
            if !(0.0..1.0).contains(&amplitude) {
                return Err(ConfigError::Invalid(format!(
                    "entropy.{name} must be in [0, 1), got {amplitude}"
                )));
            }
        }
        Ok(())
    }
}

/// Starting inventory.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InventoryConfig {
    /// Artifacts the agent starts with, in inventory order.
    #[serde(default = "default_starting_items")]
    pub starting_items: Vec<Artifact>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            starting_items: default_starting_items(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_goal() -> String {
    "Find the Gateway".to_owned()
}

const fn default_entropy_max() -> f64 {
    100.0
}

const fn default_thresholds() -> [f64; 2] {
    [31.0, 62.0]
}

const fn default_step_increment() -> f64 {
    1.0
}

const fn default_shifting_amplitude() -> f64 {
    0.15
}

const fn default_chaotic_amplitude() -> f64 {
    0.40
}

fn default_starting_items() -> Vec<Artifact> {
    vec![
        Artifact::Lodestone(wander_types::BiomeKind::Gateway),
        Artifact::Mirror,
        Artifact::Anchor,
        Artifact::Stillstone,
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wander_types::{BiomeKind, VariantKind};

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.world.seed.is_none());
        assert_eq!(config.inventory.starting_items.len(), 4);
        assert_eq!(config.entropy.stable_policy, StablePolicy::Keep);
        assert_eq!(config.entropy.normalization, Normalization::PerNode);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  seed: 7
  goal: "Reach the Gateway quickly"

generation:
  connection_distribution: [0.0, 0.5, 0.5, 0.0, 0.0]
  sink_single_source_probability: 1.0
  sink_weight_min: 0.01
  sink_weight_max: 0.02
  sink_min_distance: 2

entropy:
  max: 50
  thresholds: [10, 20]
  initial: 5
  step_increment: 2.5
  stable_policy: zero
  normalization: global
  shifting_amplitude: 0.1
  chaotic_amplitude: 0.3

inventory:
  starting_items:
    - "mirror"
    - "lodestone:Gateway"
    - "kindling:Frozen"
"#;

        let config = GameConfig::parse(yaml).unwrap();
        assert_eq!(config.world.seed, Some(7));
        assert_eq!(config.world.goal, "Reach the Gateway quickly");
        assert_eq!(config.generation.sink_min_distance, 2);
        assert_eq!(config.entropy.stable_policy, StablePolicy::Zero);
        assert_eq!(config.entropy.normalization, Normalization::Global);
        assert_eq!(
            config.inventory.starting_items,
            vec![
                Artifact::Mirror,
                Artifact::Lodestone(BiomeKind::Gateway),
                Artifact::Kindling(VariantKind::Frozen),
            ]
        );
    }

    #[test]
    fn seed_override_needs_an_integer() {
        let mut world = GameConfig::parse("world:\n  seed: 7\n").unwrap().world;
        world.apply_seed_override(None);
        assert_eq!(world.seed, Some(7));
        world.apply_seed_override(Some("not-a-number"));
        assert_eq!(world.seed, Some(7));
        world.apply_seed_override(Some(" 99 "));
        assert_eq!(world.seed, Some(99));
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let config = GameConfig::parse("{}").unwrap();
        assert_eq!(config.entropy, EntropyConfig::default());
        assert_eq!(config.generation, GeneratorConfig::default());
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let result = GameConfig::parse("entropy:\n  thresholds: [62, 31]\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_amplitude_of_one() {
        let result = GameConfig::parse("entropy:\n  chaotic_amplitude: 1.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_artifact() {
        let result = GameConfig::parse("inventory:\n  starting_items: [\"teleporter\"]\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn rejects_bad_generation() {
        let result = GameConfig::parse("generation:\n  connection_distribution: [0.5, 0.5, 0.5, 0.0, 0.0]\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = GameConfig::from_file(Path::new("/nonexistent/wander-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn shipped_config_file_parses() {
        let config: GameConfig = serde_yml::from_str(include_str!("../../../wander-config.yaml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.world.seed, Some(42));
        assert_eq!(config.inventory.starting_items.first(), Some(&Artifact::Lodestone(BiomeKind::Gateway)));
        assert_eq!(config.inventory.starting_items.len(), 4);
    }
}
