//! The artifact catalog.
//!
//! Each artifact wraps exactly one transform, permanent change, or entropy
//! adjustment. Artifacts are written in config and shown to the decision
//! service as short `kind` or `kind:Argument` strings, e.g. `mirror` or
//! `lodestone:Gateway`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wander_types::{BiomeKind, EdgeKey, EffectId, VariantKind};
use wander_world::BiomeGraph;

use crate::effects::{ActiveEffect, EffectError, EffectRegistry, Lifetime, PermanentChange};
use crate::entropy::EntropyEngine;
use crate::transform::{self, BiasTarget};

/// Weight multiplier a lodestone applies toward its biome.
pub const LODESTONE_MULTIPLIER: f64 = 1.8;

/// Weight multiplier a prism applies toward its variant.
pub const PRISM_MULTIPLIER: f64 = 1.5;

/// Entropy a stillstone drains.
pub const STILLSTONE_DRAIN: f64 = 20.0;

/// A usable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Artifact {
    /// Bias the current node's odds toward a biome for one step.
    Lodestone(BiomeKind),
    /// Bias the current node's odds toward a variant for one step.
    Prism(VariantKind),
    /// Swap the current node's two likeliest exits for one step.
    Mirror,
    /// Flatten the current node's odds for one step.
    Leveler,
    /// Shield the current node's odds from entropy while the agent stays.
    Anchor,
    /// Drain entropy.
    Stillstone,
    /// Permanently repaint the current node.
    Kindling(VariantKind),
    /// Permanently freeze the current node's odds.
    Keystone,
    /// Permanently cut the current node's edge to a biome.
    Shears(BiomeKind),
}

/// What using an artifact produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactOutcome {
    /// A reversible effect, already applied to the graph, to register.
    Effect(ActiveEffect),
    /// An irreversible change to apply and log.
    Permanent(PermanentChange),
    /// Entropy was drained to this value.
    Drained(f64),
    /// There was nothing to act on.
    NoOp,
}

/// Everything an artifact may read or change.
pub struct EffectContext<'a> {
    /// The graph.
    pub graph: &'a mut BiomeGraph,
    /// Active effects, for node-hold checks.
    pub registry: &'a EffectRegistry,
    /// The entropy engine.
    pub entropy: &'a mut EntropyEngine,
    /// Where the agent stands.
    pub current: BiomeKind,
}

impl Artifact {
    /// Display name.
    pub fn name(self) -> String {
        match self {
            Self::Lodestone(b) => format!("Lodestone of {b}"),
            Self::Prism(v) => format!("{v} Prism"),
            Self::Mirror => "Mirror".to_owned(),
            Self::Leveler => "Leveler".to_owned(),
            Self::Anchor => "Anchor".to_owned(),
            Self::Stillstone => "Stillstone".to_owned(),
            Self::Kindling(v) => format!("{v} Kindling"),
            Self::Keystone => "Keystone".to_owned(),
            Self::Shears(b) => format!("Shears of {b}"),
        }
    }

    /// One-line description for the decision service.
    pub fn description(self) -> String {
        match self {
            Self::Lodestone(b) => format!("For one step, paths into {b} become much more likely."),
            Self::Prism(v) => format!("For one step, paths into {v} places become more likely."),
            Self::Mirror => "For one step, the two likeliest paths trade odds.".to_owned(),
            Self::Leveler => "For one step, every path out is equally likely.".to_owned(),
            Self::Anchor => "While you stay here, entropy cannot shift this place's paths.".to_owned(),
            Self::Stillstone => format!("Calms the world, draining {STILLSTONE_DRAIN} entropy."),
            Self::Kindling(v) => format!("Permanently turns this place {v}."),
            Self::Keystone => "Permanently fixes this place's paths as they are now.".to_owned(),
            Self::Shears(b) => format!("Permanently cuts the path from here into {b}."),
        }
    }

    /// The id of the effect this artifact registers. Artifacts that register
    /// nothing still have one so the log can name them.
    pub fn effect_id(self) -> EffectId {
        let kind = match self {
            Self::Lodestone(_) => "lodestone",
            Self::Prism(_) => "prism",
            Self::Mirror => "mirror",
            Self::Leveler => "leveler",
            Self::Anchor => "anchor",
            Self::Stillstone => "stillstone",
            Self::Kindling(_) => "kindling",
            Self::Keystone => "keystone",
            Self::Shears(_) => "shears",
        };
        EffectId::new(kind)
    }

    /// Run the artifact against the context.
    ///
    /// Reversible artifacts return an effect whose transform has already
    /// been applied; permanent ones return the change for the registry to
    /// apply.
    ///
    /// # Errors
    ///
    /// Propagates [`EffectError::NodeSealed`] and [`EffectError::NodeHeld`]
    /// from transforms. Nothing is written when an error is returned.
    pub fn apply(self, ctx: &mut EffectContext<'_>) -> Result<ArtifactOutcome, EffectError> {
        let node = ctx.current;
        let one_shot = || ActiveEffect::new(self.effect_id(), self.name(), self.description(), Lifetime::Uses(1));

        let outcome = match self {
            Self::Lodestone(biome) => {
                let mut effect = one_shot();
                let hits = transform::bias_toward(
                    ctx.graph,
                    ctx.registry,
                    node,
                    BiasTarget::Biome(biome),
                    LODESTONE_MULTIPLIER,
                    &mut effect,
                )?;
                reversible(hits > 0, effect)
            }
            Self::Prism(variant) => {
                let mut effect = one_shot();
                let hits = transform::bias_toward(
                    ctx.graph,
                    ctx.registry,
                    node,
                    BiasTarget::Variant(variant),
                    PRISM_MULTIPLIER,
                    &mut effect,
                )?;
                reversible(hits > 0, effect)
            }
            Self::Mirror => {
                let mut effect = one_shot();
                let swapped = transform::swap_top_two(ctx.graph, ctx.registry, node, &mut effect)?;
                reversible(swapped, effect)
            }
            Self::Leveler => {
                let mut effect = one_shot();
                let flattened = transform::equalize(ctx.graph, ctx.registry, node, &mut effect)?;
                reversible(flattened, effect)
            }
            Self::Anchor => {
                let mut effect =
                    ActiveEffect::new(self.effect_id(), self.name(), self.description(), Lifetime::WhileAt(node));
                let locked = transform::lock_outgoing(ctx.graph, node, &mut effect);
                reversible(locked > 0, effect)
            }
            Self::Stillstone if ctx.entropy.current() <= 0.0 => ArtifactOutcome::NoOp,
            Self::Stillstone => ArtifactOutcome::Drained(ctx.entropy.drain(STILLSTONE_DRAIN)),
            Self::Kindling(variant) if ctx.graph.node(node).is_some_and(|n| n.variant() == variant) => {
                ArtifactOutcome::NoOp
            }
            Self::Kindling(variant) => ArtifactOutcome::Permanent(PermanentChange::SetVariant { node, variant }),
            Self::Keystone if ctx.graph.is_sealed(node) => ArtifactOutcome::NoOp,
            Self::Keystone => ArtifactOutcome::Permanent(PermanentChange::Seal { node }),
            Self::Shears(target) => {
                let edge = EdgeKey::new(node, target);
                if ctx.graph.weight(edge).is_some() {
                    ArtifactOutcome::Permanent(PermanentChange::Sever { edge })
                } else {
                    ArtifactOutcome::NoOp
                }
            }
        };
        Ok(outcome)
    }
}

fn reversible(acted: bool, effect: ActiveEffect) -> ArtifactOutcome {
    if acted {
        ArtifactOutcome::Effect(effect)
    } else {
        ArtifactOutcome::NoOp
    }
}

/// Failure to parse an artifact string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown artifact {0:?}")]
pub struct ParseArtifactError(pub String);

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lodestone(b) => write!(f, "lodestone:{b}"),
            Self::Prism(v) => write!(f, "prism:{v}"),
            Self::Mirror => f.write_str("mirror"),
            Self::Leveler => f.write_str("leveler"),
            Self::Anchor => f.write_str("anchor"),
            Self::Stillstone => f.write_str("stillstone"),
            Self::Kindling(v) => write!(f, "kindling:{v}"),
            Self::Keystone => f.write_str("keystone"),
            Self::Shears(b) => write!(f, "shears:{b}"),
        }
    }
}

fn parse_biome(arg: &str) -> Option<BiomeKind> {
    BiomeKind::WANDERABLE
        .iter()
        .chain(std::iter::once(&BiomeKind::SINK))
        .copied()
        .find(|b| b.name().eq_ignore_ascii_case(arg))
}

fn parse_variant(arg: &str) -> Option<VariantKind> {
    VariantKind::ALL
        .iter()
        .copied()
        .find(|v| v.name().eq_ignore_ascii_case(arg))
}

impl FromStr for Artifact {
    type Err = ParseArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = || ParseArtifactError(s.to_owned());
        let (kind, arg) = match s.trim().split_once(':') {
            Some((kind, arg)) => (kind.trim().to_ascii_lowercase(), Some(arg.trim())),
            None => (s.trim().to_ascii_lowercase(), None),
        };
        let artifact = match (kind.as_str(), arg) {
            ("lodestone", Some(a)) => Self::Lodestone(parse_biome(a).ok_or_else(fail)?),
            ("prism", Some(a)) => Self::Prism(parse_variant(a).ok_or_else(fail)?),
            ("kindling", Some(a)) => Self::Kindling(parse_variant(a).ok_or_else(fail)?),
            ("shears", Some(a)) => Self::Shears(parse_biome(a).ok_or_else(fail)?),
            ("mirror", None) => Self::Mirror,
            ("leveler", None) => Self::Leveler,
            ("anchor", None) => Self::Anchor,
            ("stillstone", None) => Self::Stillstone,
            ("keystone", None) => Self::Keystone,
            _ => return Err(fail()),
        };
        Ok(artifact)
    }
}

impl TryFrom<String> for Artifact {
    type Error = ParseArtifactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Artifact> for String {
    fn from(artifact: Artifact) -> Self {
        artifact.to_string()
    }
}
