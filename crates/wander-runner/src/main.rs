//! Autoplay runner for Wander.
//!
//! Generates a world from `wander-config.yaml`, then lets a decision
//! service steer the wanderer until it reaches the Gateway, gets stuck,
//! runs out of steps, or receives Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! GameSession --> DecisionRequest --> Prompt Engine --> LLM Backend --> Parser --> Decision --> GameSession
//! ```
//!
//! Every turn gets a decision. If the service fails, times out, or answers
//! nonsense, the turn becomes a plain move and the loop backs off briefly.

mod autoplay;
mod config;
mod decision;
mod error;
mod llm;
mod parse;
mod prompt;

use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wander_core::{GameConfig, GameSession};

use crate::autoplay::{Autoplay, AutoplaySettings, AutoplaySummary};
use crate::config::RunnerConfig;
use crate::decision::{DecisionSource, LlmDecisionSource, WalkOnly};
use crate::error::RunnerError;
use crate::llm::create_backend;
use crate::prompt::PromptEngine;

/// Application entry point.
///
/// Initializes logging, loads runner and game configuration, starts a
/// session, and plays it out.
///
/// # Errors
///
/// Returns an error if configuration, world setup, or the session fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_invalid| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("wander-runner starting");

    let config = RunnerConfig::from_env().context("loading runner configuration")?;
    let game = load_game_config(&config.game_config_path)?;
    info!(
        game_config = config.game_config_path,
        seed = ?game.world.seed,
        decision_timeout_ms = config.decision_timeout.as_millis(),
        autoplay_interval_ms = config.autoplay_interval.as_millis(),
        max_steps = config.max_steps,
        "configuration loaded"
    );

    let session = GameSession::new(&game).context("starting game session")?;
    let settings = AutoplaySettings {
        decision_timeout: config.decision_timeout,
        interval: config.autoplay_interval,
        retry_backoff: config.retry_backoff,
        max_steps: config.max_steps,
        goal: config.goal.clone().unwrap_or_else(|| game.world.goal.clone()),
    };

    let summary = match &config.backend {
        Some(backend_config) => {
            let prompts = PromptEngine::new(config.templates_dir.as_deref()).context("loading prompt templates")?;
            let backend = create_backend(backend_config);
            info!(backend = backend.name(), model = backend_config.model, "LLM backend configured");
            play(Autoplay::new(session, LlmDecisionSource::new(prompts, backend), settings)).await?
        }
        None => {
            warn!("LLM_BACKEND not set, wandering without a decision service");
            play(Autoplay::new(session, WalkOnly, settings)).await?
        }
    };

    info!(end = ?summary.end, steps = summary.steps, "wander-runner done");
    Ok(())
}

/// Load the game config file, or defaults when it does not exist.
fn load_game_config(path: &str) -> anyhow::Result<GameConfig> {
    let path = Path::new(path);
    if path.exists() {
        return GameConfig::from_file(path).with_context(|| format!("loading {}", path.display()));
    }
    warn!(path = %path.display(), "game config not found, using defaults");
    let mut config = GameConfig::default();
    config.world.apply_env_overrides();
    Ok(config)
}

/// Run autoplay with Ctrl-C wired to its stop signal.
async fn play<S: DecisionSource>(mut autoplay: Autoplay<S>) -> Result<AutoplaySummary, RunnerError> {
    let stop = autoplay.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            stop.stop();
        }
    });
    let summary = autoplay.run().await?;
    let session = autoplay.session();
    info!(
        at = %session.current(),
        discovered = session.graph().discovered().len(),
        entropy = session.entropy().current(),
        items_left = session.inventory().len(),
        "final state"
    );
    Ok(summary)
}
