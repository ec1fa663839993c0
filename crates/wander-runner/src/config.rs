//! Runner configuration loaded from environment variables.
//!
//! Game rules live in `wander-config.yaml` (see [`wander_core::GameConfig`]);
//! this module only covers how the runner reaches a decision service and
//! paces the autoplay loop.

use std::str::FromStr;
use std::time::Duration;

use crate::error::RunnerError;

/// Default path of the game configuration file.
pub const DEFAULT_GAME_CONFIG: &str = "wander-config.yaml";

/// Complete runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path to the YAML game configuration.
    pub game_config_path: String,
    /// Decision service backend. `None` walks without asking anyone.
    pub backend: Option<LlmBackendConfig>,
    /// Maximum time allowed for one decision (HTTP call + parsing).
    pub decision_timeout: Duration,
    /// Pause between turns.
    pub autoplay_interval: Duration,
    /// Extra pause after a failed or timed-out decision.
    pub retry_backoff: Duration,
    /// Stop after this many steps.
    pub max_steps: u64,
    /// Directory overriding the embedded prompt templates.
    pub templates_dir: Option<String>,
    /// Objective sent to the decision service, overriding the config file.
    pub goal: Option<String>,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `http://localhost:1234/v1`).
    pub api_url: String,
    /// API key. Local inference servers usually accept an empty one.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions (`OpenAI`, `DeepSeek`, Ollama, LM Studio).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl FromStr for BackendType {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" | "lmstudio" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from the process environment.
    ///
    /// Variables (all optional):
    /// - `WANDER_CONFIG` -- game config path (default `wander-config.yaml`)
    /// - `LLM_BACKEND` -- `openai`, `ollama`, `anthropic`, ...; unset walks without decisions
    /// - `LLM_API_URL` -- required when `LLM_BACKEND` is set
    /// - `LLM_API_KEY` -- API key (default empty)
    /// - `LLM_MODEL` -- required when `LLM_BACKEND` is set
    /// - `DECISION_TIMEOUT_MS` -- decision deadline (default 7000)
    /// - `AUTOPLAY_INTERVAL_MS` -- pause between turns (default 500)
    /// - `RETRY_BACKOFF_MS` -- extra pause after a failed decision (default 2000)
    /// - `MAX_STEPS` -- step limit (default 500)
    /// - `TEMPLATES_DIR` -- prompt template override directory
    /// - `WANDER_GOAL` -- objective override
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RunnerError> {
        let game_config_path = lookup("WANDER_CONFIG").unwrap_or_else(|| DEFAULT_GAME_CONFIG.to_owned());
        let backend = load_backend_config(&lookup)?;

        let decision_timeout_ms: u64 = parse_or(&lookup, "DECISION_TIMEOUT_MS", 7000)?;
        let autoplay_interval_ms: u64 = parse_or(&lookup, "AUTOPLAY_INTERVAL_MS", 500)?;
        let retry_backoff_ms: u64 = parse_or(&lookup, "RETRY_BACKOFF_MS", 2000)?;
        let max_steps: u64 = parse_or(&lookup, "MAX_STEPS", 500)?;
        if decision_timeout_ms == 0 {
            return Err(RunnerError::Config("DECISION_TIMEOUT_MS must be positive".to_owned()));
        }

        Ok(Self {
            game_config_path,
            backend,
            decision_timeout: Duration::from_millis(decision_timeout_ms),
            autoplay_interval: Duration::from_millis(autoplay_interval_ms),
            retry_backoff: Duration::from_millis(retry_backoff_ms),
            max_steps,
            templates_dir: lookup("TEMPLATES_DIR").filter(|dir| !dir.trim().is_empty()),
            goal: lookup("WANDER_GOAL").filter(|goal| !goal.trim().is_empty()),
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, RunnerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid {name}: {e}")))
    })
}

/// Read a variable that must be present once a backend is chosen.
fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, RunnerError> {
    lookup(name).ok_or_else(|| RunnerError::Config(format!("missing required env var {name}")))
}

/// Load the backend from the `LLM_*` variables, if `LLM_BACKEND` is set.
fn load_backend_config(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<LlmBackendConfig>, RunnerError> {
    let Some(backend_str) = lookup("LLM_BACKEND") else {
        return Ok(None);
    };
    let backend_type: BackendType = backend_str.parse()?;
    let api_url = required(lookup, "LLM_API_URL")?;
    let model = required(lookup, "LLM_MODEL")?;
    let api_key = lookup("LLM_API_KEY").unwrap_or_default();

    Ok(Some(LlmBackendConfig {
        backend_type,
        api_url: api_url.trim_end_matches('/').to_owned(),
        api_key,
        model,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<RunnerConfig, RunnerError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        RunnerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_any_variables() {
        let config = load(&[]).unwrap();
        assert_eq!(config.game_config_path, DEFAULT_GAME_CONFIG);
        assert!(config.backend.is_none());
        assert_eq!(config.decision_timeout, Duration::from_millis(7000));
        assert_eq!(config.autoplay_interval, Duration::from_millis(500));
        assert_eq!(config.retry_backoff, Duration::from_millis(2000));
        assert_eq!(config.max_steps, 500);
        assert!(config.templates_dir.is_none());
        assert!(config.goal.is_none());
    }

    #[test]
    fn backend_type_parsing() {
        assert_eq!("Ollama".parse::<BackendType>().unwrap(), BackendType::OpenAi);
        assert_eq!("claude".parse::<BackendType>().unwrap(), BackendType::Anthropic);
        assert!("carrier-pigeon".parse::<BackendType>().is_err());
    }

    #[test]
    fn backend_loads_and_trims_url() {
        let config = load(&[
            ("LLM_BACKEND", "openai"),
            ("LLM_API_URL", "http://localhost:1234/v1/"),
            ("LLM_MODEL", "local-model"),
        ])
        .unwrap();
        let backend = config.backend.unwrap();
        assert_eq!(backend.backend_type, BackendType::OpenAi);
        assert_eq!(backend.api_url, "http://localhost:1234/v1");
        assert!(backend.api_key.is_empty());
    }

    #[test]
    fn backend_without_model_is_rejected() {
        let result = load(&[("LLM_BACKEND", "anthropic"), ("LLM_API_URL", "https://api.anthropic.com/v1")]);
        assert!(matches!(result, Err(RunnerError::Config(_))));
    }

    #[test]
    fn numeric_overrides_and_bad_values() {
        let config = load(&[("MAX_STEPS", "25"), ("AUTOPLAY_INTERVAL_MS", "0")]).unwrap();
        assert_eq!(config.max_steps, 25);
        assert_eq!(config.autoplay_interval, Duration::ZERO);

        assert!(load(&[("DECISION_TIMEOUT_MS", "soon")]).is_err());
        assert!(load(&[("DECISION_TIMEOUT_MS", "0")]).is_err());
    }

    #[test]
    fn blank_goal_is_ignored() {
        let config = load(&[("WANDER_GOAL", "  "), ("TEMPLATES_DIR", "prompts")]).unwrap();
        assert!(config.goal.is_none());
        assert_eq!(config.templates_dir.as_deref(), Some("prompts"));
    }
}
