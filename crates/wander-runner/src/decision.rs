//! Sources of autoplay decisions.
//!
//! [`DecisionSource`] is the seam the autoplay loop talks to. The loop
//! owns deadlines and fallbacks; a source only has to answer or fail.

use std::future::Future;
use std::time::Instant;

use tracing::{debug, info};
use wander_types::{Decision, DecisionRequest};

use crate::error::RunnerError;
use crate::llm::LlmBackend;
use crate::parse::parse_decision;
use crate::prompt::PromptEngine;

/// Something that picks the next action for a game state.
pub trait DecisionSource: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Choose an action for `request`.
    fn decide(&self, request: &DecisionRequest) -> impl Future<Output = Result<Decision, RunnerError>> + Send;
}

/// Asks an LLM: render the prompt, call the backend, parse the reply.
pub struct LlmDecisionSource {
    prompts: PromptEngine,
    backend: LlmBackend,
}

impl LlmDecisionSource {
    /// Combine a prompt engine and a backend.
    pub const fn new(prompts: PromptEngine, backend: LlmBackend) -> Self {
        Self { prompts, backend }
    }
}

impl DecisionSource for LlmDecisionSource {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<Decision, RunnerError> {
        let prompt = self.prompts.render(request)?;

        let start = Instant::now();
        let raw_response = self.backend.complete(&prompt).await?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(backend = self.backend.name(), latency_ms, raw_response = %raw_response, "decision reply");

        let decision = parse_decision(&raw_response);
        info!(
            at = %request.current_biome,
            action = ?decision.action,
            item_index = ?decision.item_index,
            reasoning = %decision.reasoning,
            latency_ms,
            "decision parsed"
        );
        Ok(decision)
    }
}

/// Always moves. Used when no decision service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOnly;

impl DecisionSource for WalkOnly {
    fn name(&self) -> &str {
        "walk-only"
    }

    async fn decide(&self, _request: &DecisionRequest) -> Result<Decision, RunnerError> {
        Ok(Decision::moving("No decision service configured"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wander_types::DecisionAction;

    use super::*;
    use crate::config::{BackendType, LlmBackendConfig};
    use crate::llm::create_backend;

    fn request() -> DecisionRequest {
        DecisionRequest {
            current_biome: "Forest".to_owned(),
            current_variant: "Lush".to_owned(),
            transitions: Vec::new(),
            inventory: Vec::new(),
            entropy_level: 0.0,
            entropy_max: 100.0,
            discovered_biomes: vec!["Forest".to_owned()],
            active_effects: Vec::new(),
            goal: "Find the Gateway".to_owned(),
        }
    }

    #[tokio::test]
    async fn walk_only_always_moves() {
        let decision = WalkOnly.decide(&request()).await.unwrap();
        assert_eq!(decision.action, DecisionAction::Move);
        assert_eq!(WalkOnly.name(), "walk-only");
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error() {
        let backend = create_backend(&LlmBackendConfig {
            backend_type: BackendType::OpenAi,
            // Port 9 (discard) on loopback refuses connections.
            api_url: "http://127.0.0.1:9/v1".to_owned(),
            api_key: String::new(),
            model: "none".to_owned(),
        });
        let source = LlmDecisionSource::new(PromptEngine::new(None).unwrap(), backend);
        let result = source.decide(&request()).await;
        assert!(matches!(result, Err(RunnerError::LlmBackend(_))));
    }
}
