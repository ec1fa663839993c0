//! LLM backends for the decision service.
//!
//! Enum dispatch over an OpenAI-compatible chat completions backend and
//! the Anthropic Messages API. Both send the rendered prompt over HTTP via
//! `reqwest` and hand back the raw reply text for [`crate::parse`].

use serde_json::{Value, json};

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

/// Upper bound on reply length. A decision is a short JSON object.
const MAX_TOKENS: u32 = 256;

/// An LLM backend that turns a prompt into reply text.
///
/// Enum dispatch keeps `complete` a plain `async fn`.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Send a prompt and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] if the HTTP call fails, the
    /// status is not a success, or the reply has no text.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Anthropic(backend) => backend.complete(prompt).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

/// POST a JSON body and return the JSON reply, mapping every failure to
/// [`RunnerError::LlmBackend`] tagged with `label`.
async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
    label: &str,
) -> Result<Value, RunnerError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("{label} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_unreadable| "unable to read error body".to_owned());
        return Err(RunnerError::LlmBackend(format!("{label} returned {status}: {error_body}")));
    }

    response
        .json()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("{label} response parse failed: {e}")))
}

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`. The bearer header is
/// omitted when no key is configured, which local servers expect.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn body(&self, prompt: &RenderedPrompt) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": 0.7,
            "max_tokens": MAX_TOKENS,
            "stream": false
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let mut request = self.client.post(format!("{}/chat/completions", self.api_url));
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }
        let json = post_json(request, &self.body(prompt), "OpenAI").await?;
        extract_openai_content(&json)
    }
}

/// Extract the text content from a chat completions response.
fn extract_openai_content(json: &Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| RunnerError::LlmBackend("OpenAI response missing choices[0].message.content".to_owned()))
}

/// Backend for the Anthropic Messages API.
///
/// The system prompt is a top-level field, auth uses `x-api-key`, and the
/// reply text sits at `content[0].text`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn body(&self, prompt: &RenderedPrompt) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, RunnerError> {
        let request = self
            .client
            .post(format!("{}/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let json = post_json(request, &self.body(prompt), "Anthropic").await?;
        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &Value) -> Result<String, RunnerError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| RunnerError::LlmBackend("Anthropic response missing content[0].text".to_owned()))
}

/// Create an LLM backend from configuration.
pub fn create_backend(config: &LlmBackendConfig) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
    }
}
