//! Error types for the autoplay runner.
//!
//! Decision failures ([`RunnerError::LlmBackend`], [`RunnerError::Timeout`],
//! [`RunnerError::Parse`]) never stop the loop; the autoplay controller
//! turns them into a fallback move. The rest surface to `main`.

use wander_core::SessionError;

/// Errors that can occur while running a game.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// The decision service returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The decision service's reply could not be used.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The decision deadline passed before a reply arrived.
    #[error("timeout: decision exceeded deadline")]
    Timeout,

    /// A runner environment variable is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// The game session failed in a way autoplay cannot absorb.
    #[error(transparent)]
    Session(#[from] SessionError),
}
