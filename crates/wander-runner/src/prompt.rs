//! Prompt rendering via `minijinja`.
//!
//! Two templates make up a prompt: `system.j2` frames the game and the
//! reply format, `decision.j2` renders one [`DecisionRequest`]. Defaults
//! are compiled in; a templates directory can override either file so
//! operators can tune prompts without recompiling.

use std::path::Path;

use minijinja::Environment;
use wander_types::DecisionRequest;

use crate::error::RunnerError;

const SYSTEM_TEMPLATE: &str = include_str!("../templates/system.j2");
const DECISION_TEMPLATE: &str = include_str!("../templates/decision.j2");

/// Renders decision requests into prompts.
pub struct PromptEngine {
    env: Environment<'static>,
}

/// A rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message: the rules and the reply format.
    pub system: String,
    /// User message: the current game state.
    pub user: String,
}

impl PromptEngine {
    /// Create an engine from the embedded templates, overriding each one
    /// that exists in `templates_dir`.
    pub fn new(templates_dir: Option<&str>) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, file, fallback) in [
            ("system", "system.j2", SYSTEM_TEMPLATE),
            ("decision", "decision.j2", DECISION_TEMPLATE),
        ] {
            let source = match templates_dir.map(|dir| Path::new(dir).join(file)) {
                Some(path) if path.exists() => load_template(&path)?,
                _ => fallback.to_owned(),
            };
            env.add_template_owned(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Render the prompt for one decision.
    pub fn render(&self, request: &DecisionRequest) -> Result<RenderedPrompt, RunnerError> {
        Ok(RenderedPrompt {
            system: self.render_one("system", request)?,
            user: self.render_one("decision", request)?,
        })
    }

    fn render_one(&self, name: &str, request: &DecisionRequest) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(request)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(path: &Path) -> Result<String, RunnerError> {
    std::fs::read_to_string(path)
        .map_err(|e| RunnerError::Template(format!("failed to read {}: {e}", path.display())))
}
