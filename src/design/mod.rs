//! Design collaborator
//!
//! A `DesignGenerator` turns the mission prompt plus whatever the previous
//! iteration learned into an assembly script. `LlmDesigner` asks a language
//! model; `TemplateDesigner` emits a deterministic preset airframe and is used
//! when no model is configured and offline designs are allowed.

pub mod script;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{MissionProfile, WorkflowState};
use crate::error::CollaboratorError;
use crate::geometry::GeometricModel;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::{DesignPromptContext, PromptRenderer, templates};

/// Prefix of placeholder API keys that force offline designs
pub const MOCK_KEY_PREFIX: &str = "sk-or-v1-mock";

const TRUNCATION_MARKER: &str = "\n# ... truncated";

/// Bounds on how much prior state is sent to the designer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_artifact_chars: usize,
    pub max_prior_errors: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_artifact_chars: 6000,
            max_prior_errors: 5,
        }
    }
}

/// Everything a designer may look at for one call
#[derive(Debug, Clone, PartialEq)]
pub struct DesignRequest {
    pub mission_prompt: String,
    /// Iteration being designed (already incremented)
    pub iteration: u32,
    pub feedback: Option<String>,
    pub prior_artifact: Option<String>,
    pub prior_errors: Vec<String>,
}

impl DesignRequest {
    /// Snapshot the bounded design context from `state`
    pub fn from_state(state: &WorkflowState, limits: &ContextLimits) -> Self {
        let prior_artifact = state
            .artifact
            .as_deref()
            .map(|a| truncate_chars(a, limits.max_artifact_chars));

        let skip = state.errors.len().saturating_sub(limits.max_prior_errors);
        let prior_errors = state.errors[skip..].iter().map(|e| e.message.clone()).collect();

        Self {
            mission_prompt: state.mission_prompt.clone(),
            iteration: state.iteration,
            feedback: state.feedback.clone(),
            prior_artifact,
            prior_errors,
        }
    }

    pub fn is_first(&self) -> bool {
        self.iteration <= 1
    }

    pub fn profile(&self) -> MissionProfile {
        MissionProfile::classify(&self.mission_prompt)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

#[async_trait]
pub trait DesignGenerator: Send + Sync {
    /// Produce an artifact; exactly one attempt, no internal retries
    async fn generate(&self, request: &DesignRequest) -> Result<String, CollaboratorError>;
}

/// Remove a surrounding markdown code fence, if any
pub fn strip_fences(text: &str) -> String {
    let Some(start) = text.find("```") else {
        return text.trim().to_string();
    };
    let after_open = &text[start + 3..];
    // Skip the info string (e.g. ```aeroforge)
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
    let body = &after_open[body_start..];
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim().to_string()
}

/// Language-model backed designer
pub struct LlmDesigner {
    client: Arc<dyn LlmClient>,
    renderer: Arc<PromptRenderer>,
    max_tokens: u32,
}

impl LlmDesigner {
    pub fn new(client: Arc<dyn LlmClient>, renderer: Arc<PromptRenderer>) -> Self {
        Self {
            client,
            renderer,
            max_tokens: 4096,
        }
    }

    fn build_request(&self, request: &DesignRequest) -> Result<CompletionRequest, CollaboratorError> {
        let ctx = DesignPromptContext {
            mission_prompt: &request.mission_prompt,
            iteration: request.iteration,
            previous_iteration: request.iteration.saturating_sub(1),
            feedback: request.feedback.as_deref(),
            prior_artifact: request.prior_artifact.as_deref(),
            prior_errors: &request.prior_errors,
        };
        let template = if request.is_first() {
            templates::DESIGN_INITIAL
        } else {
            templates::DESIGN_REVISE
        };

        let render = |name: &str| {
            self.renderer
                .render_named(name, &ctx)
                .map_err(|e| CollaboratorError::Configuration(e.to_string()))
        };

        Ok(CompletionRequest::new(render(templates::DESIGN_SYSTEM)?)
            .with_user_message(render(template)?)
            .with_max_tokens(self.max_tokens))
    }
}

#[async_trait]
impl DesignGenerator for LlmDesigner {
    async fn generate(&self, request: &DesignRequest) -> Result<String, CollaboratorError> {
        let completion = self.build_request(request)?;
        let response = self.client.complete(completion).await?;

        let artifact = strip_fences(&response.content);
        if artifact.is_empty() {
            return Err(CollaboratorError::InvalidResponse("designer returned no script".to_string()));
        }
        log::info!("designer produced {} chars for iteration {}", artifact.len(), request.iteration);
        Ok(artifact)
    }
}

/// Deterministic designer that emits the preset airframe for the mission
/// profile and iteration.
#[derive(Debug, Clone, Default)]
pub struct TemplateDesigner;

impl TemplateDesigner {
    pub fn new() -> Self {
        Self
    }

    pub fn template(profile: MissionProfile, iteration: u32) -> String {
        format!(
            "# {} airframe template, iteration {}\n{}",
            profile.label(),
            iteration,
            GeometricModel::preset(profile, iteration).to_script()
        )
    }
}

#[async_trait]
impl DesignGenerator for TemplateDesigner {
    async fn generate(&self, request: &DesignRequest) -> Result<String, CollaboratorError> {
        Ok(Self::template(request.profile(), request.iteration))
    }
}

/// Whether template designs may stand in for a missing designer.
///
/// True when configured, when `DEMO_MODE=true`, or when the API key is a
/// mock placeholder.
pub fn offline_designs_enabled(configured: bool, api_key: Option<&str>) -> bool {
    offline_designs_from(configured, std::env::var("DEMO_MODE").ok().as_deref(), api_key)
}

fn offline_designs_from(configured: bool, demo_mode: Option<&str>, api_key: Option<&str>) -> bool {
    configured
        || demo_mode.is_some_and(|v| v.eq_ignore_ascii_case("true"))
        || api_key.is_some_and(|k| k.starts_with(MOCK_KEY_PREFIX))
}
