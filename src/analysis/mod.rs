//! Analysis collaborator
//!
//! Turns simulation metrics into natural-language design feedback. When no
//! analyst is reachable, `synthesize_feedback` produces templated observations
//! for the mission profile.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{MissionProfile, SimulationSource, StabilityMetrics};
use crate::error::CollaboratorError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::{AnalysisPromptContext, PromptRenderer, templates};

pub const CLOSING_LINE: &str = "Re-run the simulation after applying these changes.";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub mission_prompt: String,
    pub iteration: u32,
    pub metrics: StabilityMetrics,
    pub source: SimulationSource,
}

impl AnalysisRequest {
    fn source_label(&self) -> String {
        match &self.source {
            SimulationSource::Process { backend } => format!("physics engine ({})", backend),
            SimulationSource::Synthetic => "synthetic estimate".to_string(),
        }
    }
}

#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, CollaboratorError>;
}

pub struct LlmAnalyst {
    client: Arc<dyn LlmClient>,
    renderer: Arc<PromptRenderer>,
    max_tokens: u32,
}

impl LlmAnalyst {
    pub fn new(client: Arc<dyn LlmClient>, renderer: Arc<PromptRenderer>) -> Self {
        Self {
            client,
            renderer,
            max_tokens: 1024,
        }
    }

    fn build_request(&self, request: &AnalysisRequest) -> Result<CompletionRequest, CollaboratorError> {
        let source = request.source_label();
        let ctx = AnalysisPromptContext {
            mission_prompt: &request.mission_prompt,
            iteration: request.iteration,
            source: &source,
            metrics: &request.metrics,
        };
        let render = |name: &str| {
            self.renderer
                .render_named(name, &ctx)
                .map_err(|e| CollaboratorError::Configuration(e.to_string()))
        };

        Ok(CompletionRequest::new(render(templates::ANALYSIS_SYSTEM)?)
            .with_user_message(render(templates::ANALYSIS_USER)?)
            .with_max_tokens(self.max_tokens))
    }
}

#[async_trait]
impl Analyst for LlmAnalyst {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, CollaboratorError> {
        let completion = self.build_request(request)?;
        let response = self.client.complete(completion).await?;

        let feedback = response.content.trim();
        if feedback.is_empty() {
            return Err(CollaboratorError::InvalidResponse("analyst returned no feedback".to_string()));
        }
        Ok(feedback.to_string())
    }
}

/// Deterministic feedback: two profile observations, at most one metric
/// observation, then `CLOSING_LINE`.
pub fn synthesize_feedback(mission_prompt: &str, metrics: &StabilityMetrics) -> String {
    let profile = MissionProfile::classify_for_metrics(mission_prompt);
    let mut observations: Vec<&str> = match profile {
        MissionProfile::Racing => vec![
            "Shorten the arms by about 10% to cut rotational inertia and sharpen roll response.",
            "Lower the fuselage profile to reduce frontal drag at speed.",
        ],
        MissionProfile::HeavyLift => vec![
            "Increase arm radius by 2mm to stiffen the frame under payload.",
            "Move the payload mount closer to the centre of mass to limit pitch coupling.",
        ],
        _ => vec![
            "Balance component placement so the centre of mass sits under the fuselage centre.",
            "Widen the motor mounts slightly to spread thrust loads into the arms.",
        ],
    };

    let stability = metrics.stability_score();
    let acceleration = metrics.max_acceleration();
    if stability < 0.85 {
        observations.push("Stability is below target; add cross-bracing between adjacent arms to damp oscillation.");
    } else if acceleration > 10.0 {
        observations.push("Peak acceleration is high; reduce arm mass or soften the thrust response.");
    }

    let mut feedback = String::new();
    for (i, observation) in observations.iter().enumerate() {
        feedback.push_str(&format!("{}. {}\n", i + 1, observation));
    }
    feedback.push_str(CLOSING_LINE);
    feedback
}
