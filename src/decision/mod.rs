//! Decision collaborator and termination policy

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Decision, StabilityMetrics, WorkflowState};
use crate::error::CollaboratorError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::{DecisionPromptContext, PromptRenderer, templates};

/// Hard upper bound on design iterations per mission
pub const MAX_ITERATIONS: u32 = 4;
/// The heuristic never finishes before this many iterations
pub const MIN_ITERATIONS: u32 = 2;

pub const STABILITY_TARGET: f64 = 0.85;
pub const ACCELERATION_LIMIT: f64 = 10.0;
pub const DRIFT_LIMIT: f64 = 0.5;

/// Which errors the heuristic considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorScope {
    /// Every error recorded during the mission
    #[default]
    Mission,
    /// Only errors recorded during the current iteration
    Iteration,
}

/// Heuristic floor and error scoping applied by the decision stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionPolicy {
    pub min_iterations: u32,
    pub error_scope: ErrorScope,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            min_iterations: MIN_ITERATIONS,
            error_scope: ErrorScope::default(),
        }
    }
}

impl DecisionPolicy {
    /// Error messages visible under the configured scope
    pub fn scoped_errors(&self, state: &WorkflowState) -> Vec<String> {
        match self.error_scope {
            ErrorScope::Mission => state.errors.iter().map(|e| e.message.clone()).collect(),
            ErrorScope::Iteration => state
                .errors_for_iteration(state.iteration)
                .map(|e| e.message.clone())
                .collect(),
        }
    }

    /// Deterministic fallback decision
    pub fn heuristic(&self, iteration: u32, metrics: &StabilityMetrics, has_errors: bool) -> Decision {
        if iteration < self.min_iterations
            || metrics.stability_score() < STABILITY_TARGET
            || metrics.max_acceleration() > ACCELERATION_LIMIT
            || metrics.position_drift() > DRIFT_LIMIT
            || has_errors
        {
            Decision::Iterate
        } else {
            Decision::Finish
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRequest {
    pub mission_prompt: String,
    pub iteration: u32,
    pub metrics: StabilityMetrics,
    pub feedback: Option<String>,
    pub errors: Vec<String>,
}

#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, request: &DecisionRequest) -> Result<Decision, CollaboratorError>;
}

pub struct LlmOracle {
    client: Arc<dyn LlmClient>,
    renderer: Arc<PromptRenderer>,
}

impl LlmOracle {
    pub fn new(client: Arc<dyn LlmClient>, renderer: Arc<PromptRenderer>) -> Self {
        Self { client, renderer }
    }
}

#[async_trait]
impl DecisionOracle for LlmOracle {
    async fn decide(&self, request: &DecisionRequest) -> Result<Decision, CollaboratorError> {
        let ctx = DecisionPromptContext {
            mission_prompt: &request.mission_prompt,
            iteration: request.iteration,
            metrics: &request.metrics,
            feedback: request.feedback.as_deref(),
            errors: &request.errors,
        };
        let render = |name: &str| {
            self.renderer
                .render_named(name, &ctx)
                .map_err(|e| CollaboratorError::Configuration(e.to_string()))
        };
        let completion = CompletionRequest::new(render(templates::DECISION_SYSTEM)?)
            .with_user_message(render(templates::DECISION_USER)?)
            .with_max_tokens(16);

        let response = self.client.complete(completion).await?;
        Decision::parse(&response.content).ok_or_else(|| {
            CollaboratorError::InvalidResponse(format!("expected 'iterate' or 'finish', got '{}'", response.content.trim()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StageKind;
    use crate::domain::metrics::{MAX_ACCELERATION, POSITION_DRIFT, STABILITY_SCORE};
    use crate::llm::MockLlmClient;

    fn good() -> StabilityMetrics {
        StabilityMetrics::new()
            .with(STABILITY_SCORE, 0.9)
            .with(MAX_ACCELERATION, 8.0)
            .with(POSITION_DRIFT, 0.3)
    }

    fn request() -> DecisionRequest {
        DecisionRequest {
            mission_prompt: "A survey drone".to_string(),
            iteration: 2,
            metrics: good(),
            feedback: Some("Looks solid".to_string()),
            errors: vec!["Syntax error: line 4: unknown shape 'cone'".to_string()],
        }
    }

    #[test]
    fn test_heuristic_truth_table() {
        let policy = DecisionPolicy::default();
        assert_eq!(policy.heuristic(1, &good(), false), Decision::Iterate);
        assert_eq!(policy.heuristic(2, &good(), false), Decision::Finish);
        assert_eq!(
            policy.heuristic(2, &good().with(STABILITY_SCORE, 0.84), false),
            Decision::Iterate
        );
        assert_eq!(
            policy.heuristic(2, &good().with(MAX_ACCELERATION, 10.5), false),
            Decision::Iterate
        );
        assert_eq!(
            policy.heuristic(2, &good().with(POSITION_DRIFT, 0.6), false),
            Decision::Iterate
        );
        assert_eq!(policy.heuristic(3, &good(), true), Decision::Iterate);
    }

    #[test]
    fn test_heuristic_boundaries_finish() {
        let metrics = StabilityMetrics::new()
            .with(STABILITY_SCORE, 0.85)
            .with(MAX_ACCELERATION, 10.0)
            .with(POSITION_DRIFT, 0.5);
        assert_eq!(DecisionPolicy::default().heuristic(2, &metrics, false), Decision::Finish);
    }

    #[test]
    fn test_heuristic_missing_metrics_iterates() {
        assert_eq!(
            DecisionPolicy::default().heuristic(3, &StabilityMetrics::new(), false),
            Decision::Iterate
        );
    }

    #[test]
    fn test_scoped_errors() {
        let mut state = WorkflowState::new("prompt");
        state.iteration = 1;
        state.record_error(StageKind::Design, "old");
        state.iteration = 2;

        let mission = DecisionPolicy::default();
        assert_eq!(mission.scoped_errors(&state), vec!["old"]);

        let per_iteration = DecisionPolicy {
            error_scope: ErrorScope::Iteration,
            ..DecisionPolicy::default()
        };
        assert!(per_iteration.scoped_errors(&state).is_empty());
    }

    #[test]
    fn test_error_scope_deserializes_lowercase() {
        let scope: ErrorScope = serde_yaml::from_str("iteration").unwrap();
        assert_eq!(scope, ErrorScope::Iteration);
    }

    #[tokio::test]
    async fn test_llm_oracle_accepts_exact_word() {
        let mock = Arc::new(MockLlmClient::with_text(" Finish \n"));
        let oracle = LlmOracle::new(mock.clone(), Arc::new(PromptRenderer::with_builtins().unwrap()));
        assert_eq!(oracle.decide(&request()).await.unwrap(), Decision::Finish);

        let user = mock.requests()[0].last_user_message().unwrap().to_string();
        assert!(user.starts_with("DECISION NEEDED - Iteration 2"));
        assert!(user.contains("- Syntax error: line 4"));
        assert!(user.contains("Looks solid"));
    }

    #[tokio::test]
    async fn test_llm_oracle_rejects_prose() {
        let mock = Arc::new(MockLlmClient::with_text("I think we should iterate."));
        let oracle = LlmOracle::new(mock, Arc::new(PromptRenderer::with_builtins().unwrap()));
        let err = oracle.decide(&request()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
    }
}
