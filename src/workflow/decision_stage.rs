//! Decision stage: hard stops, then the oracle, then the heuristic

use std::sync::Arc;

use crate::decision::{DecisionOracle, DecisionPolicy, DecisionRequest};
use crate::domain::{Decision, Status, WorkflowState};

pub struct DecisionStage {
    oracle: Arc<dyn DecisionOracle>,
    policy: DecisionPolicy,
}

impl DecisionStage {
    pub fn new(oracle: Arc<dyn DecisionOracle>) -> Self {
        Self {
            oracle,
            policy: DecisionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn decide(&self, state: &mut WorkflowState, max_iterations: u32) -> Decision {
        if state.iteration >= max_iterations {
            state.status = Status::Complete;
            state.push_log(format!("Reached iteration limit ({})", max_iterations));
            return Decision::Finish;
        }

        // The fatal scan always covers the whole mission
        if state.has_fatal_error() {
            state.status = Status::Failed;
            state.push_log("Fatal error recorded, stopping");
            return Decision::Finish;
        }

        let errors = self.policy.scoped_errors(state);
        let request = DecisionRequest {
            mission_prompt: state.mission_prompt.clone(),
            iteration: state.iteration,
            metrics: state.simulation_metrics.clone(),
            feedback: state.feedback.clone(),
            errors,
        };

        let decision = match self.oracle.decide(&request).await {
            Ok(decision) => decision,
            Err(e) => {
                log::warn!("decision oracle unavailable ({}), using heuristic", e);
                self.policy
                    .heuristic(state.iteration, &state.simulation_metrics, !request.errors.is_empty())
            }
        };

        if decision == Decision::Finish {
            state.status = Status::Complete;
        }
        state.push_log(format!("Decision: {}", decision));
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{ErrorScope, MAX_ITERATIONS};
    use crate::domain::StageKind;
    use crate::domain::metrics::{MAX_ACCELERATION, POSITION_DRIFT, STABILITY_SCORE};
    use crate::domain::StabilityMetrics;
    use crate::error::CollaboratorError;
    use crate::workflow::testing::ScriptedOracle;

    fn unavailable() -> Arc<ScriptedOracle> {
        Arc::new(ScriptedOracle::new(vec![Err(CollaboratorError::Configuration(
            "no key".to_string(),
        ))]))
    }

    fn good_state(iteration: u32) -> WorkflowState {
        let mut state = WorkflowState::new("A survey drone");
        state.iteration = iteration;
        state.status = Status::Analyzing;
        state.simulation_metrics = StabilityMetrics::new()
            .with(STABILITY_SCORE, 0.95)
            .with(MAX_ACCELERATION, 8.0)
            .with(POSITION_DRIFT, 0.2);
        state
    }

    #[tokio::test]
    async fn test_iteration_limit_wins_over_everything() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(Decision::Iterate)]));
        let stage = DecisionStage::new(oracle);
        let mut state = WorkflowState::new("A survey drone");
        state.iteration = MAX_ITERATIONS;
        state.record_error(StageKind::Design, "Fatal error: kernel crashed");

        assert_eq!(stage.decide(&mut state, MAX_ITERATIONS).await, Decision::Finish);
        assert_eq!(state.status, Status::Complete);
    }

    #[tokio::test]
    async fn test_fatal_error_fails_mission() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(Decision::Iterate)]));
        let stage = DecisionStage::new(oracle);
        let mut state = good_state(1);
        state.record_error(StageKind::Design, "Designer failed: FATAL: quota revoked");

        assert_eq!(stage.decide(&mut state, MAX_ITERATIONS).await, Decision::Finish);
        assert_eq!(state.status, Status::Failed);
    }

    #[tokio::test]
    async fn test_oracle_answer_is_used() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(Decision::Finish)]));
        let mut state = good_state(1);

        let decision = DecisionStage::new(oracle).decide(&mut state, MAX_ITERATIONS).await;

        // the heuristic would have iterated at iteration 1
        assert_eq!(decision, Decision::Finish);
        assert_eq!(state.status, Status::Complete);
    }

    #[tokio::test]
    async fn test_iterate_leaves_status_unchanged() {
        let mut state = good_state(1);
        let decision = DecisionStage::new(unavailable()).decide(&mut state, MAX_ITERATIONS).await;
        assert_eq!(decision, Decision::Iterate);
        assert_eq!(state.status, Status::Analyzing);
    }

    #[tokio::test]
    async fn test_heuristic_finishes_good_design() {
        let mut state = good_state(2);
        let decision = DecisionStage::new(unavailable()).decide(&mut state, MAX_ITERATIONS).await;
        assert_eq!(decision, Decision::Finish);
        assert_eq!(state.status, Status::Complete);
    }

    #[tokio::test]
    async fn test_mission_scope_remembers_old_errors() {
        let mut state = good_state(1);
        state.record_error(StageKind::Design, "Syntax error: line 1: unknown statement 'x'");
        state.iteration = 2;

        let decision = DecisionStage::new(unavailable()).decide(&mut state, MAX_ITERATIONS).await;
        assert_eq!(decision, Decision::Iterate);
    }

    #[tokio::test]
    async fn test_iteration_scope_forgets_old_errors() {
        let mut state = good_state(1);
        state.record_error(StageKind::Design, "Syntax error: line 1: unknown statement 'x'");
        state.iteration = 2;

        let policy = DecisionPolicy {
            error_scope: ErrorScope::Iteration,
            ..DecisionPolicy::default()
        };
        let decision = DecisionStage::new(unavailable())
            .with_policy(policy)
            .decide(&mut state, MAX_ITERATIONS)
            .await;
        assert_eq!(decision, Decision::Finish);
        // the log itself is never cleared
        assert_eq!(state.errors.len(), 1);
    }
}
