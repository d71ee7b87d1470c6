//! Mission controller - sequences design, evaluation and decision
//!
//! Each iteration runs the three stages in order and publishes the state
//! after every stage. The loop ends on a `finish` decision, on cancellation
//! or when the iteration budget is used up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::decision::MAX_ITERATIONS;
use crate::domain::{Decision, StageKind, Status, WorkflowState};
use crate::id::iteration_dir_name;

use super::decision_stage::DecisionStage;
use super::design_stage::DesignStage;
use super::evaluation_stage::EvaluationStage;

/// Per-mission settings and handles
#[derive(Debug, Clone)]
pub struct MissionContext {
    pub mission_id: String,
    /// Root under which `<mission_id>/iteration-NN/` directories are created
    pub output_root: PathBuf,
    pub max_iterations: u32,
    pub cancel: CancellationToken,
}

impl MissionContext {
    pub fn new(mission_id: impl Into<String>, output_root: impl AsRef<Path>) -> Self {
        Self {
            mission_id: mission_id.into(),
            output_root: output_root.as_ref().to_path_buf(),
            max_iterations: MAX_ITERATIONS,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn mission_dir(&self) -> PathBuf {
        self.output_root.join(&self.mission_id)
    }

    pub fn iteration_dir(&self, iteration: u32) -> PathBuf {
        self.mission_dir().join(iteration_dir_name(iteration))
    }
}

/// Terminal result of a mission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionOutcome {
    /// Design approved or iteration budget used up
    Complete,
    /// A fatal error was recorded
    Failed(String),
    /// Stopped by the caller
    Cancelled,
}

impl MissionOutcome {
    fn from_state(state: &WorkflowState) -> Self {
        match state.status {
            Status::Failed => MissionOutcome::Failed(
                state
                    .errors
                    .iter()
                    .rev()
                    .find(|e| e.message.to_lowercase().contains("fatal"))
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "mission failed".to_string()),
            ),
            Status::Cancelled => MissionOutcome::Cancelled,
            _ => MissionOutcome::Complete,
        }
    }
}

/// Receives a snapshot after every stage
#[async_trait]
pub trait StateObserver: Send + Sync {
    async fn publish(&self, mission_id: &str, state: &WorkflowState);
}

pub struct Controller {
    design: DesignStage,
    evaluation: EvaluationStage,
    decision: DecisionStage,
    observer: Option<Arc<dyn StateObserver>>,
}

impl Controller {
    pub fn new(design: DesignStage, evaluation: EvaluationStage, decision: DecisionStage) -> Self {
        Self {
            design,
            evaluation,
            decision,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    async fn publish(&self, ctx: &MissionContext, state: &WorkflowState) {
        if let Some(observer) = &self.observer {
            observer.publish(&ctx.mission_id, state).await;
        }
    }

    /// Mark the mission cancelled if the token fired
    async fn cancelled(&self, state: &mut WorkflowState, ctx: &MissionContext) -> bool {
        if !ctx.cancel.is_cancelled() {
            return false;
        }
        state.status = Status::Cancelled;
        state.record_error(StageKind::Controller, "Mission cancelled");
        self.publish(ctx, state).await;
        true
    }

    /// Run the mission to a terminal status
    pub async fn run(&self, state: &mut WorkflowState, ctx: &MissionContext) -> MissionOutcome {
        log::info!("mission {} starting: {}", ctx.mission_id, state.mission_prompt);
        state.push_log(format!("Mission started: {}", state.mission_prompt));

        for _ in 0..ctx.max_iterations {
            if self.cancelled(state, ctx).await {
                return MissionOutcome::Cancelled;
            }
            self.design.run(state).await;
            self.publish(ctx, state).await;

            if self.cancelled(state, ctx).await {
                return MissionOutcome::Cancelled;
            }
            self.evaluation.run(state, ctx).await;
            self.publish(ctx, state).await;

            if self.cancelled(state, ctx).await {
                return MissionOutcome::Cancelled;
            }
            let decision = self.decision.decide(state, ctx.max_iterations).await;
            self.publish(ctx, state).await;

            if decision == Decision::Finish {
                let outcome = MissionOutcome::from_state(state);
                log::info!("mission {} finished at iteration {}: {:?}", ctx.mission_id, state.iteration, outcome);
                return outcome;
            }
        }

        // The decision stage finishes at the limit; this only guards the invariant
        if !state.is_terminal() {
            state.status = Status::Complete;
            self.publish(ctx, state).await;
        }
        MissionOutcome::from_state(state)
    }
}
