//! Evaluation stage: materialize, export, simulate, analyze
//!
//! Every step has a fallback, so once an export exists the stage always
//! leaves fresh metrics and feedback in the state. Only a missing artifact or
//! a failed export are recorded as errors.

use std::sync::Arc;

use crate::analysis::{AnalysisRequest, Analyst, synthesize_feedback};
use crate::domain::{StageKind, Status, WorkflowState};
use crate::geometry::{GeometricModel, GeometryKernel};
use crate::simulation::{DEFAULT_DT, DEFAULT_STEPS, SimulationLadder, SimulationRequest};

use super::controller::MissionContext;

pub struct EvaluationStage {
    geometry: Arc<dyn GeometryKernel>,
    ladder: Arc<SimulationLadder>,
    analyst: Arc<dyn Analyst>,
    steps: u32,
    dt: f64,
}

impl EvaluationStage {
    pub fn new(geometry: Arc<dyn GeometryKernel>, ladder: Arc<SimulationLadder>, analyst: Arc<dyn Analyst>) -> Self {
        Self {
            geometry,
            ladder,
            analyst,
            steps: DEFAULT_STEPS,
            dt: DEFAULT_DT,
        }
    }

    pub fn with_episode(mut self, steps: u32, dt: f64) -> Self {
        self.steps = steps;
        self.dt = dt;
        self
    }

    pub async fn run(&self, state: &mut WorkflowState, ctx: &MissionContext) {
        state.status = Status::Simulating;

        let Some(artifact) = state.artifact.clone() else {
            state.record_error(StageKind::Evaluation, "No design artifact available for simulation");
            return;
        };

        let model = match self.geometry.materialize(&artifact).await {
            Ok(model) => model,
            Err(e) => {
                let profile = state.profile();
                log::warn!("artifact could not be materialized ({}), using preset airframe", e);
                state.push_log(format!("Artifact not buildable, using preset {} airframe", profile.label()));
                GeometricModel::preset(profile, state.iteration)
            }
        };

        let dir = ctx.iteration_dir(state.iteration);
        let exported = match self.geometry.export(&model, &dir).await {
            Ok(exported) => exported,
            Err(e) => {
                state.record_error(StageKind::Evaluation, format!("Export failed: {}", e));
                return;
            }
        };
        state.push_log(format!("Exported {} meshes to {}", exported.mesh_files.len(), dir.display()));
        state.artifact_location = Some(exported.description_path.clone());
        state.generated_files = exported.all_files();

        let request = SimulationRequest {
            description_path: exported.description_path,
            output_dir: dir.join("simulation"),
            steps: self.steps,
            dt: self.dt,
            mission_prompt: state.mission_prompt.clone(),
            iteration: state.iteration,
        };
        let run = self.ladder.run(&request).await;
        for (label, e) in &run.failures {
            state.push_log(format!("Simulation level {} failed: {}", label, e));
        }
        state.push_log(format!("Simulation metrics: {}", run.outcome.metrics.summary()));
        state.simulation_results = Some(run.outcome.telemetry);
        state.simulation_metrics = run.outcome.metrics;
        state.simulation_source = Some(run.outcome.source.clone());

        state.status = Status::Analyzing;
        let analysis = AnalysisRequest {
            mission_prompt: state.mission_prompt.clone(),
            iteration: state.iteration,
            metrics: state.simulation_metrics.clone(),
            source: run.outcome.source,
        };
        let feedback = match self.analyst.analyze(&analysis).await {
            Ok(feedback) => feedback,
            Err(e) => {
                log::warn!("analyst unavailable ({}), using synthesized feedback", e);
                synthesize_feedback(&state.mission_prompt, &state.simulation_metrics)
            }
        };
        state.feedback = Some(feedback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CLOSING_LINE;
    use crate::domain::SimulationSource;
    use crate::error::CollaboratorError;
    use crate::geometry::ScriptKernel;
    use crate::workflow::testing::ScriptedAnalyst;
    use tempfile::TempDir;

    fn stage(analyst: ScriptedAnalyst) -> EvaluationStage {
        EvaluationStage::new(
            Arc::new(ScriptKernel::new()),
            Arc::new(SimulationLadder::synthetic_only(false)),
            Arc::new(analyst),
        )
        .with_episode(20, 0.01)
    }

    fn unavailable() -> ScriptedAnalyst {
        ScriptedAnalyst::new(vec![Err(CollaboratorError::Configuration("no key".to_string()))])
    }

    fn state_with(artifact: &str) -> WorkflowState {
        let mut state = WorkflowState::new("Build a racing drone");
        state.iteration = 1;
        state.artifact = Some(artifact.to_string());
        state
    }

    #[tokio::test]
    async fn test_missing_artifact_records_error() {
        let temp = TempDir::new().unwrap();
        let ctx = MissionContext::new("m-1", temp.path());
        let mut state = WorkflowState::new("Build a racing drone");
        state.iteration = 1;

        stage(unavailable()).run(&mut state, &ctx).await;

        assert_eq!(state.error_messages(), vec!["No design artifact available for simulation"]);
        assert!(state.simulation_metrics.is_empty());
        assert!(state.feedback.is_none());
    }

    #[tokio::test]
    async fn test_valid_artifact_full_pipeline() {
        let temp = TempDir::new().unwrap();
        let ctx = MissionContext::new("m-1", temp.path());
        let mut state = state_with("robot racer\ncomponent body box 100 40 20\ncomponent cam sphere 8 at 0 0 15\n");

        stage(ScriptedAnalyst::new(vec![Ok("Lower the camera.".to_string())]))
            .run(&mut state, &ctx)
            .await;

        assert!(state.errors.is_empty());
        assert_eq!(state.status, Status::Analyzing);
        assert_eq!(state.feedback.as_deref(), Some("Lower the camera."));
        assert_eq!(state.simulation_source, Some(SimulationSource::Synthetic));
        assert!((state.simulation_metrics.stability_score() - 0.78).abs() < 1e-9);
        assert_eq!(state.generated_files.len(), 3);

        let location = state.artifact_location.unwrap();
        assert_eq!(location, temp.path().join("m-1").join("iteration-01").join("urdf").join("design.urdf"));
        assert!(location.exists());
        assert_eq!(state.simulation_results.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_unbuildable_artifact_still_yields_metrics_and_feedback() {
        let temp = TempDir::new().unwrap();
        let ctx = MissionContext::new("m-2", temp.path());
        let mut state = state_with("this is not a script");

        stage(unavailable()).run(&mut state, &ctx).await;

        assert!(state.errors.is_empty());
        assert!(!state.simulation_metrics.is_empty());
        // preset airframe: fuselage, 4 arms, 4 mounts, plus the description
        assert_eq!(state.generated_files.len(), 10);
        let feedback = state.feedback.unwrap();
        assert!(feedback.ends_with(CLOSING_LINE));
    }

    #[tokio::test]
    async fn test_export_failure_keeps_prior_metrics() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocked");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let ctx = MissionContext::new("m-3", &blocker);

        let mut state = state_with("component body box 10 10 10");
        state.feedback = Some("earlier feedback".to_string());

        stage(unavailable()).run(&mut state, &ctx).await;

        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].message.starts_with("Export failed:"));
        assert_eq!(state.feedback.as_deref(), Some("earlier feedback"));
        assert!(state.simulation_metrics.is_empty());
        assert!(state.artifact_location.is_none());
    }
}
