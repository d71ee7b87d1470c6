//! Design stage: one designer call per iteration

use std::sync::Arc;

use crate::design::{ContextLimits, DesignGenerator, DesignRequest, TemplateDesigner, script, strip_fences};
use crate::domain::{StageKind, Status, WorkflowState};

pub struct DesignStage {
    designer: Arc<dyn DesignGenerator>,
    limits: ContextLimits,
    /// Use template designs when the designer is not configured
    offline_designs: bool,
}

impl DesignStage {
    pub fn new(designer: Arc<dyn DesignGenerator>) -> Self {
        Self {
            designer,
            limits: ContextLimits::default(),
            offline_designs: false,
        }
    }

    pub fn with_limits(mut self, limits: ContextLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_offline_designs(mut self, enabled: bool) -> Self {
        self.offline_designs = enabled;
        self
    }

    /// Advance the iteration and try to produce a new artifact.
    ///
    /// On failure the previous artifact stays in place and the error is
    /// recorded; the controller carries on either way.
    pub async fn run(&self, state: &mut WorkflowState) {
        state.status = Status::Designing;
        state.iteration += 1;
        state.push_log(format!("Iteration {}: designing", state.iteration));

        let request = DesignRequest::from_state(state, &self.limits);
        let artifact = match self.designer.generate(&request).await {
            Ok(text) => strip_fences(&text),
            Err(e) if e.is_configuration() && self.offline_designs => {
                log::warn!("designer unavailable ({}), using template design", e);
                state.push_log(format!("Designer unavailable, using {} template", request.profile().label()));
                TemplateDesigner::template(request.profile(), request.iteration)
            }
            Err(e) => {
                state.record_error(StageKind::Design, format!("Designer failed: {}", e));
                return;
            }
        };

        state.artifact = Some(artifact.clone());
        state.design_history.push(artifact.clone());

        if let Err(e) = script::validate(&artifact) {
            state.record_error(StageKind::Design, format!("Syntax error: {}", e));
        } else {
            state.push_log(format!("Design ready ({} chars)", artifact.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::workflow::testing::ScriptedDesigner;

    const VALID: &str = "robot probe\ncomponent body box 100 80 30\n";

    #[tokio::test]
    async fn test_success_stores_artifact_and_history() {
        let stage = DesignStage::new(Arc::new(ScriptedDesigner::ok(&format!("```\n{}```", VALID))));
        let mut state = WorkflowState::new("A survey drone");

        stage.run(&mut state).await;

        assert_eq!(state.iteration, 1);
        assert_eq!(state.status, Status::Designing);
        assert_eq!(state.artifact.as_deref(), Some(VALID.trim()));
        assert_eq!(state.design_history.len(), 1);
        assert!(state.errors.is_empty());
    }

    #[tokio::test]
    async fn test_syntax_error_is_advisory() {
        let stage = DesignStage::new(Arc::new(ScriptedDesigner::ok("robot a\ncomponent tip cone 5 10")));
        let mut state = WorkflowState::new("A survey drone");

        stage.run(&mut state).await;

        assert!(state.artifact.is_some());
        assert_eq!(state.design_history.len(), 1);
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].message.starts_with("Syntax error: line 2"));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_artifact() {
        let stage = DesignStage::new(Arc::new(ScriptedDesigner::err(CollaboratorError::Service(
            "503".to_string(),
        ))));
        let mut state = WorkflowState::new("A survey drone");
        state.iteration = 1;
        state.artifact = Some(VALID.to_string());
        state.design_history.push(VALID.to_string());

        stage.run(&mut state).await;

        assert_eq!(state.iteration, 2);
        assert_eq!(state.artifact.as_deref(), Some(VALID));
        assert_eq!(state.design_history.len(), 1);
        assert_eq!(state.errors[0].message, "Designer failed: Service error: 503");
        assert_eq!(state.errors[0].stage, StageKind::Design);
    }

    #[tokio::test]
    async fn test_unconfigured_designer_without_offline_records_error() {
        let stage = DesignStage::new(Arc::new(ScriptedDesigner::err(CollaboratorError::Configuration(
            "no key".to_string(),
        ))));
        let mut state = WorkflowState::new("A survey drone");

        stage.run(&mut state).await;

        assert!(state.artifact.is_none());
        assert!(state.errors[0].message.starts_with("Designer failed: Configuration error"));
    }

    #[tokio::test]
    async fn test_unconfigured_designer_with_offline_uses_template() {
        let stage = DesignStage::new(Arc::new(ScriptedDesigner::err(CollaboratorError::Configuration(
            "no key".to_string(),
        ))))
        .with_offline_designs(true);
        let mut state = WorkflowState::new("Design a heavy-lift cargo drone");

        stage.run(&mut state).await;
        stage.run(&mut state).await;

        assert_eq!(state.iteration, 2);
        assert_eq!(state.design_history.len(), 2);
        assert!(state.errors.is_empty());
        assert!(
            state
                .artifact
                .as_deref()
                .unwrap()
                .starts_with("# heavy-lift airframe template, iteration 2")
        );
    }

    #[tokio::test]
    async fn test_service_error_is_not_masked_by_offline_templates() {
        let stage = DesignStage::new(Arc::new(ScriptedDesigner::err(CollaboratorError::Service(
            "timeout".to_string(),
        ))))
        .with_offline_designs(true);
        let mut state = WorkflowState::new("A survey drone");

        stage.run(&mut state).await;

        assert!(state.artifact.is_none());
        assert_eq!(state.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_designer_sees_prior_feedback() {
        let designer = Arc::new(ScriptedDesigner::ok(VALID));
        let stage = DesignStage::new(designer.clone());
        let mut state = WorkflowState::new("A survey drone");
        state.iteration = 1;
        state.feedback = Some("Widen the mounts".to_string());

        stage.run(&mut state).await;

        let seen = designer.requests();
        assert_eq!(seen[0].iteration, 2);
        assert_eq!(seen[0].feedback.as_deref(), Some("Widen the mounts"));
    }
}
