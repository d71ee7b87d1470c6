//! Wiring of collaborators from configuration

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::analysis::{AnalysisRequest, Analyst, LlmAnalyst};
use crate::config::{Config, RoleModel};
use crate::decision::{DecisionOracle, DecisionPolicy, DecisionRequest, LlmOracle};
use crate::design::{
    ContextLimits, DesignGenerator, DesignRequest, LlmDesigner, MOCK_KEY_PREFIX, offline_designs_enabled,
};
use crate::domain::Decision;
use crate::error::{CollaboratorError, Result};
use crate::geometry::{GeometryKernel, ScriptKernel};
use crate::llm::{LlmClient, OpenRouterClient, OpenRouterConfig};
use crate::prompt::PromptRenderer;
use crate::simulation::{ProcessConfig, ProcessSimulator, SimulationLadder, Simulator, SyntheticSimulator};

use super::controller::Controller;
use super::decision_stage::DecisionStage;
use super::design_stage::DesignStage;
use super::evaluation_stage::EvaluationStage;

/// Stand-in for a collaborator that has not been configured
#[derive(Debug, Clone, Default)]
pub struct Unconfigured;

impl Unconfigured {
    fn error(role: &str) -> CollaboratorError {
        CollaboratorError::Configuration(format!("{} is not configured", role))
    }
}

#[async_trait]
impl DesignGenerator for Unconfigured {
    async fn generate(&self, _request: &DesignRequest) -> std::result::Result<String, CollaboratorError> {
        Err(Self::error("designer"))
    }
}

#[async_trait]
impl Analyst for Unconfigured {
    async fn analyze(&self, _request: &AnalysisRequest) -> std::result::Result<String, CollaboratorError> {
        Err(Self::error("analyst"))
    }
}

#[async_trait]
impl DecisionOracle for Unconfigured {
    async fn decide(&self, _request: &DecisionRequest) -> std::result::Result<Decision, CollaboratorError> {
        Err(Self::error("decision oracle"))
    }
}

/// Everything a controller needs, shared across missions
#[derive(Clone)]
pub struct Collaborators {
    pub designer: Arc<dyn DesignGenerator>,
    pub geometry: Arc<dyn GeometryKernel>,
    pub ladder: Arc<SimulationLadder>,
    pub analyst: Arc<dyn Analyst>,
    pub oracle: Arc<dyn DecisionOracle>,
    pub offline_designs: bool,
    pub limits: ContextLimits,
    pub policy: DecisionPolicy,
    pub steps: u32,
    pub dt: f64,
}

impl Collaborators {
    /// Every external collaborator disabled; fallbacks only
    pub fn offline(jitter: bool) -> Self {
        Self {
            designer: Arc::new(Unconfigured),
            geometry: Arc::new(ScriptKernel::new()),
            ladder: Arc::new(SimulationLadder::synthetic_only(jitter)),
            analyst: Arc::new(Unconfigured),
            oracle: Arc::new(Unconfigured),
            offline_designs: true,
            limits: ContextLimits::default(),
            policy: DecisionPolicy::default(),
            steps: crate::simulation::DEFAULT_STEPS,
            dt: crate::simulation::DEFAULT_DT,
        }
    }

    /// Build LLM-backed collaborators and the simulation ladder from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let renderer = Arc::new(PromptRenderer::with_builtins()?);
        let raw_key = std::env::var(&config.llm.api_key_env).ok();
        let offline_designs = offline_designs_enabled(config.workflow.offline_designs, raw_key.as_deref());
        let api_key = usable_api_key(raw_key);
        if api_key.is_none() {
            log::warn!("{} not set, LLM collaborators will fall back", config.llm.api_key_env);
        }

        let client = |role: &RoleModel| -> Result<Arc<dyn LlmClient>> {
            let or_config = OpenRouterConfig {
                base_url: config.llm.base_url.clone(),
                model: role.model.clone(),
                temperature: role.temperature,
                timeout: Duration::from_millis(config.llm.timeout_ms),
                api_key_env: config.llm.api_key_env.clone(),
                ..OpenRouterConfig::default()
            };
            Ok(Arc::new(OpenRouterClient::with_api_key(api_key.clone(), or_config)?))
        };

        let designer = LlmDesigner::new(client(&config.llm.design)?, renderer.clone());
        let analyst = LlmAnalyst::new(client(&config.llm.analysis)?, renderer.clone());
        let oracle = LlmOracle::new(client(&config.llm.decision)?, renderer);

        let sim = &config.simulation;
        let levels: Vec<Arc<dyn Simulator>> = if sim.command.is_empty() {
            Vec::new()
        } else {
            sim.backends
                .iter()
                .map(|backend| {
                    let process = ProcessConfig::new(sim.command.clone(), backend.clone())
                        .timeout(Duration::from_millis(sim.timeout_ms));
                    Arc::new(ProcessSimulator::new(process)) as Arc<dyn Simulator>
                })
                .collect()
        };
        let ladder = SimulationLadder::new(levels, SyntheticSimulator::new(sim.jitter));
        log::info!("simulation ladder: {}", ladder.labels().join(" -> "));

        Ok(Self {
            designer: Arc::new(designer),
            geometry: Arc::new(ScriptKernel::new()),
            ladder: Arc::new(ladder),
            analyst: Arc::new(analyst),
            oracle: Arc::new(oracle),
            offline_designs,
            limits: ContextLimits {
                max_artifact_chars: config.workflow.max_artifact_chars,
                max_prior_errors: config.workflow.max_prior_errors,
            },
            policy: DecisionPolicy {
                error_scope: config.workflow.error_scope,
                ..DecisionPolicy::default()
            },
            steps: sim.steps,
            dt: sim.dt,
        })
    }

    /// Assemble a controller over these collaborators
    pub fn controller(&self) -> Controller {
        Controller::new(
            DesignStage::new(self.designer.clone())
                .with_limits(self.limits)
                .with_offline_designs(self.offline_designs),
            EvaluationStage::new(self.geometry.clone(), self.ladder.clone(), self.analyst.clone())
                .with_episode(self.steps, self.dt),
            DecisionStage::new(self.oracle.clone()).with_policy(self.policy),
        )
    }
}

/// Placeholder keys count as no key at all
fn usable_api_key(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty() && !k.starts_with(MOCK_KEY_PREFIX))
}
