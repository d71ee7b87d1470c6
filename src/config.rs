use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::decision::{ErrorScope, MAX_ITERATIONS};
use crate::llm::OPENROUTER_BASE_URL;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub workflow: WorkflowConfig,
    pub simulation: SimulationConfig,
    pub output: OutputConfig,
    pub storage: StorageConfig,
}

/// Model and sampling settings for one LLM role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleModel {
    pub model: String,
    pub temperature: f32,
}

impl RoleModel {
    fn new(model: &str, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub design: RoleModel,
    pub analysis: RoleModel,
    pub decision: RoleModel,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: OPENROUTER_BASE_URL.to_string(),
            api_key_env: crate::llm::OPENROUTER_API_KEY_ENV.to_string(),
            timeout_ms: 120000,
            design: RoleModel::new("google/gemini-3-pro-preview", 0.7),
            analysis: RoleModel::new("google/gemini-2.0-flash-exp", 0.5),
            decision: RoleModel::new("google/gemini-3-pro-preview", 0.3),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_iterations: u32,
    /// Fall back to template designs when no designer is configured
    pub offline_designs: bool,
    pub error_scope: ErrorScope,
    pub max_artifact_chars: usize,
    pub max_prior_errors: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            offline_designs: false,
            error_scope: ErrorScope::Mission,
            max_artifact_chars: 6000,
            max_prior_errors: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Runner program and fixed arguments; empty means synthetic only
    pub command: Vec<String>,
    pub backends: Vec<String>,
    pub steps: u32,
    pub dt: f64,
    pub timeout_ms: u64,
    pub jitter: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            backends: vec!["gpu".to_string(), "cpu".to_string()],
            steps: 500,
            dt: 0.01,
            timeout_ms: 120000,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("aeroforge"),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings the mission loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workflow.max_iterations == 0 {
            return Err(eyre!("workflow.max_iterations must be at least 1"));
        }
        if self.simulation.steps == 0 {
            return Err(eyre!("simulation.steps must be at least 1"));
        }
        if !(self.simulation.dt.is_finite() && self.simulation.dt > 0.0) {
            return Err(eyre!("simulation.dt must be positive"));
        }
        if self.simulation.timeout_ms == 0 || self.llm.timeout_ms == 0 {
            return Err(eyre!("timeouts must be non-zero"));
        }
        if !self.simulation.command.is_empty() && self.simulation.backends.is_empty() {
            return Err(eyre!("simulation.backends is empty but a runner command is set"));
        }
        Ok(())
    }
}
