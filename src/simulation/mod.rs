//! Simulation collaborator and its fallback ladder
//!
//! Physics runs out of process: `ProcessSimulator` launches a runner with a
//! timeout and reads its JSON result file. `SyntheticSimulator` synthesizes
//! metrics from the mission profile and never fails; it is always the last
//! rung of a `SimulationLadder`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio::process::Command;

use crate::domain::metrics::{
    ENERGY_EFFICIENCY, MAX_ACCELERATION, POSITION_DRIFT, SAFETY_FACTOR, STABILITY_SCORE,
};
use crate::domain::{MissionProfile, SimulationSource, StabilityMetrics, Telemetry, analyze_telemetry};
use crate::error::CollaboratorError;

pub const DEFAULT_STEPS: u32 = 500;
pub const DEFAULT_DT: f64 = 0.01;
const JITTER: f64 = 0.02;
const STDERR_TAIL_CHARS: usize = 400;

/// One simulation episode to run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub description_path: PathBuf,
    /// Directory the runner writes its result file into
    pub output_dir: PathBuf,
    pub steps: u32,
    pub dt: f64,
    pub mission_prompt: String,
    pub iteration: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub telemetry: Telemetry,
    pub metrics: StabilityMetrics,
    pub source: SimulationSource,
}

#[async_trait]
pub trait Simulator: Send + Sync {
    async fn run(&self, request: &SimulationRequest) -> Result<SimulationOutcome, CollaboratorError>;

    /// Short label for logs
    fn label(&self) -> String;
}

/// Configuration for an out-of-process runner
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Program followed by its fixed arguments
    pub command: Vec<String>,
    pub backend: String,
    pub timeout: Duration,
}

impl ProcessConfig {
    pub fn new(command: Vec<String>, backend: impl Into<String>) -> Self {
        Self {
            command,
            backend: backend.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Result file written by the runner
#[derive(Debug, Deserialize)]
struct RunnerResult {
    status: String,
    #[serde(default)]
    telemetry: Option<Telemetry>,
    #[serde(default)]
    metrics: Option<StabilityMetrics>,
    #[serde(default)]
    error: Option<String>,
}

/// Runs the physics engine in a child process.
///
/// Invocation: `<command...> --urdf <path> --output <json> --steps <n> --dt <dt> --backend <name>`.
pub struct ProcessSimulator {
    config: ProcessConfig,
}

impl ProcessSimulator {
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    fn output_path(&self, request: &SimulationRequest) -> PathBuf {
        request
            .output_dir
            .join(format!("simulation-{}.json", self.config.backend))
    }

    async fn execute(&self, request: &SimulationRequest, output: &PathBuf) -> Result<(), CollaboratorError> {
        let [program, args @ ..] = self.config.command.as_slice() else {
            return Err(CollaboratorError::Configuration("simulator command is empty".to_string()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg("--urdf")
            .arg(&request.description_path)
            .arg("--output")
            .arg(output)
            .arg("--steps")
            .arg(request.steps.to_string())
            .arg("--dt")
            .arg(request.dt.to_string())
            .arg("--backend")
            .arg(&self.config.backend)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| CollaboratorError::Process(format!("failed to start '{}': {}", program, e)))?;

        // Dropping the wait future on timeout drops the child, which kills it
        let result = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(CollaboratorError::Process(format!(
                    "timed out after {}ms",
                    self.config.timeout.as_millis()
                )));
            }
        };
        let output = result.map_err(|e| CollaboratorError::Process(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let tail_start = stderr
                .char_indices()
                .rev()
                .nth(STDERR_TAIL_CHARS)
                .map(|(i, _)| i)
                .unwrap_or(0);
            return Err(CollaboratorError::Process(format!(
                "exited with code {:?}: {}",
                output.status.code(),
                &stderr[tail_start..]
            )));
        }
        Ok(())
    }

    async fn read_result(output: &PathBuf) -> Result<SimulationOutcomeParts, CollaboratorError> {
        let raw = tokio::fs::read_to_string(output)
            .await
            .map_err(|e| CollaboratorError::Process(format!("no result file at {}: {}", output.display(), e)))?;
        let result: RunnerResult = serde_json::from_str(&raw)
            .map_err(|e| CollaboratorError::Process(format!("corrupt result file: {}", e)))?;

        if result.status != "success" {
            return Err(CollaboratorError::Process(
                result
                    .error
                    .unwrap_or_else(|| format!("runner reported status '{}'", result.status)),
            ));
        }

        let telemetry = result.telemetry.unwrap_or_default();
        let metrics = match result.metrics {
            Some(m) if !m.is_empty() => m,
            _ => analyze_telemetry(&telemetry),
        };
        if metrics.is_empty() {
            return Err(CollaboratorError::Process("result has neither metrics nor telemetry".to_string()));
        }
        Ok((telemetry, metrics))
    }
}

type SimulationOutcomeParts = (Telemetry, StabilityMetrics);

#[async_trait]
impl Simulator for ProcessSimulator {
    async fn run(&self, request: &SimulationRequest) -> Result<SimulationOutcome, CollaboratorError> {
        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|e| CollaboratorError::Process(format!("cannot create output dir: {}", e)))?;

        let output = self.output_path(request);
        // A stale file from an earlier run must not be mistaken for this one
        let _ = tokio::fs::remove_file(&output).await;

        log::info!("running {} simulation for {}", self.config.backend, request.description_path.display());
        self.execute(request, &output).await?;
        let (telemetry, metrics) = Self::read_result(&output).await?;

        Ok(SimulationOutcome {
            telemetry,
            metrics,
            source: SimulationSource::Process {
                backend: self.config.backend.clone(),
            },
        })
    }

    fn label(&self) -> String {
        format!("process:{}", self.config.backend)
    }
}

/// Deterministic metric synthesizer keyed off the mission profile
#[derive(Debug, Clone)]
pub struct SyntheticSimulator {
    jitter: bool,
}

impl Default for SyntheticSimulator {
    fn default() -> Self {
        Self { jitter: true }
    }
}

impl SyntheticSimulator {
    pub fn new(jitter: bool) -> Self {
        Self { jitter }
    }

    /// Metrics for `(prompt, iteration)` with an explicit jitter term
    pub fn synthesize(prompt: &str, iteration: u32, jitter: f64) -> StabilityMetrics {
        let i = iteration as f64;
        let profile = MissionProfile::classify_for_metrics(prompt);

        let (base_stability, base_accel, base_energy) = match profile {
            MissionProfile::Racing => (0.75, 35.0, 0.70),
            MissionProfile::HeavyLift => (0.95, 8.0, 0.80),
            _ => (0.85, 15.0, 0.75),
        };
        let accel = if profile == MissionProfile::Racing {
            base_accel + 2.0 * i
        } else {
            base_accel
        };

        StabilityMetrics::new()
            .with(STABILITY_SCORE, (base_stability + 0.03 * i + jitter).min(0.99))
            .with(MAX_ACCELERATION, accel)
            .with(POSITION_DRIFT, (0.5 - 0.1 * i).max(0.05))
            .with(ENERGY_EFFICIENCY, (base_energy + 0.02 * i).min(0.98))
            .with(SAFETY_FACTOR, 1.5 + 0.1 * i)
    }

    /// Total; never fails
    pub fn outcome(&self, request: &SimulationRequest) -> SimulationOutcome {
        let jitter = if self.jitter {
            rand::rng().random_range(-JITTER..=JITTER)
        } else {
            0.0
        };
        SimulationOutcome {
            telemetry: Telemetry::hover(request.steps as usize, request.dt),
            metrics: Self::synthesize(&request.mission_prompt, request.iteration, jitter),
            source: SimulationSource::Synthetic,
        }
    }
}

#[async_trait]
impl Simulator for SyntheticSimulator {
    async fn run(&self, request: &SimulationRequest) -> Result<SimulationOutcome, CollaboratorError> {
        Ok(self.outcome(request))
    }

    fn label(&self) -> String {
        "synthetic".to_string()
    }
}

/// Result of walking the ladder
#[derive(Debug, Clone)]
pub struct LadderRun {
    pub outcome: SimulationOutcome,
    /// `(level label, failure)` for every rung that failed
    pub failures: Vec<(String, CollaboratorError)>,
}

/// Ordered simulators ending in the synthetic synthesizer
pub struct SimulationLadder {
    levels: Vec<Arc<dyn Simulator>>,
    fallback: SyntheticSimulator,
}

impl SimulationLadder {
    pub fn new(levels: Vec<Arc<dyn Simulator>>, fallback: SyntheticSimulator) -> Self {
        Self { levels, fallback }
    }

    /// Ladder with only the synthetic rung
    pub fn synthetic_only(jitter: bool) -> Self {
        Self::new(Vec::new(), SyntheticSimulator::new(jitter))
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.levels.iter().map(|l| l.label()).collect();
        labels.push(self.fallback.label());
        labels
    }

    /// Try each level in order; the synthetic rung catches everything else
    pub async fn run(&self, request: &SimulationRequest) -> LadderRun {
        let mut failures = Vec::new();
        for level in &self.levels {
            match level.run(request).await {
                Ok(outcome) => return LadderRun { outcome, failures },
                Err(e) => {
                    log::warn!("simulation level {} failed: {}", level.label(), e);
                    failures.push((level.label(), e));
                }
            }
        }
        LadderRun {
            outcome: self.fallback.outcome(request),
            failures,
        }
    }
}
