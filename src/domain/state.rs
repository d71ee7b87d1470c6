//! Workflow state threaded through every stage of a mission

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::metrics::{StabilityMetrics, Telemetry};
use super::profile::MissionProfile;

/// Lifecycle status of a mission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Initialized,
    Designing,
    Simulating,
    Analyzing,
    Complete,
    Failed,
    /// Stopped by the caller between stages
    Cancelled,
}

impl Status {
    /// Terminal states never see another stage call
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Complete | Status::Failed | Status::Cancelled)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Initialized => "initialized",
            Status::Designing => "designing",
            Status::Simulating => "simulating",
            Status::Analyzing => "analyzing",
            Status::Complete => "complete",
            Status::Failed => "failed",
            Status::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Which part of the loop recorded an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Design,
    Evaluation,
    Decision,
    Controller,
}

/// One entry of the mission's append-only error log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub iteration: u32,
    pub stage: StageKind,
    pub message: String,
}

/// Which rung of the simulation ladder produced the latest metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SimulationSource {
    Process { backend: String },
    Synthetic,
}

/// All cross-iteration memory of a single mission.
///
/// Stages mutate it in place; nothing is ever rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub mission_prompt: String,
    pub status: Status,
    /// Number of design stage calls so far
    pub iteration: u32,
    /// Latest design artifact
    pub artifact: Option<String>,
    /// Every artifact ever produced, in order
    pub design_history: Vec<String>,
    pub simulation_results: Option<Telemetry>,
    #[serde(default)]
    pub simulation_metrics: StabilityMetrics,
    pub simulation_source: Option<SimulationSource>,
    pub feedback: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    /// Exported simulation description (URDF)
    pub artifact_location: Option<PathBuf>,
    #[serde(default)]
    pub generated_files: Vec<PathBuf>,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl WorkflowState {
    pub fn new(mission_prompt: impl Into<String>) -> Self {
        Self {
            mission_prompt: mission_prompt.into(),
            status: Status::Initialized,
            iteration: 0,
            artifact: None,
            design_history: Vec::new(),
            simulation_results: None,
            simulation_metrics: StabilityMetrics::default(),
            simulation_source: None,
            feedback: None,
            errors: Vec::new(),
            artifact_location: None,
            generated_files: Vec::new(),
            logs: Vec::new(),
        }
    }

    pub fn profile(&self) -> MissionProfile {
        MissionProfile::classify(&self.mission_prompt)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append an error tagged with the current iteration
    pub fn record_error(&mut self, stage: StageKind, message: impl Into<String>) {
        let message = message.into();
        log::warn!("iteration {} {:?}: {}", self.iteration, stage, message);
        self.push_log(format!("ERROR: {}", message));
        self.errors.push(ErrorRecord {
            iteration: self.iteration,
            stage,
            message,
        });
    }

    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    /// Errors recorded while `iteration` was current
    pub fn errors_for_iteration(&self, iteration: u32) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter().filter(move |e| e.iteration == iteration)
    }

    /// Any error whose text mentions "fatal", case-insensitively
    pub fn has_fatal_error(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.message.to_lowercase().contains("fatal"))
    }

    /// Append a timestamped progress line
    pub fn push_log(&mut self, message: impl AsRef<str>) {
        let stamp = chrono::Utc::now().format("%H:%M:%S");
        self.logs.push(format!("[{}] {}", stamp, message.as_ref()));
    }
}
