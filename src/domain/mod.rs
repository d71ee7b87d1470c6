//! Domain types for aeroforge
//!
//! - WorkflowState: the single mutable record a mission's stages share
//! - StabilityMetrics / Telemetry: simulation output and its summary
//! - MissionProfile: keyword classification behind every deterministic fallback
//! - Decision: closed iterate/finish routing

pub mod decision;
pub mod metrics;
pub mod profile;
pub mod state;

pub use decision::Decision;
pub use metrics::{StabilityMetrics, Telemetry, analyze_telemetry};
pub use profile::MissionProfile;
pub use state::{ErrorRecord, SimulationSource, StageKind, Status, WorkflowState};
