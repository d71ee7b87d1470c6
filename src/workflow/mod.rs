//! The mission loop
//!
//! - DesignStage: one designer call per iteration, template fallback
//! - EvaluationStage: materialize, export, simulate, analyze
//! - DecisionStage: hard stops, oracle, heuristic
//! - Controller: sequences the stages until a terminal status

mod collaborators;
mod controller;
mod decision_stage;
mod design_stage;
mod evaluation_stage;
pub mod testing;

pub use collaborators::{Collaborators, Unconfigured};
pub use controller::{Controller, MissionContext, MissionOutcome, StateObserver};
pub use decision_stage::DecisionStage;
pub use design_stage::DesignStage;
pub use evaluation_stage::EvaluationStage;
