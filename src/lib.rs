//! aeroforge - mission-driven airframe design loop
//!
//! A mission prompt goes through repeated design, simulation and review
//! iterations until the decision stage approves the airframe, a fatal error
//! is recorded, or the iteration budget runs out.

pub mod analysis;
pub mod config;
pub mod decision;
pub mod design;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod id;
pub mod llm;
pub mod manager;
pub mod prompt;
pub mod simulation;
pub mod storage;
pub mod workflow;

pub use error::{AeroforgeError, CollaboratorError, Result};
