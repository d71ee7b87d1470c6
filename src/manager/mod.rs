//! Mission Manager module
//!
//! Runs missions concurrently and answers status/results queries.

mod mission_manager;

pub use mission_manager::{
    MissionManager, MissionManagerConfig, MissionRecord, MissionResults, MissionStatus, mission_files, status_of,
};
