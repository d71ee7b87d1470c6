//! Routing decision returned by the decision stage

use serde::{Deserialize, Serialize};

/// Whether the mission loop should run another iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Iterate,
    Finish,
}

impl Decision {
    /// Accepts exactly "iterate" or "finish", trimmed and case-insensitive
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "iterate" => Some(Decision::Iterate),
            "finish" => Some(Decision::Finish),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Iterate => write!(f, "iterate"),
            Decision::Finish => write!(f, "finish"),
        }
    }
}
