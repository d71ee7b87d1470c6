//! Mission profile classification.
//!
//! Every deterministic fallback (template designs, preset geometry, synthetic
//! metrics, templated feedback) keys off the same keyword classification of
//! the mission prompt.

use serde::{Deserialize, Serialize};

const RESCUE_CUES: &[&str] = &["medical", "rescue", "delivery", "himalayan", "altitude", "mountain"];
const RACING_CUES: &[&str] = &["racing", "speed", "fast"];
const HEAVY_CUES: &[&str] = &["heavy", "cargo", "lift"];

/// Broad class of airframe a mission asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionProfile {
    /// Long-range payload delivery / high-altitude work
    Rescue,
    /// Speed-optimised airframe
    Racing,
    /// Payload-optimised airframe
    HeavyLift,
    /// Everything else
    General,
}

impl MissionProfile {
    /// Classify a mission prompt; first matching cue group wins.
    pub fn classify(prompt: &str) -> Self {
        let lower = prompt.to_lowercase();
        let has = |cues: &[&str]| cues.iter().any(|cue| lower.contains(cue));

        if has(RESCUE_CUES) {
            MissionProfile::Rescue
        } else if has(RACING_CUES) {
            MissionProfile::Racing
        } else if has(HEAVY_CUES) {
            MissionProfile::HeavyLift
        } else {
            MissionProfile::General
        }
    }

    /// Classification used by metric and feedback synthesis, which only
    /// distinguish racing and heavy-lift cues.
    pub fn classify_for_metrics(prompt: &str) -> Self {
        let lower = prompt.to_lowercase();
        if RACING_CUES.iter().any(|cue| lower.contains(cue)) {
            MissionProfile::Racing
        } else if HEAVY_CUES.iter().any(|cue| lower.contains(cue)) {
            MissionProfile::HeavyLift
        } else {
            MissionProfile::General
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MissionProfile::Rescue => "rescue",
            MissionProfile::Racing => "racing",
            MissionProfile::HeavyLift => "heavy-lift",
            MissionProfile::General => "general",
        }
    }
}
