//! Telemetry and stability metrics.
//!
//! Telemetry is the raw time series a simulation produces; `StabilityMetrics`
//! is the scalar summary the decision stage reasons about.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

pub const STABILITY_SCORE: &str = "stability_score";
pub const MAX_ACCELERATION: &str = "max_acceleration";
pub const POSITION_DRIFT: &str = "position_drift";
pub const ENERGY_EFFICIENCY: &str = "energy_efficiency";
pub const SAFETY_FACTOR: &str = "safety_factor";
pub const MAX_VELOCITY: &str = "max_velocity";
pub const VELOCITY_STD: &str = "velocity_std";

const GRAVITY: f64 = 9.81;
const HOVER_MASS_KG: f64 = 1.0;

/// Time-series output of one simulation episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    pub time: Vec<f64>,
    pub positions: Vec<[f64; 3]>,
    pub velocities: Vec<[f64; 3]>,
    pub forces: Vec<[f64; 3]>,
    pub energies: Vec<f64>,
    /// True when the series was synthesised rather than simulated
    #[serde(alias = "mock")]
    pub synthetic: bool,
}

impl Telemetry {
    /// Number of samples captured
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Hover trace of a 1 kg airframe: small circular x/y wander and a slow
    /// vertical bob around 1 m, with thrust and energy derived from it.
    pub fn hover(steps: usize, dt: f64) -> Self {
        let time: Vec<f64> = (0..steps).map(|i| i as f64 * dt).collect();
        let positions: Vec<[f64; 3]> = time
            .iter()
            .map(|&t| {
                [
                    0.1 * (2.0 * PI * 0.3 * t).sin(),
                    0.1 * (2.0 * PI * 0.3 * t).cos(),
                    1.0 + 0.1 * (2.0 * PI * 0.5 * t).sin(),
                ]
            })
            .collect();

        let velocities: Vec<[f64; 3]> = gradient3(&positions)
            .into_iter()
            .map(|g| [g[0] / dt, g[1] / dt, g[2] / dt])
            .collect();

        let vz: Vec<f64> = velocities.iter().map(|v| v[2]).collect();
        let forces: Vec<[f64; 3]> = gradient(&vz)
            .into_iter()
            .map(|dvz| [0.0, 0.0, HOVER_MASS_KG * GRAVITY + HOVER_MASS_KG * dvz / dt])
            .collect();

        let energies: Vec<f64> = positions
            .iter()
            .zip(&velocities)
            .map(|(p, v)| 0.5 * HOVER_MASS_KG * norm_sq(*v) + HOVER_MASS_KG * GRAVITY * p[2])
            .collect();

        Self {
            time,
            positions,
            velocities,
            forces,
            energies,
            synthetic: true,
        }
    }
}

/// Scalar metrics derived from telemetry (or synthesised).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StabilityMetrics {
    values: BTreeMap<String, f64>,
}

impl StabilityMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }

    /// Stability score, 0.0 when missing
    pub fn stability_score(&self) -> f64 {
        self.get(STABILITY_SCORE).unwrap_or(0.0)
    }

    /// Peak acceleration in m/s², 100.0 when missing
    pub fn max_acceleration(&self) -> f64 {
        self.get(MAX_ACCELERATION).unwrap_or(100.0)
    }

    /// Position drift in metres, 100.0 when missing
    pub fn position_drift(&self) -> f64 {
        self.get(POSITION_DRIFT).unwrap_or(100.0)
    }

    /// One-line human summary used in logs and prompts
    pub fn summary(&self) -> String {
        if self.values.is_empty() {
            return "no metrics".to_string();
        }
        self.values
            .iter()
            .map(|(k, v)| format!("{}={:.3}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Summarise telemetry into stability metrics.
///
/// Empty position data yields empty metrics.
pub fn analyze_telemetry(telemetry: &Telemetry) -> StabilityMetrics {
    let mut metrics = StabilityMetrics::new();
    if telemetry.positions.is_empty() {
        return metrics;
    }

    let drift = (0..3)
        .map(|axis| std_dev(telemetry.positions.iter().map(|p| p[axis])))
        .sum::<f64>()
        / 3.0;
    metrics.set(POSITION_DRIFT, drift);

    if !telemetry.velocities.is_empty() {
        let speeds: Vec<f64> = telemetry.velocities.iter().map(|v| norm_sq(*v).sqrt()).collect();
        metrics.set(MAX_VELOCITY, speeds.iter().copied().fold(0.0, f64::max));
        metrics.set(VELOCITY_STD, std_dev(speeds.iter().copied()));
    }

    if telemetry.velocities.len() > 1 {
        let peak = gradient3(&telemetry.velocities)
            .into_iter()
            .map(|a| norm_sq(a).sqrt())
            .fold(0.0, f64::max);
        metrics.set(MAX_ACCELERATION, peak);
    }

    metrics.set(STABILITY_SCORE, (1.0 - drift).max(0.0));
    metrics
}

fn norm_sq(v: [f64; 3]) -> f64 {
    v[0] * v[0] + v[1] * v[1] + v[2] * v[2]
}

/// Population standard deviation
fn std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n == 0 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    var.sqrt()
}

/// Per-sample gradient: one-sided at the ends, central in the interior.
fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    (values[i + 1] - values[i - 1]) / 2.0
                }
            })
            .collect(),
    }
}

fn gradient3(values: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let axes: Vec<Vec<f64>> = (0..3)
        .map(|axis| gradient(&values.iter().map(|v| v[axis]).collect::<Vec<_>>()))
        .collect();
    (0..values.len())
        .map(|i| [axes[0][i], axes[1][i], axes[2][i]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metrics_use_pessimistic_defaults() {
        let metrics = StabilityMetrics::new();
        assert_eq!(metrics.stability_score(), 0.0);
        assert_eq!(metrics.max_acceleration(), 100.0);
        assert_eq!(metrics.position_drift(), 100.0);
    }

    #[test]
    fn test_metrics_serialize_as_flat_map() {
        let metrics = StabilityMetrics::new().with(STABILITY_SCORE, 0.9);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["stability_score"], 0.9);
    }

    #[test]
    fn test_summary_lists_keys_in_order() {
        let metrics = StabilityMetrics::new()
            .with(STABILITY_SCORE, 0.9)
            .with(MAX_ACCELERATION, 8.0);
        assert_eq!(metrics.summary(), "max_acceleration=8.000, stability_score=0.900");
        assert_eq!(StabilityMetrics::new().summary(), "no metrics");
    }

    #[test]
    fn test_gradient_matches_central_differences() {
        assert_eq!(gradient(&[0.0, 1.0, 3.0]), vec![1.0, 1.5, 2.0]);
        assert_eq!(gradient(&[5.0]), vec![0.0]);
        assert!(gradient(&[]).is_empty());
    }

    #[test]
    fn test_analyze_stationary_airframe_is_fully_stable() {
        let telemetry = Telemetry {
            time: vec![0.0, 0.01, 0.02],
            positions: vec![[0.0, 0.0, 1.0]; 3],
            velocities: vec![[0.0, 0.0, 0.0]; 3],
            ..Default::default()
        };
        let metrics = analyze_telemetry(&telemetry);
        assert_eq!(metrics.position_drift(), 0.0);
        assert_eq!(metrics.stability_score(), 1.0);
        assert_eq!(metrics.max_acceleration(), 0.0);
    }

    #[test]
    fn test_analyze_hand_computed_values() {
        let telemetry = Telemetry {
            time: vec![0.0, 1.0, 2.0],
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            velocities: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [3.0, 0.0, 0.0]],
            ..Default::default()
        };
        let metrics = analyze_telemetry(&telemetry);

        // std of x = sqrt(2/3), y and z contribute nothing
        let expected_drift = (2.0f64 / 3.0).sqrt() / 3.0;
        assert!((metrics.position_drift() - expected_drift).abs() < 1e-9);
        assert!((metrics.max_acceleration() - 2.0).abs() < 1e-9);
        assert_eq!(metrics.get(MAX_VELOCITY), Some(3.0));
        assert!((metrics.stability_score() - (1.0 - expected_drift)).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_empty_telemetry() {
        assert!(analyze_telemetry(&Telemetry::default()).is_empty());
    }

    #[test]
    fn test_hover_trace_shape() {
        let telemetry = Telemetry::hover(500, 0.01);
        assert_eq!(telemetry.len(), 500);
        assert_eq!(telemetry.positions.len(), 500);
        assert_eq!(telemetry.forces.len(), 500);
        assert!(telemetry.synthetic);
        assert!((telemetry.positions[0][2] - 1.0).abs() < 1e-9);
        // thrust hovers around m * g
        let mean_thrust = telemetry.forces.iter().map(|f| f[2]).sum::<f64>() / 500.0;
        assert!((mean_thrust - 9.81).abs() < 0.5);
    }
}
