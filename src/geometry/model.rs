//! In-memory airframe assembly

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::domain::MissionProfile;

/// Solid primitive, dimensions in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Primitive {
    Box { length: f64, width: f64, height: f64 },
    Cylinder { radius: f64, height: f64 },
    Sphere { radius: f64 },
}

impl Primitive {
    pub fn keyword(&self) -> &'static str {
        match self {
            Primitive::Box { .. } => "box",
            Primitive::Cylinder { .. } => "cylinder",
            Primitive::Sphere { .. } => "sphere",
        }
    }

    pub fn dimensions(&self) -> Vec<f64> {
        match *self {
            Primitive::Box { length, width, height } => vec![length, width, height],
            Primitive::Cylinder { radius, height } => vec![radius, height],
            Primitive::Sphere { radius } => vec![radius],
        }
    }

    /// Volume in cubic millimetres
    pub fn volume_mm3(&self) -> f64 {
        match *self {
            Primitive::Box { length, width, height } => length * width * height,
            Primitive::Cylinder { radius, height } => PI * radius * radius * height,
            Primitive::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
        }
    }
}

/// Position (mm) and XYZ Euler rotation (degrees) of a component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: [f64; 3],
    pub rotation_deg: [f64; 3],
}

impl Placement {
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: [x, y, z],
            rotation_deg: [0.0; 3],
        }
    }

    pub fn rotated(mut self, rx: f64, ry: f64, rz: f64) -> Self {
        self.rotation_deg = [rx, ry, rz];
        self
    }

    /// Rotate then translate a local point
    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let [rx, ry, rz] = self.rotation_deg.map(f64::to_radians);

        let (s, c) = rx.sin_cos();
        let p = [p[0], c * p[1] - s * p[2], s * p[1] + c * p[2]];
        let (s, c) = ry.sin_cos();
        let p = [c * p[0] + s * p[2], p[1], -s * p[0] + c * p[2]];
        let (s, c) = rz.sin_cos();
        let p = [c * p[0] - s * p[1], s * p[0] + c * p[1], p[2]];

        [
            p[0] + self.position[0],
            p[1] + self.position[1],
            p[2] + self.position[2],
        ]
    }
}

/// One rigid part of the assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub primitive: Primitive,
    #[serde(default)]
    pub placement: Placement,
    /// Stated mass; export applies the default when absent
    pub mass_kg: Option<f64>,
}

impl Component {
    pub fn new(name: impl Into<String>, primitive: Primitive, placement: Placement) -> Self {
        Self {
            name: name.into(),
            primitive,
            placement,
            mass_kg: None,
        }
    }
}

/// Structured geometric model produced from an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricModel {
    pub name: String,
    pub components: Vec<Component>,
}

/// Preset dimensions of a quadcopter airframe
#[derive(Debug, Clone, Copy, PartialEq)]
struct QuadDimensions {
    fuselage: [f64; 3],
    arm_length: f64,
    arm_radius: f64,
    mount_radius: f64,
    mount_height: f64,
}

impl QuadDimensions {
    fn for_profile(profile: MissionProfile, iteration: u32) -> Self {
        let mut dims = match profile {
            MissionProfile::Rescue => Self {
                fuselage: [140.0, 100.0, 45.0],
                arm_length: 200.0,
                arm_radius: 12.0,
                mount_radius: 30.0,
                mount_height: 10.0,
            },
            MissionProfile::Racing => Self {
                fuselage: [100.0, 40.0, 20.0],
                arm_length: 120.0,
                arm_radius: 6.0,
                mount_radius: 20.0,
                mount_height: 6.0,
            },
            MissionProfile::HeavyLift => Self {
                fuselage: [180.0, 120.0, 60.0],
                arm_length: 250.0,
                arm_radius: 15.0,
                mount_radius: 35.0,
                mount_height: 12.0,
            },
            MissionProfile::General => Self {
                fuselage: [120.0, 80.0, 30.0],
                arm_length: 180.0,
                arm_radius: 10.0,
                mount_radius: 25.0,
                mount_height: 8.0,
            },
        };

        // Later iterations stiffen the arms and widen the mounts
        if iteration > 1 {
            dims.arm_radius = (dims.arm_radius * 1.1).floor();
            dims.mount_radius = (dims.mount_radius * 1.05).floor();
        }
        dims
    }
}

const ARM_ANGLES_DEG: [f64; 4] = [45.0, 135.0, 225.0, 315.0];

impl GeometricModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Deterministic X-frame quadcopter for a mission profile.
    ///
    /// Used when an artifact cannot be materialized; always succeeds.
    pub fn preset(profile: MissionProfile, iteration: u32) -> Self {
        let dims = QuadDimensions::for_profile(profile, iteration);
        let [length, width, height] = dims.fuselage;

        let mut model = GeometricModel::new(format!("{}_quad", profile.label().replace('-', "_")))
            .with_component(Component::new(
                "fuselage",
                Primitive::Box { length, width, height },
                Placement::default(),
            ));

        for (i, angle) in ARM_ANGLES_DEG.iter().enumerate() {
            let (s, c) = angle.to_radians().sin_cos();
            let half = dims.arm_length / 2.0;
            model.components.push(Component::new(
                format!("arm_{}", i + 1),
                Primitive::Cylinder {
                    radius: dims.arm_radius,
                    height: dims.arm_length,
                },
                Placement::at(round1(c * half), round1(s * half), 0.0).rotated(0.0, 90.0, *angle),
            ));
        }

        for (i, angle) in ARM_ANGLES_DEG.iter().enumerate() {
            let (s, c) = angle.to_radians().sin_cos();
            model.components.push(Component::new(
                format!("mount_{}", i + 1),
                Primitive::Cylinder {
                    radius: dims.mount_radius,
                    height: dims.mount_height,
                },
                Placement::at(round1(c * dims.arm_length), round1(s * dims.arm_length), 0.0),
            ));
        }

        model
    }

    /// Total volume of all components in cubic millimetres
    pub fn volume_mm3(&self) -> f64 {
        self.components.iter().map(|c| c.primitive.volume_mm3()).sum()
    }

    /// Render the model as an assembly script
    pub fn to_script(&self) -> String {
        let mut out = format!("robot {}\n", self.name);
        for component in &self.components {
            out.push_str(&format!("component {} {}", component.name, component.primitive.keyword()));
            for dim in component.primitive.dimensions() {
                out.push_str(&format!(" {}", dim));
            }
            let [x, y, z] = component.placement.position;
            if component.placement.position != [0.0; 3] {
                out.push_str(&format!(" at {} {} {}", x, y, z));
            }
            let [rx, ry, rz] = component.placement.rotation_deg;
            if component.placement.rotation_deg != [0.0; 3] {
                out.push_str(&format!(" rot {} {} {}", rx, ry, rz));
            }
            if let Some(mass) = component.mass_kg {
                out.push_str(&format!(" mass {}", mass));
            }
            out.push('\n');
        }
        out
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
