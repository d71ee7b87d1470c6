//! Simulation description document (URDF)
//!
//! A flat chain of rigid links joined by fixed joints, one link per mesh.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LINK_MASS_KG: f64 = 1.0;
/// Aluminium, kg/m³
pub const DEFAULT_DENSITY: f64 = 2700.0;
const CHILD_JOINT_OFFSET_Z: f64 = 0.05;
const MESH_SCALE: &str = "0.001 0.001 0.001";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub name: String,
    /// Mesh path relative to the export root
    pub mesh: String,
    pub mass_kg: f64,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    pub parent: String,
    pub child: String,
    pub origin_xyz: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionDocument {
    pub robot_name: String,
    pub links: Vec<LinkSpec>,
    pub joints: Vec<JointSpec>,
}

impl DescriptionDocument {
    /// Build the link chain from `(mesh path, stated mass)` pairs.
    ///
    /// `joint_0` fixes `link_0` to the world; every later link hangs off the
    /// previous one 5 cm up.
    pub fn chain(robot_name: impl Into<String>, meshes: &[(String, Option<f64>)]) -> Self {
        let links: Vec<LinkSpec> = meshes
            .iter()
            .enumerate()
            .map(|(i, (mesh, mass))| LinkSpec {
                name: format!("link_{}", i),
                mesh: mesh.clone(),
                mass_kg: mass.unwrap_or(DEFAULT_LINK_MASS_KG),
                density: DEFAULT_DENSITY,
            })
            .collect();

        let joints = links
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let (parent, origin_xyz) = if i == 0 {
                    ("world".to_string(), [0.0, 0.0, 0.0])
                } else {
                    (links[i - 1].name.clone(), [0.0, 0.0, CHILD_JOINT_OFFSET_Z])
                };
                JointSpec {
                    name: format!("joint_{}", i),
                    parent,
                    child: link.name.clone(),
                    origin_xyz,
                }
            })
            .collect();

        Self {
            robot_name: robot_name.into(),
            links,
            joints,
        }
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" ?>\n");
        out.push_str(&format!("<robot name=\"{}\">\n", escape(&self.robot_name)));

        // Fixed joints to "world" need the link to exist
        if self.joints.iter().any(|j| j.parent == "world") {
            out.push_str("  <link name=\"world\"/>\n");
        }

        for link in &self.links {
            let inertia = link.mass_kg / 12.0 * 0.01;
            let mesh = escape(&link.mesh);
            out.push_str(&format!("  <link name=\"{}\">\n", escape(&link.name)));
            out.push_str("    <inertial>\n");
            out.push_str(&format!("      <mass value=\"{}\"/>\n", link.mass_kg));
            out.push_str(&format!(
                "      <inertia ixx=\"{i}\" ixy=\"0\" ixz=\"0\" iyy=\"{i}\" iyz=\"0\" izz=\"{i}\"/>\n",
                i = inertia
            ));
            out.push_str("    </inertial>\n");
            for tag in ["visual", "collision"] {
                out.push_str(&format!("    <{}>\n", tag));
                out.push_str("      <origin xyz=\"0 0 0\" rpy=\"0 0 0\"/>\n");
                out.push_str(&format!(
                    "      <geometry><mesh filename=\"{}\" scale=\"{}\"/></geometry>\n",
                    mesh, MESH_SCALE
                ));
                out.push_str(&format!("    </{}>\n", tag));
            }
            out.push_str("  </link>\n");
        }

        for joint in &self.joints {
            let [x, y, z] = joint.origin_xyz;
            out.push_str(&format!(
                "  <joint name=\"{}\" type=\"fixed\">\n",
                escape(&joint.name)
            ));
            out.push_str(&format!("    <parent link=\"{}\"/>\n", escape(&joint.parent)));
            out.push_str(&format!("    <child link=\"{}\"/>\n", escape(&joint.child)));
            out.push_str(&format!("    <origin xyz=\"{} {} {}\" rpy=\"0 0 0\"/>\n", x, y, z));
            out.push_str("  </joint>\n");
        }

        out.push_str("  <gravity x=\"0\" y=\"0\" z=\"-9.81\"/>\n");
        out.push_str("</robot>\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_links() -> DescriptionDocument {
        DescriptionDocument::chain(
            "quad",
            &[
                ("meshes/fuselage.stl".to_string(), None),
                ("meshes/arm_1.stl".to_string(), Some(0.2)),
                ("meshes/arm_2.stl".to_string(), None),
            ],
        )
    }

    #[test]
    fn test_chain_links_and_masses() {
        let doc = three_links();
        assert_eq!(doc.links.len(), 3);
        assert_eq!(doc.links[0].name, "link_0");
        assert_eq!(doc.links[0].mass_kg, DEFAULT_LINK_MASS_KG);
        assert_eq!(doc.links[1].mass_kg, 0.2);
        assert!(doc.links.iter().all(|l| l.density == 2700.0));
    }

    #[test]
    fn test_chain_joints() {
        let doc = three_links();
        assert_eq!(doc.joints.len(), 3);
        assert_eq!(doc.joints[0].name, "joint_0");
        assert_eq!(doc.joints[0].parent, "world");
        assert_eq!(doc.joints[0].origin_xyz, [0.0, 0.0, 0.0]);
        assert_eq!(doc.joints[2].parent, "link_1");
        assert_eq!(doc.joints[2].child, "link_2");
        assert_eq!(doc.joints[2].origin_xyz, [0.0, 0.0, 0.05]);
    }

    #[test]
    fn test_xml_contents() {
        let xml = three_links().to_xml();
        assert!(xml.contains("<robot name=\"quad\">"));
        assert!(xml.contains("<link name=\"world\"/>"));
        assert!(xml.contains("<mesh filename=\"meshes/arm_1.stl\""));
        assert!(xml.contains("<origin xyz=\"0 0 0.05\" rpy=\"0 0 0\"/>"));
        assert!(xml.contains("<gravity x=\"0\" y=\"0\" z=\"-9.81\"/>"));
        assert_eq!(xml.matches("<joint ").count(), 3);
        assert!(xml.trim_end().ends_with("</robot>"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b&\"c\""), "a&lt;b&amp;&quot;c&quot;");
    }
}
