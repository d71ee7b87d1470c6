//! Geometry collaborator
//!
//! Turns a design artifact into a `GeometricModel` and exports that model as
//! STL meshes plus a URDF description document.

pub mod mesh;
pub mod model;
pub mod urdf;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::design::script;
use crate::error::CollaboratorError;

pub use mesh::{Mesh, tessellate, to_ascii_stl};
pub use model::{Component, GeometricModel, Placement, Primitive};
pub use urdf::{DescriptionDocument, JointSpec, LinkSpec};

/// File name of the description document inside `<export dir>/urdf/`
pub const DESCRIPTION_FILE: &str = "design.urdf";

/// Files written by one export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedModel {
    pub description_path: PathBuf,
    pub mesh_files: Vec<PathBuf>,
    pub document: DescriptionDocument,
}

impl ExportedModel {
    /// Meshes followed by the description document
    pub fn all_files(&self) -> Vec<PathBuf> {
        let mut files = self.mesh_files.clone();
        files.push(self.description_path.clone());
        files
    }
}

#[async_trait]
pub trait GeometryKernel: Send + Sync {
    /// Interpret an artifact as a geometric model
    async fn materialize(&self, artifact: &str) -> Result<GeometricModel, CollaboratorError>;

    /// Write meshes and the description document under `dir`
    async fn export(&self, model: &GeometricModel, dir: &Path) -> Result<ExportedModel, CollaboratorError>;
}

/// Kernel for assembly scripts
#[derive(Debug, Clone, Default)]
pub struct ScriptKernel;

impl ScriptKernel {
    pub fn new() -> Self {
        Self
    }

    fn check_model(model: &GeometricModel) -> Result<(), CollaboratorError> {
        if model.components.is_empty() {
            return Err(CollaboratorError::Execution("script defines no components".to_string()));
        }

        let mut seen = HashSet::new();
        for component in &model.components {
            if !seen.insert(component.name.as_str()) {
                return Err(CollaboratorError::Execution(format!(
                    "duplicate component name '{}'",
                    component.name
                )));
            }
            if component.primitive.dimensions().iter().any(|d| !is_positive(*d)) {
                return Err(CollaboratorError::Execution(format!(
                    "component '{}' has a non-positive dimension",
                    component.name
                )));
            }
            if component.mass_kg.is_some_and(|m| !is_positive(m)) {
                return Err(CollaboratorError::Execution(format!(
                    "component '{}' has a non-positive mass",
                    component.name
                )));
            }
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[async_trait]
impl GeometryKernel for ScriptKernel {
    async fn materialize(&self, artifact: &str) -> Result<GeometricModel, CollaboratorError> {
        let parsed = script::parse(artifact).map_err(|e| CollaboratorError::Execution(e.to_string()))?;
        let model = parsed.into_model();
        Self::check_model(&model)?;
        log::debug!("materialized '{}' with {} components", model.name, model.components.len());
        Ok(model)
    }

    async fn export(&self, model: &GeometricModel, dir: &Path) -> Result<ExportedModel, CollaboratorError> {
        if model.components.is_empty() {
            return Err(CollaboratorError::Export("model has no components".to_string()));
        }

        let mesh_dir = dir.join("meshes");
        let urdf_dir = dir.join("urdf");
        for d in [&mesh_dir, &urdf_dir] {
            tokio::fs::create_dir_all(d)
                .await
                .map_err(|e| CollaboratorError::Export(format!("cannot create {}: {}", d.display(), e)))?;
        }

        let mut mesh_files = Vec::with_capacity(model.components.len());
        let mut links = Vec::with_capacity(model.components.len());
        for component in &model.components {
            let file_name = format!("{}.stl", component.name);
            let path = mesh_dir.join(&file_name);
            let stl = to_ascii_stl(&tessellate(component), &component.name);
            tokio::fs::write(&path, stl)
                .await
                .map_err(|e| CollaboratorError::Export(format!("cannot write {}: {}", path.display(), e)))?;
            mesh_files.push(path);
            links.push((format!("meshes/{}", file_name), component.mass_kg));
        }

        let document = DescriptionDocument::chain(&model.name, &links);
        let description_path = urdf_dir.join(DESCRIPTION_FILE);
        tokio::fs::write(&description_path, document.to_xml())
            .await
            .map_err(|e| CollaboratorError::Export(format!("cannot write {}: {}", description_path.display(), e)))?;

        Ok(ExportedModel {
            description_path,
            mesh_files,
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MissionProfile;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_materialize_valid_script() {
        let model = ScriptKernel::new()
            .materialize("robot probe\ncomponent body box 100 80 30\ncomponent cam sphere 10 at 0 0 20\n")
            .await
            .unwrap();
        assert_eq!(model.name, "probe");
        assert_eq!(model.components.len(), 2);
    }

    #[tokio::test]
    async fn test_materialize_rejects_empty_script() {
        let err = ScriptKernel::new().materialize("robot empty\n").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Execution(_)));
    }

    #[tokio::test]
    async fn test_materialize_rejects_duplicate_names() {
        let err = ScriptKernel::new()
            .materialize("component a box 1 1 1\ncomponent a sphere 2\n")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate component name 'a'"));
    }

    #[tokio::test]
    async fn test_materialize_rejects_non_positive_dimension() {
        let err = ScriptKernel::new()
            .materialize("component a box 10 0 10\n")
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Execution(_)));
    }

    #[tokio::test]
    async fn test_materialize_rejects_syntax_error() {
        let err = ScriptKernel::new().materialize("component a cone 1 2\n").await.unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn test_export_writes_meshes_and_description() {
        let temp = TempDir::new().unwrap();
        let model = GeometricModel::preset(MissionProfile::Racing, 1);

        let exported = ScriptKernel::new().export(&model, temp.path()).await.unwrap();

        assert_eq!(exported.mesh_files.len(), 9);
        assert!(exported.mesh_files.iter().all(|p| p.exists()));
        assert_eq!(exported.description_path, temp.path().join("urdf").join("design.urdf"));

        let xml = std::fs::read_to_string(&exported.description_path).unwrap();
        assert!(xml.contains("meshes/fuselage.stl"));
        assert_eq!(exported.document.links.len(), 9);
        assert_eq!(exported.all_files().len(), 10);

        let stl = std::fs::read_to_string(temp.path().join("meshes").join("fuselage.stl")).unwrap();
        assert!(stl.starts_with("solid fuselage"));
    }

    #[tokio::test]
    async fn test_export_into_unwritable_location_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let model = GeometricModel::preset(MissionProfile::General, 1);
        let err = ScriptKernel::new().export(&model, &blocker).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Export(_)));
    }
}
