//! Mission Manager implementation
//!
//! MissionManager owns the collaborators and the mission store. Each submitted
//! mission runs as its own tokio task; its state is persisted after every
//! stage so other processes can poll it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::decision::MAX_ITERATIONS;
use crate::domain::{StabilityMetrics, Status, WorkflowState};
use crate::error::{AeroforgeError, Result};
use crate::id::{generate_mission_id, now_ms};
use crate::storage::{HasId, JsonlStorage, MISSIONS, Storage};
use crate::workflow::{Collaborators, MissionContext, StateObserver};

/// Persisted form of a mission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRecord {
    pub id: String,
    pub max_iterations: u32,
    pub created_at: u64,
    pub updated_at: u64,
    pub state: WorkflowState,
}

impl HasId for MissionRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Progress snapshot for polling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionStatus {
    pub id: String,
    pub status: Status,
    pub iteration: u32,
    pub logs: Vec<String>,
    pub errors: Vec<String>,
    pub metrics: StabilityMetrics,
}

/// What a mission produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionResults {
    pub id: String,
    pub status: Status,
    /// Every file under the mission's output namespace
    pub files: Vec<PathBuf>,
    pub metrics: StabilityMetrics,
    pub artifact: Option<String>,
    pub artifact_location: Option<PathBuf>,
    pub feedback: Option<String>,
}

/// Writes the mission record after every published stage
struct RecordPublisher {
    storage: Arc<JsonlStorage>,
    max_iterations: u32,
    created_at: u64,
}

#[async_trait]
impl StateObserver for RecordPublisher {
    async fn publish(&self, mission_id: &str, state: &WorkflowState) {
        let record = MissionRecord {
            id: mission_id.to_string(),
            max_iterations: self.max_iterations,
            created_at: self.created_at,
            updated_at: now_ms(),
            state: state.clone(),
        };
        if let Err(e) = self.storage.upsert(MISSIONS, &record) {
            log::error!("failed to persist mission {}: {}", mission_id, e);
        }
    }
}

struct RunningMission {
    cancel: CancellationToken,
    handle: Option<JoinHandle<WorkflowState>>,
}

/// Configuration for the MissionManager
#[derive(Debug, Clone)]
pub struct MissionManagerConfig {
    pub output_root: PathBuf,
    pub default_max_iterations: u32,
}

impl Default for MissionManagerConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            default_max_iterations: MAX_ITERATIONS,
        }
    }
}

/// Submits, tracks and cancels missions
pub struct MissionManager {
    storage: Arc<JsonlStorage>,
    collaborators: Collaborators,
    config: MissionManagerConfig,
    running: RwLock<HashMap<String, RunningMission>>,
}

impl MissionManager {
    pub fn new(storage: Arc<JsonlStorage>, collaborators: Collaborators, config: MissionManagerConfig) -> Self {
        Self {
            storage,
            collaborators,
            config,
            running: RwLock::new(HashMap::new()),
        }
    }

    /// Start a mission in the background and return its id
    pub async fn submit(&self, prompt: &str, max_iterations: Option<u32>) -> Result<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AeroforgeError::InvalidState("mission prompt is empty".to_string()));
        }

        self.prune_finished().await;
        let mission_id = generate_mission_id();
        let max_iterations = max_iterations.unwrap_or(self.config.default_max_iterations).max(1);
        let cancel = CancellationToken::new();
        let ctx = MissionContext::new(&mission_id, &self.config.output_root)
            .with_max_iterations(max_iterations)
            .with_cancel(cancel.clone());

        let state = WorkflowState::new(prompt);
        let publisher = Arc::new(RecordPublisher {
            storage: self.storage.clone(),
            max_iterations,
            created_at: now_ms(),
        });
        // Record exists before the task starts so status() never misses it
        publisher.publish(&mission_id, &state).await;

        let controller = self.collaborators.controller().with_observer(publisher.clone());
        let handle = tokio::spawn(async move {
            let mut state = state;
            controller.run(&mut state, &ctx).await;
            publisher.publish(&ctx.mission_id, &state).await;
            state
        });

        log::info!("submitted mission {} ({} iterations max)", mission_id, max_iterations);
        self.running.write().await.insert(
            mission_id.clone(),
            RunningMission {
                cancel,
                handle: Some(handle),
            },
        );
        Ok(mission_id)
    }

    /// Drop tasks that ended without anyone waiting on them
    async fn prune_finished(&self) {
        self.running
            .write()
            .await
            .retain(|_, mission| mission.handle.as_ref().is_none_or(|h| !h.is_finished()));
    }

    /// Missions whose task is still tracked by this manager
    pub async fn running_count(&self) -> usize {
        self.prune_finished().await;
        self.running.read().await.len()
    }

    fn record(&self, mission_id: &str) -> Result<MissionRecord> {
        self.storage
            .get(MISSIONS, mission_id)?
            .ok_or_else(|| AeroforgeError::MissionNotFound(mission_id.to_string()))
    }

    pub async fn status(&self, mission_id: &str) -> Result<MissionStatus> {
        self.prune_finished().await;
        let record = self.record(mission_id)?;
        Ok(status_of(&record))
    }

    pub async fn results(&self, mission_id: &str) -> Result<MissionResults> {
        let record = self.record(mission_id)?;
        let files = mission_files(&self.config.output_root, mission_id)?;
        let state = record.state;
        Ok(MissionResults {
            id: record.id,
            status: state.status,
            files,
            metrics: state.simulation_metrics,
            artifact: state.artifact,
            artifact_location: state.artifact_location,
            feedback: state.feedback,
        })
    }

    /// Request cooperative cancellation; takes effect between stages
    pub async fn cancel(&self, mission_id: &str) -> Result<()> {
        if let Some(mission) = self.running.read().await.get(mission_id) {
            log::info!("cancelling mission {}", mission_id);
            mission.cancel.cancel();
            return Ok(());
        }

        let record = self.record(mission_id)?;
        if record.state.is_terminal() {
            return Err(AeroforgeError::InvalidState(format!(
                "mission {} already {}",
                mission_id, record.state.status
            )));
        }
        Err(AeroforgeError::InvalidState(format!(
            "mission {} is not running in this process",
            mission_id
        )))
    }

    /// Wait for a mission to reach a terminal status
    pub async fn wait(&self, mission_id: &str) -> Result<WorkflowState> {
        let handle = {
            let mut running = self.running.write().await;
            running.get_mut(mission_id).and_then(|m| m.handle.take())
        };

        let Some(handle) = handle else {
            return Ok(self.record(mission_id)?.state);
        };

        let state = handle
            .await
            .map_err(|e| AeroforgeError::InvalidState(format!("mission task failed: {}", e)))?;
        self.running.write().await.remove(mission_id);
        Ok(state)
    }

    /// All known missions, oldest first
    pub async fn list(&self) -> Result<Vec<MissionRecord>> {
        let mut records: Vec<MissionRecord> = self.storage.list(MISSIONS)?;
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

pub fn status_of(record: &MissionRecord) -> MissionStatus {
    MissionStatus {
        id: record.id.clone(),
        status: record.state.status,
        iteration: record.state.iteration,
        logs: record.state.logs.clone(),
        errors: record.state.errors.iter().map(|e| e.message.clone()).collect(),
        metrics: record.state.simulation_metrics.clone(),
    }
}

/// Files under `<output_root>/<mission_id>/`, sorted
pub fn mission_files(output_root: &Path, mission_id: &str) -> Result<Vec<PathBuf>> {
    let base = output_root.join(mission_id);
    let pattern = format!("{}/**/*", glob::Pattern::escape(&base.to_string_lossy()));
    let entries = glob::glob(&pattern).map_err(|e| AeroforgeError::Storage(e.to_string()))?;

    let mut files: Vec<PathBuf> = entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> MissionManager {
        let storage = Arc::new(JsonlStorage::new(temp.path().join("store")).unwrap());
        MissionManager::new(
            storage,
            Collaborators::offline(false),
            MissionManagerConfig {
                output_root: temp.path().join("output"),
                default_max_iterations: MAX_ITERATIONS,
            },
        )
    }

    #[tokio::test]
    async fn test_submit_and_wait() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);

        let id = manager.submit("Design a heavy-lift cargo drone", None).await.unwrap();
        let state = manager.wait(&id).await.unwrap();

        assert_eq!(state.status, Status::Complete);
        assert_eq!(state.iteration, 2);

        let status = manager.status(&id).await.unwrap();
        assert_eq!(status.status, Status::Complete);
        assert!(status.logs.iter().any(|l| l.contains("Decision: finish")));

        let results = manager.results(&id).await.unwrap();
        assert!(results.files.iter().any(|f| f.ends_with("iteration-02/urdf/design.urdf")));
        assert!(results.files.iter().any(|f| f.ends_with("iteration-01/meshes/fuselage.stl")));
        assert!(results.artifact.is_some());
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let temp = TempDir::new().unwrap();
        let err = manager(&temp).submit("   ", None).await.unwrap_err();
        assert!(matches!(err, AeroforgeError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_unknown_mission() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);
        assert!(matches!(
            manager.status("missing").await,
            Err(AeroforgeError::MissionNotFound(_))
        ));
        assert!(manager.cancel("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_finished_mission_is_invalid() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);
        let id = manager.submit("A survey drone", Some(2)).await.unwrap();
        manager.wait(&id).await.unwrap();

        let err = manager.cancel(&id).await.unwrap_err();
        assert!(err.to_string().contains("already complete"));
    }

    #[tokio::test]
    async fn test_list_orders_by_creation() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);
        let first = manager.submit("A survey drone", Some(1)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = manager.submit("Build a racing drone", Some(1)).await.unwrap();
        manager.wait(&first).await.unwrap();
        manager.wait(&second).await.unwrap();

        let ids: Vec<String> = manager.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn test_unwaited_missions_are_pruned_and_persisted() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);
        let mut ids = Vec::new();
        for prompt in ["A survey drone", "Build a racing drone", "Heavy cargo lifter", "Mountain rescue drone"] {
            ids.push(manager.submit(prompt, Some(2)).await.unwrap());
        }

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(20);
        while manager.running_count().await > 0 {
            assert!(std::time::Instant::now() < deadline, "missions never finished");
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        let reopened = JsonlStorage::new(temp.path().join("store")).unwrap();
        for id in &ids {
            let record: MissionRecord = reopened.get(MISSIONS, id).unwrap().unwrap();
            assert!(record.state.is_terminal(), "mission {} left at {}", id, record.state.status);
            assert_eq!(manager.status(id).await.unwrap().status, record.state.status);
        }

        let state = manager.wait(&ids[0]).await.unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_mission_files_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(mission_files(temp.path(), "nothing").unwrap().is_empty());
    }
}
