//! File-backed stores: a JSON task store keyed by the
//! (`task_id`, `target`) identity pair, and a read-only drone
//! configuration store.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use hivesched_core::error::{HiveError, Result};
use hivesched_core::traits::{DroneStore, TaskStore};
use hivesched_core::types::{Task, TaskStatus, TaskUpdate};

/// Tasks persisted as a JSON array, rewritten on every update.
pub struct FileTaskStore {
    path: PathBuf,
    tasks: RwLock<Vec<Task>>,
}

impl FileTaskStore {
    /// Open a task store file, creating an empty store if the file
    /// does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tasks = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)
                .map_err(|e| HiveError::Store(format!("Failed to parse task store: {e}")))?
        } else {
            Vec::new()
        };
        Ok(Self {
            path,
            tasks: RwLock::new(tasks),
        })
    }

    /// Insert or replace a task by identity pair.
    pub async fn put(&self, task: Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        match tasks
            .iter_mut()
            .find(|t| t.task_id == task.task_id && t.target == task.target)
        {
            Some(existing) => *existing = task,
            None => tasks.push(task),
        }
        self.persist(&tasks)
    }

    fn persist(&self, tasks: &[Task]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(tasks)
            .map_err(|e| HiveError::Store(format!("Failed to serialize task store: {e}")))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

fn apply(task: &mut Task, patch: TaskUpdate) {
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(next_fire) = patch.next_fire {
        task.next_fire = next_fire;
    }
    if let Some(last_fired) = patch.last_fired {
        task.last_fired = Some(last_fired);
    }
    if let Some(params) = patch.scheduler_params {
        task.scheduler_params = params;
    }
    if let Some(count) = patch.error_count {
        task.error_count = count;
    }
    if let Some(last_error) = patch.last_error {
        task.last_error = last_error;
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Active && t.next_fire.is_some_and(|f| f <= now))
            .cloned()
            .collect())
    }

    async fn get(&self, task_id: &str, target: &str) -> Result<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .find(|t| t.task_id == task_id && t.target == target)
            .cloned())
    }

    async fn update(&self, task_id: &str, target: &str, patch: TaskUpdate) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks
            .iter_mut()
            .find(|t| t.task_id == task_id && t.target == target)
        else {
            return Err(HiveError::Store(format!(
                "Task {task_id}/{target} not found"
            )));
        };
        apply(task, patch);
        let updated = task.clone();
        self.persist(&tasks)?;
        Ok(updated)
    }
}

/// Drone configuration records, loaded once from a JSON object of
/// drone id → configuration.
pub struct FileDroneStore {
    drones: HashMap<String, Value>,
}

impl FileDroneStore {
    /// Open a drone store file; a missing file yields an empty hive.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let drones = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)
                .map_err(|e| HiveError::Store(format!("Failed to parse drone store: {e}")))?
        } else {
            HashMap::new()
        };
        Ok(Self { drones })
    }
}

#[async_trait]
impl DroneStore for FileDroneStore {
    async fn list_drones(&self, limit: usize) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.drones.keys().cloned().collect();
        ids.sort();
        ids.truncate(limit);
        Ok(ids)
    }

    async fn get_drone_config(&self, drone_id: &str) -> Result<Option<Value>> {
        Ok(self.drones.get(drone_id).cloned())
    }
}
