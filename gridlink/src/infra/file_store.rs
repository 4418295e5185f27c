/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridlink_core::prelude::{
    RepositoryError, ScheduledTask, ScheduledTaskId, ScheduledTaskRepository, TaskStatus,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::infra::memory::due_candidates;

/// Scheduled tasks persisted as a JSON snapshot on disk.
///
/// Every mutation is staged on a copy of the task map, written to a temporary
/// file and renamed over the previous snapshot. The live map is replaced only
/// once the snapshot is on disk, so a failed write leaves memory and disk in
/// agreement and a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileScheduledTaskRepository {
    path: PathBuf,
    tasks: Mutex<HashMap<ScheduledTaskId, ScheduledTask>>,
}

impl FileScheduledTaskRepository {
    /// Opens the store at `path`, loading any tasks already there.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(storage)?;
        }
        let tasks = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let tasks: Vec<ScheduledTask> = serde_json::from_slice(&bytes)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
                tasks.into_iter().map(|t| (t.id.clone(), t)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(storage(e)),
        };
        info!(path = %path.display(), tasks = tasks.len(), "scheduled task store opened");
        Ok(Self {
            path,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tasks: &HashMap<ScheduledTaskId, ScheduledTask>) -> Result<(), RepositoryError> {
        let mut snapshot: Vec<&ScheduledTask> = tasks.values().collect();
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes).await.map_err(storage)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(storage)?;
        debug!(path = %self.path.display(), tasks = snapshot.len(), "snapshot written");
        Ok(())
    }

    async fn transition(
        &self,
        id: &ScheduledTaskId,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<Option<ScheduledTask>, RepositoryError> {
        let mut tasks = self.tasks.lock().await;
        let Some(current) = tasks.get(id) else {
            return Ok(None);
        };
        if current.status != from || !from.can_transition_to(to) {
            return Ok(None);
        }
        let mut task = current.clone();
        task.status = to;
        let mut staged = tasks.clone();
        staged.insert(id.clone(), task.clone());
        self.persist(&staged).await?;
        *tasks = staged;
        Ok(Some(task))
    }
}

fn storage(error: std::io::Error) -> RepositoryError {
    RepositoryError::Storage(error.to_string())
}

#[async_trait]
impl ScheduledTaskRepository for FileScheduledTaskRepository {
    async fn save(&self, task: ScheduledTask) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.lock().await;
        let mut staged = tasks.clone();
        staged.insert(task.id.clone(), task);
        self.persist(&staged).await?;
        *tasks = staged;
        Ok(())
    }

    async fn get(&self, id: &ScheduledTaskId) -> Result<Option<ScheduledTask>, RepositoryError> {
        Ok(self.tasks.lock().await.get(id).cloned())
    }

    async fn mark_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledTaskId>, RepositoryError> {
        let mut tasks = self.tasks.lock().await;
        let due = due_candidates(tasks.values(), now, limit);
        if due.is_empty() {
            return Ok(due);
        }
        let mut staged = tasks.clone();
        for id in &due {
            if let Some(task) = staged.get_mut(id) {
                task.status = TaskStatus::Due;
            }
        }
        self.persist(&staged).await?;
        *tasks = staged;
        Ok(due)
    }

    async fn claim(&self, id: &ScheduledTaskId) -> Result<Option<ScheduledTask>, RepositoryError> {
        self.transition(id, TaskStatus::Due, TaskStatus::Dispatched)
            .await
    }

    async fn cancel(&self, id: &ScheduledTaskId) -> Result<bool, RepositoryError> {
        Ok(self
            .transition(id, TaskStatus::Created, TaskStatus::Cancelled)
            .await?
            .is_some())
    }

    async fn delete(&self, id: &ScheduledTaskId) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.lock().await;
        if !tasks.contains_key(id) {
            return Ok(());
        }
        let mut staged = tasks.clone();
        staged.remove(id);
        self.persist(&staged).await?;
        *tasks = staged;
        Ok(())
    }

    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<ScheduledTask>, RepositoryError> {
        let tasks = self.tasks.lock().await;
        let mut matching: Vec<_> = tasks
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use gridlink_core::prelude::{
        CorrelationId, DeviceMessageMetadata, DomainInfo, MessagePriority, MessageType, Payload,
    };

    use super::*;

    fn task(offset_secs: i64) -> ScheduledTask {
        let metadata = DeviceMessageMetadata::new(
            CorrelationId::from_inbound(format!("C{offset_secs}")).unwrap(),
            "O1".into(),
            "D1".into(),
            MessageType::SynchronizeTime,
            MessagePriority::default(),
            None,
        );
        ScheduledTask::new(
            &metadata,
            DomainInfo::new("SMART_METERING".into(), "1.0".into()),
            None,
            &Payload::Empty,
            Utc::now() + Duration::seconds(offset_secs),
        )
        .unwrap()
    }

    /// Turns the staging path into a directory so every snapshot write fails.
    fn block_staging(path: &Path) {
        std::fs::create_dir_all(path.with_extension("json.tmp")).unwrap();
    }

    fn unblock_staging(path: &Path) {
        std::fs::remove_dir_all(path.with_extension("json.tmp")).unwrap();
    }

    #[tokio::test]
    async fn failed_save_leaves_no_task_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let repository = FileScheduledTaskRepository::open(&path).await.unwrap();
        block_staging(&path);

        let t = task(-1);
        let result = repository.save(t.clone()).await;
        assert!(matches!(result, Err(RepositoryError::Storage(_))));
        assert_eq!(repository.get(&t.id).await.unwrap(), None);
        assert!(repository
            .list_by_status(TaskStatus::Created)
            .await
            .unwrap()
            .is_empty());
        assert!(repository.mark_due(Utc::now(), 10).await.is_ok_and(|due| due.is_empty()));
    }

    #[tokio::test]
    async fn failed_transitions_keep_memory_in_line_with_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let repository = FileScheduledTaskRepository::open(&path).await.unwrap();
        let t = task(-1);
        repository.save(t.clone()).await.unwrap();

        block_staging(&path);
        assert!(repository.mark_due(Utc::now(), 10).await.is_err());
        assert_eq!(
            repository.get(&t.id).await.unwrap().unwrap().status,
            TaskStatus::Created
        );

        unblock_staging(&path);
        assert_eq!(repository.mark_due(Utc::now(), 10).await.unwrap(), vec![t.id.clone()]);

        block_staging(&path);
        assert!(repository.claim(&t.id).await.is_err());
        assert!(repository.delete(&t.id).await.is_err());
        assert_eq!(
            repository.get(&t.id).await.unwrap().unwrap().status,
            TaskStatus::Due
        );

        unblock_staging(&path);
        let claimed = repository.claim(&t.id).await.unwrap().unwrap();
        assert_eq!(claimed.status, TaskStatus::Dispatched);

        let reopened = FileScheduledTaskRepository::open(&path).await.unwrap();
        assert_eq!(
            reopened.get(&t.id).await.unwrap().unwrap().status,
            TaskStatus::Dispatched
        );
    }
}
