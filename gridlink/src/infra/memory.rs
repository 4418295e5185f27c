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

//! In-memory stores backed by [`DashMap`].

use std::ops::Deref;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gridlink_core::prelude::{
    DeviceRecord, DeviceRepository, RepositoryError, ScheduledTask, ScheduledTaskId,
    ScheduledTaskRepository, TaskStatus,
};
use tracing::trace;

#[derive(Debug, Default)]
pub struct InMemoryDeviceRepository {
    devices: DashMap<String, DeviceRecord>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(self, record: DeviceRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn insert(&self, record: DeviceRecord) {
        self.devices
            .insert(record.device_identification.clone(), record);
    }

    pub fn get(&self, device: &str) -> Option<DeviceRecord> {
        self.devices.get(device).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn find_owner_organisation(&self, device: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .devices
            .get(device)
            .and_then(|r| r.owner_organisation.clone()))
    }

    async fn find_device_ip_address(&self, device: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.devices.get(device).and_then(|r| r.ip_address.clone()))
    }

    async fn device_exists(&self, device: &str) -> Result<bool, RepositoryError> {
        Ok(self.devices.contains_key(device))
    }

    async fn save_device(&self, record: DeviceRecord) -> Result<(), RepositoryError> {
        trace!(device = %record.device_identification, "saving device");
        self.insert(record);
        Ok(())
    }

    async fn add_device(&self, record: DeviceRecord) -> Result<bool, RepositoryError> {
        match self.devices.entry(record.device_identification.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                trace!(device = %record.device_identification, "adding device");
                slot.insert(record);
                Ok(true)
            }
        }
    }
}

/// Scheduled tasks held in a concurrent map.
///
/// Each transition runs under the shard lock of its entry, so racing callers
/// see every transition at most once.
#[derive(Debug, Default)]
pub struct InMemoryScheduledTaskRepository {
    tasks: DashMap<ScheduledTaskId, ScheduledTask>,
}

impl InMemoryScheduledTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn transition(&self, id: &ScheduledTaskId, from: TaskStatus, to: TaskStatus) -> Option<ScheduledTask> {
        let mut entry = self.tasks.get_mut(id)?;
        if entry.status != from || !from.can_transition_to(to) {
            return None;
        }
        entry.status = to;
        Some(entry.clone())
    }
}

/// Ids of the tasks due at `now`, earliest first, at most `limit` of them.
pub(crate) fn due_candidates<T: Deref<Target = ScheduledTask>>(
    tasks: impl IntoIterator<Item = T>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ScheduledTaskId> {
    let mut due: Vec<_> = tasks
        .into_iter()
        .filter(|t| t.is_due(now))
        .map(|t| (t.scheduled_time, t.id.clone()))
        .collect();
    due.sort();
    due.into_iter().take(limit).map(|(_, id)| id).collect()
}

#[async_trait]
impl ScheduledTaskRepository for InMemoryScheduledTaskRepository {
    async fn save(&self, task: ScheduledTask) -> Result<(), RepositoryError> {
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get(&self, id: &ScheduledTaskId) -> Result<Option<ScheduledTask>, RepositoryError> {
        Ok(self.tasks.get(id).map(|t| t.value().clone()))
    }

    async fn mark_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledTaskId>, RepositoryError> {
        let candidates = due_candidates(self.tasks.iter(), now, limit);
        Ok(candidates
            .into_iter()
            .filter(|id| {
                self.transition(id, TaskStatus::Created, TaskStatus::Due)
                    .is_some()
            })
            .collect())
    }

    async fn claim(&self, id: &ScheduledTaskId) -> Result<Option<ScheduledTask>, RepositoryError> {
        Ok(self.transition(id, TaskStatus::Due, TaskStatus::Dispatched))
    }

    async fn cancel(&self, id: &ScheduledTaskId) -> Result<bool, RepositoryError> {
        Ok(self
            .transition(id, TaskStatus::Created, TaskStatus::Cancelled)
            .is_some())
    }

    async fn delete(&self, id: &ScheduledTaskId) -> Result<(), RepositoryError> {
        self.tasks.remove(id);
        Ok(())
    }

    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<ScheduledTask>, RepositoryError> {
        let mut tasks: Vec<_> = self
            .tasks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| t.value().clone())
            .collect();
        tasks.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
        Ok(tasks)
    }
}
