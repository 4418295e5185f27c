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

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RepositoryError;
use crate::message::{ScheduledTask, ScheduledTaskId, TaskStatus};

/// Durable store of deferred requests.
///
/// State changes are atomic per task: when several schedulers race on the same
/// task exactly one of them observes each transition.
#[async_trait]
pub trait ScheduledTaskRepository: Send + Sync {
    /// Persists a task. Returns only once the task is durable.
    async fn save(&self, task: ScheduledTask) -> Result<(), RepositoryError>;

    async fn get(&self, id: &ScheduledTaskId) -> Result<Option<ScheduledTask>, RepositoryError>;

    /// Moves up to `limit` elapsed `Created` tasks to `Due` and returns their ids,
    /// earliest scheduled time first.
    async fn mark_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledTaskId>, RepositoryError>;

    /// Atomically moves a `Due` task to `Dispatched` and returns it. Any other
    /// state, or an unknown id, yields `None`.
    async fn claim(&self, id: &ScheduledTaskId) -> Result<Option<ScheduledTask>, RepositoryError>;

    /// Moves a `Created` task to `Cancelled`. Returns whether it did.
    async fn cancel(&self, id: &ScheduledTaskId) -> Result<bool, RepositoryError>;

    async fn delete(&self, id: &ScheduledTaskId) -> Result<(), RepositoryError>;

    async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<ScheduledTask>, RepositoryError>;
}
