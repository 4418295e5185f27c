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

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gridlink_core::prelude::{
    DeviceRequest, DispatchError, DomainInfo, ScheduledTask, ScheduledTaskId,
    ScheduledTaskRepository,
};
use tracing::{info, Instrument};

use crate::common::Diagnostics;

/// Turns future-dated requests into persisted scheduled tasks.
#[derive(Clone)]
pub struct ScheduledDeferral {
    repository: Arc<dyn ScheduledTaskRepository>,
    domain: DomainInfo,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for ScheduledDeferral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledDeferral")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl ScheduledDeferral {
    pub fn new(
        repository: Arc<dyn ScheduledTaskRepository>,
        domain: DomainInfo,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            repository,
            domain,
            diagnostics,
        }
    }

    /// Persists `request` for execution at `at`.
    ///
    /// The returned id is the acknowledgement; it is only produced once the
    /// repository reports the task durable.
    pub async fn defer(
        &self,
        request: &DeviceRequest,
        at: DateTime<Utc>,
    ) -> Result<ScheduledTaskId, DispatchError> {
        async {
            let task = ScheduledTask::new(
                &request.metadata,
                self.domain.clone(),
                request.ip_address.clone(),
                &request.payload,
                at,
            )?;
            let task_id = task.id.clone();
            self.repository.save(task).await?;
            info!(
                correlation_id = %request.metadata.correlation_id,
                task_id = %task_id,
                scheduled_time = %at,
                "request deferred"
            );
            Ok::<_, DispatchError>(task_id)
        }
        .instrument(self.diagnostics.span().clone())
        .await
    }
}
