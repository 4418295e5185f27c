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
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use gridlink_core::prelude::{
    RepositoryError, ScheduledTaskId, ScheduledTaskRepository, TaskStatus,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn, Instrument};

use crate::common::Diagnostics;
use crate::dispatch::{DispatchOutcome, Dispatcher};

/// Summary of one poll tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Tasks moved from CREATED to DUE.
    pub marked_due: usize,
    /// Tasks this poller claimed and dispatched.
    pub dispatched: usize,
}

/// Timer loop that activates scheduled tasks once they are due.
///
/// Runs beside the dispatch core and talks to it only through the DUE
/// transition: each tick marks elapsed tasks DUE, claims them (DUE to
/// DISPATCHED, atomic per task) and hands the rehydrated envelope back to
/// [`Dispatcher::dispatch`]. A task claimed by another poller is skipped.
#[derive(Clone)]
pub struct DueTaskPoller {
    repository: Arc<dyn ScheduledTaskRepository>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    batch_size: usize,
    diagnostics: Diagnostics,
}

impl DueTaskPoller {
    pub fn new(
        repository: Arc<dyn ScheduledTaskRepository>,
        dispatcher: Arc<Dispatcher>,
        interval: Duration,
        batch_size: usize,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            interval,
            batch_size: batch_size.max(1),
            diagnostics,
        }
    }

    /// Ticks until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let span = self.diagnostics.span().clone();
        async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_ms = self.interval.as_millis() as u64, "due-task poller started");
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        trace!("due-task poller cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.poll_once(Utc::now()).await {
                            error!(error = %e, "due-task poll failed");
                        }
                    }
                }
            }
            info!("due-task poller stopped");
        }
        .instrument(span)
        .await;
    }

    /// Marks tasks due as of `now` and activates up to one batch of DUE tasks.
    pub async fn poll_once(&self, now: DateTime<Utc>) -> Result<PollReport, RepositoryError> {
        let marked_due = self.repository.mark_due(now, self.batch_size).await?.len();
        if marked_due > 0 {
            debug!(count = marked_due, "tasks became due");
        }
        // Also picks up tasks left DUE by an earlier tick that stopped before claiming.
        let due: Vec<ScheduledTaskId> = self
            .repository
            .list_by_status(TaskStatus::Due)
            .await?
            .into_iter()
            .take(self.batch_size)
            .map(|task| task.id)
            .collect();
        let outcomes = join_all(due.iter().map(|id| self.activate(id))).await;
        let mut dispatched = 0;
        for outcome in outcomes {
            if outcome?.is_some() {
                dispatched += 1;
            }
        }
        Ok(PollReport {
            marked_due,
            dispatched,
        })
    }

    /// Claims one DUE task and dispatches it.
    ///
    /// Returns `None` when the task is not DUE (already dispatched, cancelled or
    /// deleted), so activating the same task twice dispatches it once.
    pub async fn activate(
        &self,
        id: &ScheduledTaskId,
    ) -> Result<Option<DispatchOutcome>, RepositoryError> {
        let Some(task) = self.repository.claim(id).await? else {
            trace!(task_id = %id, "task not claimable");
            return Ok(None);
        };

        let outcome = match task.rehydrate() {
            Ok(envelope) => match self.dispatcher.dispatch(envelope).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!(task_id = %id, correlation_id = %task.correlation_id, error = %e,
                        "scheduled task was rejected on activation");
                    Some(DispatchOutcome::Dropped(e.kind()))
                }
            },
            Err(e) => {
                warn!(task_id = %id, correlation_id = %task.correlation_id, error = %e,
                    "UNRECOVERABLE ERROR, unable to read scheduled task; dropping it");
                Some(DispatchOutcome::Dropped(e.kind()))
            }
        };

        self.repository.delete(id).await?;
        Ok(outcome)
    }
}
