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

use chrono::Utc;
use gridlink_core::prelude::{
    DispatchError, Envelope, RepositoryError, ResponseEnvelope, TransportError, WireEnvelope,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, Instrument};

use crate::bundle::BundleOrchestrator;
use crate::common::{Diagnostics, GridlinkConfig};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::intake::{IntakeOutcome, ResponseIntake};
use crate::recovery::CommunicationRecovery;
use crate::scheduling::{DueTaskPoller, PollReport};

pub(crate) struct RuntimeParts {
    pub(crate) config: GridlinkConfig,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) bundles: Arc<BundleOrchestrator>,
    pub(crate) intake: Arc<ResponseIntake>,
    pub(crate) recovery: Arc<CommunicationRecovery>,
    pub(crate) poller: DueTaskPoller,
    pub(crate) inbound: mpsc::Sender<WireEnvelope>,
    pub(crate) cancel: CancellationToken,
    pub(crate) tracker: TaskTracker,
    pub(crate) diagnostics: Diagnostics,
}

/// A running gridlink instance.
///
/// Owns the background tasks (inbound workers, due-task poller, bundle
/// sweeper) and hands out the components that serve requests.
pub struct GridlinkRuntime {
    config: GridlinkConfig,
    dispatcher: Arc<Dispatcher>,
    bundles: Arc<BundleOrchestrator>,
    intake: Arc<ResponseIntake>,
    recovery: Arc<CommunicationRecovery>,
    poller: DueTaskPoller,
    inbound: mpsc::Sender<WireEnvelope>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for GridlinkRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridlinkRuntime")
            .field("dispatcher", &self.dispatcher)
            .field("bundles", &self.bundles)
            .field("background_tasks", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl GridlinkRuntime {
    pub(crate) fn new(parts: RuntimeParts) -> Self {
        let RuntimeParts {
            config,
            dispatcher,
            bundles,
            intake,
            recovery,
            poller,
            inbound,
            cancel,
            tracker,
            diagnostics,
        } = parts;
        Self {
            config,
            dispatcher,
            bundles,
            intake,
            recovery,
            poller,
            inbound,
            cancel,
            tracker,
            diagnostics,
        }
    }

    pub fn config(&self) -> &GridlinkConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn bundles(&self) -> &Arc<BundleOrchestrator> {
        &self.bundles
    }

    pub fn intake(&self) -> &Arc<ResponseIntake> {
        &self.intake
    }

    pub fn recovery(&self) -> &Arc<CommunicationRecovery> {
        &self.recovery
    }

    /// The queue the inbound workers drain.
    pub fn inbound(&self) -> mpsc::Sender<WireEnvelope> {
        self.inbound.clone()
    }

    /// Queues a raw frame for dispatch by the inbound workers.
    pub async fn submit(&self, frame: WireEnvelope) -> Result<(), TransportError> {
        self.inbound
            .send(frame)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Dispatches one envelope on the calling task.
    pub async fn dispatch(&self, envelope: Envelope) -> Result<DispatchOutcome, DispatchError> {
        self.dispatcher.dispatch(envelope).await
    }

    pub async fn on_response(&self, response: ResponseEnvelope) -> Result<IntakeOutcome, DispatchError> {
        self.intake.on_response(response).await
    }

    /// Runs one scheduler tick immediately.
    pub async fn poll_now(&self) -> Result<PollReport, RepositoryError> {
        self.poller.poll_once(Utc::now()).await
    }

    /// Stops intake and background loops, then waits for in-flight work.
    ///
    /// Fails when the work does not finish within
    /// `timeouts.system_shutdown_timeout_ms`.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let timeout = self.config.system_shutdown_timeout();
        let span = self.diagnostics.span().clone();
        async move {
            trace!("Cancelling background tasks");
            self.cancel.cancel();
            self.tracker.close();
            drop(self.inbound);

            if tokio::time::timeout(timeout, self.tracker.wait())
                .await
                .is_err()
            {
                error!(
                    "Shutdown timeout expired after {} ms with {} tasks still running",
                    timeout.as_millis(),
                    self.tracker.len()
                );
                return Err(anyhow::anyhow!(
                    "Timeout while waiting for gridlink to shut down after {} ms",
                    timeout.as_millis()
                ));
            }
            info!(open_bundles = self.bundles.open_bundles(), "gridlink shutdown complete");
            Ok(())
        }
        .instrument(span)
        .await
    }
}

/// Expires bundles whose responses are overdue and drops settled ones past
/// their retention, every `interval`.
pub(crate) fn spawn_bundle_sweeper(
    tracker: &TaskTracker,
    bundles: Arc<BundleOrchestrator>,
    interval: Duration,
    cancel: CancellationToken,
    diagnostics: Diagnostics,
) {
    let span = diagnostics.span().clone();
    tracker.spawn(
        async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        let expired = bundles.expire_stale(now);
                        let purged = bundles.purge_settled(now);
                        if expired > 0 || purged > 0 {
                            debug!(expired, purged, "bundles swept");
                        }
                    }
                }
            }
            trace!("bundle sweeper stopped");
        }
        .instrument(span),
    );
}
