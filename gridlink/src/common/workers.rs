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

use gridlink_core::prelude::WireEnvelope;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn, Instrument};

use crate::common::Diagnostics;
use crate::dispatch::Dispatcher;

/// Drains the inbound queue, dispatching each frame on its own task.
///
/// At most `max_concurrent` dispatches run at once; further frames wait in
/// the queue. Cancellation stops intake, after which the dispatches already
/// started are allowed to finish.
pub struct InboundWorkers {
    dispatcher: Arc<Dispatcher>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    diagnostics: Diagnostics,
}

impl InboundWorkers {
    pub fn new(dispatcher: Arc<Dispatcher>, max_concurrent: usize, diagnostics: Diagnostics) -> Self {
        Self {
            dispatcher,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tracker: TaskTracker::new(),
            diagnostics,
        }
    }

    pub async fn run(self, mut inbound: mpsc::Receiver<WireEnvelope>, cancel: CancellationToken) {
        let span = self.diagnostics.span().clone();
        async move {
            info!("inbound workers started");
            loop {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    permit = self.permits.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };
                let frame = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    frame = inbound.recv() => match frame {
                        Some(frame) => frame,
                        None => {
                            debug!("inbound channel closed");
                            break;
                        }
                    },
                };
                let dispatcher = self.dispatcher.clone();
                self.tracker.spawn(
                    async move {
                        let _permit = permit;
                        match dispatcher.dispatch_wire(frame).await {
                            Ok(outcome) => trace!(?outcome, "frame dispatched"),
                            Err(e) => warn!(error = %e, code = e.code(), "frame rejected"),
                        }
                    }
                    .in_current_span(),
                );
            }
            self.tracker.close();
            self.tracker.wait().await;
            info!("inbound workers stopped");
        }
        .instrument(span)
        .await;
    }
}
