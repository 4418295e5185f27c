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

//! Entry point for device responses.

use std::sync::Arc;

use gridlink_core::prelude::{DispatchError, ResponseEnvelope, ResponseSender};
use tracing::{info_span, trace, warn, Instrument};

use crate::bundle::{BundleOrchestrator, SlotWrite};
use crate::common::Diagnostics;

/// Where an inbound response went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Forwarded to the requesting organisation.
    Forwarded,
    /// Written into a bundle slot.
    Bundled(SlotWrite),
    /// Belonged to no known bundle; logged and discarded.
    Dropped,
}

/// Routes device responses: bundle partials to the orchestrator, everything
/// else to the response channel.
pub struct ResponseIntake {
    bundles: Arc<BundleOrchestrator>,
    responses: Arc<dyn ResponseSender>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for ResponseIntake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseIntake")
            .field("bundles", &self.bundles)
            .finish_non_exhaustive()
    }
}

impl ResponseIntake {
    pub fn new(
        bundles: Arc<BundleOrchestrator>,
        responses: Arc<dyn ResponseSender>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            bundles,
            responses,
            diagnostics,
        }
    }

    pub async fn on_response(&self, response: ResponseEnvelope) -> Result<IntakeOutcome, DispatchError> {
        let span = info_span!(
            parent: self.diagnostics.span(),
            "response",
            correlation_id = %response.correlation_id,
            message_type = %response.message_type,
            result = ?response.result,
        );
        async {
            if response.bundle_slot.is_some() {
                return match self.bundles.record_partial_response(&response) {
                    Ok(write) => Ok(IntakeOutcome::Bundled(write)),
                    Err(e) => {
                        warn!(error = %e, "partial response does not belong to an open bundle");
                        Ok(IntakeOutcome::Dropped)
                    }
                };
            }
            trace!("forwarding response");
            self.responses.send_response(response).await?;
            Ok::<_, DispatchError>(IntakeOutcome::Forwarded)
        }
        .instrument(span)
        .await
    }
}
