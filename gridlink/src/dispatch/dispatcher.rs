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

use chrono::Utc;
use gridlink_core::prelude::{
    DispatchError, Envelope, ErrorKind, MessageType, ResponseSender, ScheduledTaskId,
    WireEnvelope,
};
use static_assertions::assert_impl_all;
use tracing::{error, info_span, trace, warn, Instrument};

use crate::common::Diagnostics;
use crate::dispatch::layers::ErrorTranslation;
use crate::dispatch::HandlerRegistry;
use crate::scheduling::ScheduledDeferral;

/// How the dispatch boundary disposed of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and the downstream request was sent.
    Executed(MessageType),
    /// The envelope was persisted for later execution.
    Scheduled(ScheduledTaskId),
    /// The request failed and an error response was emitted.
    Failed(ErrorKind),
    /// The request was logged and discarded without a response.
    Dropped(ErrorKind),
}

/// Routes inbound envelopes to their handlers.
///
/// Envelopes with a future schedule time go to the deferral path instead; all
/// others are handed to the handler registered for their type. Handler
/// failures are translated at this boundary and never propagate as panics or
/// blocking retries.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    deferral: ScheduledDeferral,
    translation: ErrorTranslation,
    diagnostics: Diagnostics,
}

assert_impl_all!(Dispatcher: Send, Sync);

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("component", &self.diagnostics.component())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        deferral: ScheduledDeferral,
        responses: Arc<dyn ResponseSender>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            registry,
            deferral,
            translation: ErrorTranslation::new(responses),
            diagnostics,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatches one envelope.
    ///
    /// 1. Reject a missing or unknown message type, or missing identification.
    /// 2. Resolve the handler; an unmapped type is a configuration error.
    /// 3. With a schedule time in the future, persist a scheduled task and
    ///    return without invoking the handler.
    /// 4. Otherwise invoke the handler once.
    ///
    /// Protocol and configuration errors are returned; every other failure is
    /// reported through the returned [`DispatchOutcome`].
    pub async fn dispatch(&self, envelope: Envelope) -> Result<DispatchOutcome, DispatchError> {
        let span = info_span!(
            parent: self.diagnostics.span(),
            "dispatch",
            correlation_id = %envelope.correlation_id(),
            message_type = envelope.raw_message_type(),
            device = envelope.device_identification(),
        );
        self.dispatch_inner(envelope).instrument(span).await
    }

    /// Validates a raw inbound frame and dispatches it.
    ///
    /// A frame whose payload cannot be read is logged and dropped, since no
    /// reliable reply address can be established for it.
    pub async fn dispatch_wire(&self, frame: WireEnvelope) -> Result<DispatchOutcome, DispatchError> {
        let described = describe_wire(&frame);
        match frame.into_envelope() {
            Ok(envelope) => self.dispatch(envelope).await,
            Err(error) if error.kind() == ErrorKind::Decode => {
                error!(parent: self.diagnostics.span(), envelope = %described, error = %error,
                    "UNRECOVERABLE ERROR, unable to read request; dropping it");
                Ok(DispatchOutcome::Dropped(ErrorKind::Decode))
            }
            Err(error) => {
                warn!(parent: self.diagnostics.span(), envelope = %described, error = %error,
                    "rejecting malformed request");
                Err(error)
            }
        }
    }

    async fn dispatch_inner(&self, envelope: Envelope) -> Result<DispatchOutcome, DispatchError> {
        let message_type = match envelope.message_type() {
            Ok(message_type) => message_type,
            Err(error) => return Err(self.reject(&envelope, error)),
        };
        if let Err(error) = envelope.validate_identification() {
            return Err(self.reject(&envelope, error));
        }

        let handler = match self.registry.resolve_type(message_type) {
            Ok(handler) => handler,
            Err(error) => {
                error!(
                    correlation_id = %envelope.correlation_id(),
                    %message_type,
                    "no handler registered for a valid message type; this is a deployment defect"
                );
                return Err(error);
            }
        };

        let schedule_time = envelope.schedule_time().filter(|at| *at > Utc::now());
        let request = envelope.into_device_request()?;

        if request.payload.request_type() != Some(message_type) {
            let error = DispatchError::decode(message_type.as_str(), "payload does not match the message type");
            return self.translation.translate(&request.metadata, error).await;
        }

        if let Some(at) = schedule_time {
            return match self.deferral.defer(&request, at).await {
                Ok(task_id) => Ok(DispatchOutcome::Scheduled(task_id)),
                Err(error) => self.translation.translate(&request.metadata, error).await,
            };
        }

        trace!(handler = handler.name(), "invoking handler");
        self.translation.run(handler.as_ref(), request).await
    }

    /// Logs a protocol error with the envelope's routing metadata, never its
    /// payload.
    fn reject(&self, envelope: &Envelope, error: DispatchError) -> DispatchError {
        warn!(
            correlation_id = %envelope.correlation_id(),
            organisation = envelope.organisation_identification(),
            device = envelope.device_identification(),
            message_type = envelope.raw_message_type(),
            priority = %envelope.priority(),
            schedule_time = ?envelope.schedule_time(),
            error = %error,
            "rejecting request at the dispatch boundary"
        );
        error
    }
}

fn describe_wire(frame: &WireEnvelope) -> String {
    format!(
        "correlationId={:?} organisation={:?} device={:?} messageType={:?} priority={:?} scheduleTime={:?}",
        frame.correlation_id,
        frame.organisation_identification,
        frame.device_identification,
        frame.message_type,
        frame.priority,
        frame.schedule_time.map(|t| t.timestamp_millis()),
    )
}
