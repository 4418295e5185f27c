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

//! Decorators composed around [`MessageHandler`]s.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use gridlink_core::prelude::{
    DeviceMessageMetadata, DeviceRequest, DispatchError, ErrorKind, ResponseEnvelope,
    ResponseSender,
};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::dispatch::{DispatchOutcome, MessageHandler};

/// Records a span around every invocation of the wrapped handler and logs how
/// it ended.
#[derive(Debug, Clone)]
pub struct Traced<H> {
    inner: H,
}

impl<H> Traced<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

#[async_trait]
impl<H: MessageHandler> MessageHandler for Traced<H> {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        let span = info_span!(
            "handle",
            handler = self.inner.name(),
            correlation_id = %request.metadata.correlation_id,
            message_type = %request.metadata.message_type,
            device = %request.metadata.device_identification,
        );
        async {
            let started = Instant::now();
            let result = self.inner.handle(request).await;
            match &result {
                Ok(()) => debug!(elapsed_us = started.elapsed().as_micros() as u64, "handler completed"),
                Err(e) => warn!(
                    elapsed_us = started.elapsed().as_micros() as u64,
                    kind = ?e.kind(),
                    error = %e,
                    "handler failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Converts handler failures into the outcome the dispatch boundary reports.
///
/// Functional and downstream failures become an error response addressed to the
/// request's correlation id. Decode failures are logged and the request is
/// dropped. Protocol and configuration failures are propagated.
#[derive(Clone)]
pub struct ErrorTranslation {
    responses: Arc<dyn ResponseSender>,
}

impl std::fmt::Debug for ErrorTranslation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorTranslation").finish_non_exhaustive()
    }
}

impl ErrorTranslation {
    pub fn new(responses: Arc<dyn ResponseSender>) -> Self {
        Self { responses }
    }

    /// Invokes `handler` and translates its failure, if any.
    pub async fn run(
        &self,
        handler: &dyn MessageHandler,
        request: DeviceRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let metadata = request.metadata.clone();
        match handler.handle(request).await {
            Ok(()) => Ok(DispatchOutcome::Executed(metadata.message_type)),
            Err(error) => self.translate(&metadata, error).await,
        }
    }

    pub async fn translate(
        &self,
        metadata: &DeviceMessageMetadata,
        error: DispatchError,
    ) -> Result<DispatchOutcome, DispatchError> {
        match error.kind() {
            kind @ (ErrorKind::Functional | ErrorKind::Downstream) => {
                let response = ResponseEnvelope::error(metadata, &error);
                if let Err(send_error) = self.responses.send_response(response).await {
                    error!(
                        correlation_id = %metadata.correlation_id,
                        error = %send_error,
                        "could not deliver error response"
                    );
                }
                Ok(DispatchOutcome::Failed(kind))
            }
            ErrorKind::Decode => {
                error!(
                    correlation_id = %metadata.correlation_id,
                    organisation = %metadata.organisation_identification,
                    device = %metadata.device_identification,
                    message_type = %metadata.message_type,
                    priority = %metadata.priority,
                    error = %error,
                    "UNRECOVERABLE ERROR, unable to read request; dropping it"
                );
                Ok(DispatchOutcome::Dropped(ErrorKind::Decode))
            }
            ErrorKind::Protocol | ErrorKind::Configuration => {
                error!(
                    correlation_id = %metadata.correlation_id,
                    message_type = %metadata.message_type,
                    error = %error,
                    "rejecting request"
                );
                Err(error)
            }
        }
    }
}
