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

//! Meter management functions.

use async_trait::async_trait;
use gridlink_core::prelude::{DeviceRequest, DispatchError, Payload};
use tracing::info;

use crate::dispatch::MessageHandler;
use crate::services::{payload_mismatch, OutboundRequests};

/// SET_DEVICE_COMMUNICATION_SETTINGS
#[derive(Debug, Clone)]
pub struct CommunicationSettingsHandler {
    outbound: OutboundRequests,
}

impl CommunicationSettingsHandler {
    pub fn new(outbound: OutboundRequests) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl MessageHandler for CommunicationSettingsHandler {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        let Payload::SetDeviceCommunicationSettingsRequest(settings) = &request.payload else {
            return Err(payload_mismatch(&request));
        };
        info!(
            device = %request.metadata.device_identification,
            challenge_length = settings.challenge_length,
            use_hdlc = settings.use_hdlc,
            "set device communication settings"
        );
        self.outbound.forward(request).await
    }

    fn name(&self) -> &'static str {
        "CommunicationSettingsHandler"
    }
}

/// REQUEST_PERIODIC_METER_DATA
#[derive(Debug, Clone)]
pub struct PeriodicMeterReadsHandler {
    outbound: OutboundRequests,
}

impl PeriodicMeterReadsHandler {
    pub fn new(outbound: OutboundRequests) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl MessageHandler for PeriodicMeterReadsHandler {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        let Payload::PeriodicMeterReadsQuery(query) = &request.payload else {
            return Err(payload_mismatch(&request));
        };
        if query.end_date < query.begin_date {
            return Err(DispatchError::decode(
                request.metadata.message_type.as_str(),
                "end date precedes begin date",
            ));
        }
        info!(
            device = %request.metadata.device_identification,
            period_type = ?query.period_type,
            profile_generic = query.profile_generic,
            "request periodic meter data"
        );
        self.outbound.forward(request).await
    }

    fn name(&self) -> &'static str {
        "PeriodicMeterReadsHandler"
    }
}
