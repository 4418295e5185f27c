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

//! Ad-hoc device functions.

use async_trait::async_trait;
use gridlink_core::prelude::{DeviceRequest, DispatchError, Payload};
use tracing::info;

use crate::dispatch::MessageHandler;
use crate::services::{payload_mismatch, OutboundRequests};

/// GET_DATA: forwards a measurement read.
#[derive(Debug, Clone)]
pub struct GetDataHandler {
    outbound: OutboundRequests,
}

impl GetDataHandler {
    pub fn new(outbound: OutboundRequests) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl MessageHandler for GetDataHandler {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        let Payload::GetDataRequest(get_data) = &request.payload else {
            return Err(payload_mismatch(&request));
        };
        info!(
            device = %request.metadata.device_identification,
            systems = get_data.system_filters.len(),
            "get data"
        );
        self.outbound.forward(request).await
    }

    fn name(&self) -> &'static str {
        "GetDataHandler"
    }
}

/// SYNCHRONIZE_TIME: pushes the platform clock to the device.
#[derive(Debug, Clone)]
pub struct SynchronizeTimeHandler {
    outbound: OutboundRequests,
}

impl SynchronizeTimeHandler {
    pub fn new(outbound: OutboundRequests) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl MessageHandler for SynchronizeTimeHandler {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        if !matches!(request.payload, Payload::SynchronizeTimeRequest(_)) {
            return Err(payload_mismatch(&request));
        }
        info!(device = %request.metadata.device_identification, "synchronize time");
        self.outbound.forward(request).await
    }

    fn name(&self) -> &'static str {
        "SynchronizeTimeHandler"
    }
}
