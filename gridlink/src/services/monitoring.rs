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
use gridlink_core::prelude::{DeviceRequest, DispatchError, Payload};
use tracing::info;

use crate::dispatch::MessageHandler;
use crate::services::{payload_mismatch, OutboundRequests};

/// GET_POWER_QUALITY_VALUES: forwards a power-quality read.
#[derive(Debug, Clone)]
pub struct PowerQualityValuesHandler {
    outbound: OutboundRequests,
}

impl PowerQualityValuesHandler {
    pub fn new(outbound: OutboundRequests) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl MessageHandler for PowerQualityValuesHandler {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        let Payload::PowerQualityValuesRequest(values) = &request.payload else {
            return Err(payload_mismatch(&request));
        };
        info!(
            device = %request.metadata.device_identification,
            logical_devices = values.logical_devices.len(),
            "get power quality values"
        );
        self.outbound.forward(request).await
    }

    fn name(&self) -> &'static str {
        "PowerQualityValuesHandler"
    }
}
