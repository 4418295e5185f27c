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
use gridlink_core::prelude::{
    ComponentType, DeviceRecord, DeviceRequest, DispatchError, FunctionalError,
    FunctionalErrorType, Payload,
};
use tracing::info;

use crate::dispatch::MessageHandler;
use crate::services::{payload_mismatch, OutboundRequests};

/// ADD_METER: registers a new smart meter and forwards the installation.
///
/// A device that already exists is a functional error (`EXISTING_DEVICE`)
/// reported back to the requester.
#[derive(Debug, Clone)]
pub struct AddMeterHandler {
    outbound: OutboundRequests,
}

impl AddMeterHandler {
    pub fn new(outbound: OutboundRequests) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl MessageHandler for AddMeterHandler {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        let Payload::AddMeterRequest(device) = &request.payload else {
            return Err(payload_mismatch(&request));
        };
        let added = self
            .outbound
            .devices()
            .add_device(DeviceRecord {
                device_identification: device.device_identification.clone(),
                device_type: device.device_type.clone(),
                owner_organisation: Some(request.metadata.organisation_identification.clone()),
                ip_address: request.ip_address.clone(),
                protocol_name: device.protocol_name.clone(),
                protocol_version: device.protocol_version.clone(),
            })
            .await?;
        if !added {
            return Err(FunctionalError::new(
                FunctionalErrorType::ExistingDevice,
                ComponentType::DomainSmartMetering,
            )
            .with_detail(device.device_identification.clone())
            .into());
        }
        info!(
            device = %device.device_identification,
            protocol = %device.protocol_name,
            protocol_version = %device.protocol_version,
            "meter registered"
        );
        self.outbound.forward(request).await
    }

    fn name(&self) -> &'static str {
        "AddMeterHandler"
    }
}
