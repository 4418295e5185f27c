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

//! The per-message-type handlers of the smart metering domain.

use std::sync::Arc;

use gridlink_core::prelude::{
    DeviceRepository, DeviceRequest, DispatchError, MessageType, RequestSender,
};

use crate::dispatch::HandlerRegistryBuilder;

pub use adhoc::{GetDataHandler, SynchronizeTimeHandler};
pub use installation::AddMeterHandler;
pub use management::{CommunicationSettingsHandler, PeriodicMeterReadsHandler};
pub use monitoring::PowerQualityValuesHandler;
pub use outbound::OutboundRequests;

mod adhoc;
mod installation;
mod management;
mod monitoring;
mod outbound;

/// Registers one handler per message type, all sharing the same outbound path.
pub fn register_standard_handlers(
    builder: HandlerRegistryBuilder,
    requests: Arc<dyn RequestSender>,
    devices: Arc<dyn DeviceRepository>,
) -> Result<HandlerRegistryBuilder, DispatchError> {
    let outbound = OutboundRequests::new(requests, devices);
    builder
        .register(MessageType::GetData, GetDataHandler::new(outbound.clone()))?
        .register(
            MessageType::SynchronizeTime,
            SynchronizeTimeHandler::new(outbound.clone()),
        )?
        .register(
            MessageType::GetPowerQualityValues,
            PowerQualityValuesHandler::new(outbound.clone()),
        )?
        .register(
            MessageType::SetDeviceCommunicationSettings,
            CommunicationSettingsHandler::new(outbound.clone()),
        )?
        .register(MessageType::AddMeter, AddMeterHandler::new(outbound.clone()))?
        .register(
            MessageType::RequestPeriodicMeterData,
            PeriodicMeterReadsHandler::new(outbound),
        )
}

pub(crate) fn payload_mismatch(request: &DeviceRequest) -> DispatchError {
    DispatchError::decode(
        request.metadata.message_type.as_str(),
        "payload does not match the message type",
    )
}
