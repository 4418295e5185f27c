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

use gridlink_core::prelude::{
    build_downstream_request, DeviceRepository, DeviceRequest, DispatchError, RequestSender,
};
use tracing::{debug, trace};

/// The downstream path every service handler shares.
///
/// Builds the outbound envelope from a request, keeping its correlation id,
/// priority and bundle slot, and hands it to the transport. The envelope's
/// address hint wins; without one the device store is asked.
#[derive(Clone)]
pub struct OutboundRequests {
    requests: Arc<dyn RequestSender>,
    devices: Arc<dyn DeviceRepository>,
}

impl std::fmt::Debug for OutboundRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundRequests").finish_non_exhaustive()
    }
}

impl OutboundRequests {
    pub fn new(requests: Arc<dyn RequestSender>, devices: Arc<dyn DeviceRepository>) -> Self {
        Self { requests, devices }
    }

    pub fn devices(&self) -> &Arc<dyn DeviceRepository> {
        &self.devices
    }

    pub async fn forward(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        let DeviceRequest {
            metadata,
            ip_address,
            payload,
        } = request;
        let ip_address = match ip_address {
            Some(address) => Some(address),
            None => {
                trace!(device = %metadata.device_identification, "looking up address hint");
                self.devices
                    .find_device_ip_address(&metadata.device_identification)
                    .await?
            }
        };
        let outbound = build_downstream_request(
            metadata.correlation_id.clone(),
            &metadata.organisation_identification,
            &metadata.device_identification,
            payload,
            metadata.message_type,
            ip_address,
        )
        .with_priority(metadata.priority)
        .with_bundle_slot(metadata.bundle_slot);
        self.requests.send(outbound).await?;
        debug!(
            correlation_id = %metadata.correlation_id,
            message_type = %metadata.message_type,
            "request sent downstream"
        );
        Ok(())
    }
}
