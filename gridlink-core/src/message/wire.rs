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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;
use crate::message::{CorrelationId, Envelope, MessagePriority, MessageType};
use crate::payload::Payload;

/// An inbound request exactly as a caller sent it, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireEnvelope {
    pub correlation_id: Option<String>,
    pub organisation_identification: Option<String>,
    pub device_identification: Option<String>,
    pub message_type: Option<String>,
    pub priority: Option<i64>,
    pub ip_address: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub schedule_time: Option<DateTime<Utc>>,
    pub bundle_slot: Option<usize>,
    pub payload: Value,
}

impl WireEnvelope {
    /// Parses a JSON frame. A frame that is not an envelope at all cannot be
    /// answered, so it surfaces as a decode error.
    pub fn from_json(frame: &str) -> Result<Self, DispatchError> {
        serde_json::from_str(frame).map_err(|e| DispatchError::decode("ENVELOPE", e))
    }

    /// Validates the routing fields in boundary order (message type, correlation
    /// id, identification) and decodes the payload for the parsed type.
    pub fn into_envelope(self) -> Result<Envelope, DispatchError> {
        let raw_type = self
            .message_type
            .filter(|t| !t.is_empty())
            .ok_or(DispatchError::MissingMessageType)?;
        let message_type: MessageType = raw_type.parse()?;
        let correlation_id = CorrelationId::from_inbound(self.correlation_id.unwrap_or_default())?;
        let envelope = Envelope::new(
            correlation_id,
            self.organisation_identification.unwrap_or_default(),
            self.device_identification.unwrap_or_default(),
            message_type,
            Payload::Empty,
        );
        envelope.validate_identification()?;
        let payload = Payload::decode_request(message_type, self.payload)?;
        Ok(envelope
            .with_payload(payload)
            .with_priority(self.priority.map(MessagePriority::from).unwrap_or_default())
            .with_ip_address(self.ip_address)
            .with_schedule_time(self.schedule_time)
            .with_bundle_slot(self.bundle_slot))
    }
}
