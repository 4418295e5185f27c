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
use derive_new::new;
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

use crate::error::DispatchError;
use crate::message::{CorrelationId, MessagePriority, MessageType};
use crate::payload::Payload;

/// The unit of work crossing the dispatch boundary.
///
/// The message type is kept as received so the dispatcher can reject an
/// unknown one; everything else is already typed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    correlation_id: CorrelationId,
    organisation_identification: String,
    device_identification: String,
    message_type: String,
    priority: MessagePriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    schedule_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bundle_slot: Option<usize>,
    payload: Payload,
}

assert_impl_all!(Envelope: Send, Sync);

impl Envelope {
    pub fn new(
        correlation_id: CorrelationId,
        organisation_identification: impl Into<String>,
        device_identification: impl Into<String>,
        message_type: MessageType,
        payload: Payload,
    ) -> Self {
        Self::with_raw_type(
            correlation_id,
            organisation_identification,
            device_identification,
            message_type.as_str(),
            payload,
        )
    }

    /// Builds an envelope whose message type has not been validated yet.
    pub fn with_raw_type(
        correlation_id: CorrelationId,
        organisation_identification: impl Into<String>,
        device_identification: impl Into<String>,
        message_type: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            correlation_id,
            organisation_identification: organisation_identification.into(),
            device_identification: device_identification.into(),
            message_type: message_type.into(),
            priority: MessagePriority::default(),
            ip_address: None,
            schedule_time: None,
            bundle_slot: None,
            payload,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    #[must_use]
    pub fn with_schedule_time(mut self, schedule_time: Option<DateTime<Utc>>) -> Self {
        self.schedule_time = schedule_time;
        self
    }

    #[must_use]
    pub(crate) fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn with_bundle_slot(mut self, bundle_slot: Option<usize>) -> Self {
        self.bundle_slot = bundle_slot;
        self
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn organisation_identification(&self) -> &str {
        &self.organisation_identification
    }

    pub fn device_identification(&self) -> &str {
        &self.device_identification
    }

    /// The message type exactly as received.
    pub fn raw_message_type(&self) -> &str {
        &self.message_type
    }

    pub fn priority(&self) -> MessagePriority {
        self.priority
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn schedule_time(&self) -> Option<DateTime<Utc>> {
        self.schedule_time
    }

    pub fn bundle_slot(&self) -> Option<usize> {
        self.bundle_slot
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Parses the message type; fails with `MissingMessageType` or
    /// `UnknownMessageType`.
    pub fn message_type(&self) -> Result<MessageType, DispatchError> {
        self.message_type.parse()
    }

    /// Checks that both identifications are present.
    pub fn validate_identification(&self) -> Result<(), DispatchError> {
        if self.organisation_identification.trim().is_empty() {
            return Err(DispatchError::MissingIdentification {
                field: "organisationIdentification",
            });
        }
        if self.device_identification.trim().is_empty() {
            return Err(DispatchError::MissingIdentification {
                field: "deviceIdentification",
            });
        }
        Ok(())
    }

    /// Splits a validated envelope into the request a handler receives.
    pub fn into_device_request(self) -> Result<DeviceRequest, DispatchError> {
        let message_type = self.message_type()?;
        self.validate_identification()?;
        let metadata = DeviceMessageMetadata {
            correlation_id: self.correlation_id,
            organisation_identification: self.organisation_identification,
            device_identification: self.device_identification,
            message_type,
            priority: self.priority,
            bundle_slot: self.bundle_slot,
        };
        Ok(DeviceRequest {
            metadata,
            ip_address: self.ip_address,
            payload: self.payload,
        })
    }
}

/// Validated routing metadata of a request, threaded into every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMessageMetadata {
    pub correlation_id: CorrelationId,
    pub organisation_identification: String,
    pub device_identification: String,
    pub message_type: MessageType,
    pub priority: MessagePriority,
    #[serde(default)]
    pub bundle_slot: Option<usize>,
}

/// What a handler receives: validated metadata plus the typed payload.
#[derive(Debug, Clone, PartialEq, new)]
pub struct DeviceRequest {
    pub metadata: DeviceMessageMetadata,
    pub ip_address: Option<String>,
    pub payload: Payload,
}

assert_impl_all!(DeviceRequest: Send, Sync);

/// Identifies the subsystem that issued a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct DomainInfo {
    pub domain: String,
    pub domain_version: String,
}

/// Assembles the outbound envelope handed to the transport collaborator.
pub fn build_downstream_request(
    correlation_id: CorrelationId,
    organisation_identification: &str,
    device_identification: &str,
    payload: Payload,
    message_type: MessageType,
    ip_address: Option<String>,
) -> Envelope {
    Envelope::new(
        correlation_id,
        organisation_identification,
        device_identification,
        message_type,
        payload,
    )
    .with_ip_address(ip_address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SynchronizeTimeRequest;

    fn envelope(org: &str, device: &str, message_type: &str) -> Envelope {
        Envelope::with_raw_type(
            CorrelationId::from_inbound("C1").unwrap(),
            org,
            device,
            message_type,
            Payload::SynchronizeTimeRequest(SynchronizeTimeRequest::default()),
        )
    }

    #[test]
    fn splits_into_device_request() {
        let request = envelope("O1", "D1", "SYNCHRONIZE_TIME")
            .with_ip_address(Some("10.0.0.1".into()))
            .into_device_request()
            .unwrap();
        assert_eq!(request.metadata.correlation_id.as_str(), "C1");
        assert_eq!(request.metadata.message_type, MessageType::SynchronizeTime);
        assert_eq!(request.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn rejects_blank_identification() {
        assert_eq!(
            envelope(" ", "D1", "GET_DATA").into_device_request(),
            Err(DispatchError::MissingIdentification {
                field: "organisationIdentification"
            })
        );
        assert_eq!(
            envelope("O1", "", "GET_DATA").into_device_request(),
            Err(DispatchError::MissingIdentification {
                field: "deviceIdentification"
            })
        );
    }

    #[test]
    fn downstream_request_keeps_correlation_id_and_hint() {
        let id = CorrelationId::from_inbound("C9").unwrap();
        let out = build_downstream_request(
            id.clone(),
            "O1",
            "D1",
            Payload::Empty,
            MessageType::GetData,
            Some("10.0.0.2".into()),
        );
        assert_eq!(out.correlation_id(), &id);
        assert_eq!(out.raw_message_type(), "GET_DATA");
        assert_eq!(out.ip_address(), Some("10.0.0.2"));
        assert_eq!(out.schedule_time(), None);
    }

    #[test]
    fn serializes_schedule_time_as_epoch_millis() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let json = serde_json::to_value(envelope("O1", "D1", "GET_DATA").with_schedule_time(Some(at)))
            .unwrap();
        assert_eq!(json["scheduleTime"], 1_700_000_000_000_i64);
        assert_eq!(json["correlationId"], "C1");
    }
}
