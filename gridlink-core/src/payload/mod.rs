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

//! Type-specific request and response value objects.
//!
//! The JSON shape of a payload is determined by the envelope's message type, so
//! [`Payload`] serializes as its inner value without a tag and is rebuilt with
//! [`Payload::decode_request`] or [`Payload::decode_response`].

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::DispatchError;
use crate::message::MessageType;

pub use adhoc::{
    GetDataRequest, GetDataResponse, Measurement, MeasurementFilter, Phase, Report,
    SynchronizeTimeRequest, SystemFilter, SystemIdentifier,
};
pub use installation::SmartMeteringDevice;
pub use management::{PeriodType, PeriodicMeterReadsQuery, SetDeviceCommunicationSettingsRequest};
pub use monitoring::PowerQualityValuesRequest;

mod adhoc;
mod installation;
mod management;
mod monitoring;

/// The payload carried by an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    GetDataRequest(GetDataRequest),
    GetDataResponse(GetDataResponse),
    SynchronizeTimeRequest(SynchronizeTimeRequest),
    PowerQualityValuesRequest(PowerQualityValuesRequest),
    SetDeviceCommunicationSettingsRequest(SetDeviceCommunicationSettingsRequest),
    AddMeterRequest(SmartMeteringDevice),
    PeriodicMeterReadsQuery(PeriodicMeterReadsQuery),
    /// A device response this layer forwards without interpreting.
    Opaque(Value),
    /// No data, e.g. the acknowledgement of a settings change.
    Empty,
}

impl Payload {
    /// The message type a request payload belongs to; `None` for responses.
    pub fn request_type(&self) -> Option<MessageType> {
        match self {
            Payload::GetDataRequest(_) => Some(MessageType::GetData),
            Payload::SynchronizeTimeRequest(_) => Some(MessageType::SynchronizeTime),
            Payload::PowerQualityValuesRequest(_) => Some(MessageType::GetPowerQualityValues),
            Payload::SetDeviceCommunicationSettingsRequest(_) => {
                Some(MessageType::SetDeviceCommunicationSettings)
            }
            Payload::AddMeterRequest(_) => Some(MessageType::AddMeter),
            Payload::PeriodicMeterReadsQuery(_) => Some(MessageType::RequestPeriodicMeterData),
            Payload::GetDataResponse(_) | Payload::Opaque(_) | Payload::Empty => None,
        }
    }

    /// Rebuilds the typed request for `message_type` from its JSON form.
    ///
    /// A JSON `null` is read as an empty object, so requests whose fields are
    /// all optional may be sent without a body.
    pub fn decode_request(message_type: MessageType, value: Value) -> Result<Self, DispatchError> {
        let value = if value.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            value
        };
        let decode_error = |e: serde_json::Error| DispatchError::decode(message_type.as_str(), e);
        let payload = match message_type {
            MessageType::GetData => {
                Payload::GetDataRequest(serde_json::from_value(value).map_err(decode_error)?)
            }
            MessageType::SynchronizeTime => {
                Payload::SynchronizeTimeRequest(serde_json::from_value(value).map_err(decode_error)?)
            }
            MessageType::GetPowerQualityValues => Payload::PowerQualityValuesRequest(
                serde_json::from_value(value).map_err(decode_error)?,
            ),
            MessageType::SetDeviceCommunicationSettings => {
                Payload::SetDeviceCommunicationSettingsRequest(
                    serde_json::from_value(value).map_err(decode_error)?,
                )
            }
            MessageType::AddMeter => {
                Payload::AddMeterRequest(serde_json::from_value(value).map_err(decode_error)?)
            }
            MessageType::RequestPeriodicMeterData => {
                Payload::PeriodicMeterReadsQuery(serde_json::from_value(value).map_err(decode_error)?)
            }
        };
        Ok(payload)
    }

    /// Rebuilds a device response. Only `GET_DATA` responses are interpreted;
    /// anything else is carried as [`Payload::Opaque`].
    pub fn decode_response(message_type: MessageType, value: Value) -> Result<Self, DispatchError> {
        match (message_type, value) {
            (_, Value::Null) => Ok(Payload::Empty),
            (MessageType::GetData, value) => serde_json::from_value(value)
                .map(Payload::GetDataResponse)
                .map_err(|e| DispatchError::decode(message_type.as_str(), e)),
            (_, value) => Ok(Payload::Opaque(value)),
        }
    }

    /// The untagged JSON form, as persisted in scheduled tasks.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::GetDataRequest(inner) => inner.serialize(serializer),
            Payload::GetDataResponse(inner) => inner.serialize(serializer),
            Payload::SynchronizeTimeRequest(inner) => inner.serialize(serializer),
            Payload::PowerQualityValuesRequest(inner) => inner.serialize(serializer),
            Payload::SetDeviceCommunicationSettingsRequest(inner) => inner.serialize(serializer),
            Payload::AddMeterRequest(inner) => inner.serialize(serializer),
            Payload::PeriodicMeterReadsQuery(inner) => inner.serialize(serializer),
            Payload::Opaque(inner) => inner.serialize(serializer),
            Payload::Empty => serializer.serialize_unit(),
        }
    }
}
