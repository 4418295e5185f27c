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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// The closed set of device functions this layer routes.
///
/// Discriminants are stable and part of the external contract: a variant keeps
/// its number forever and new variants are only appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum MessageType {
    /// Read measurements from a distribution-automation device.
    GetData = 0,
    /// Push the platform clock to the device.
    SynchronizeTime = 1,
    /// Read power-quality values.
    GetPowerQualityValues = 2,
    /// Change the DLMS communication parameters of a meter.
    SetDeviceCommunicationSettings = 3,
    /// Register a new smart meter.
    AddMeter = 4,
    /// Read periodic (daily, monthly, interval) meter profiles.
    RequestPeriodicMeterData = 5,
}

impl MessageType {
    /// Every variant in declaration order.
    pub const ALL: [MessageType; 6] = [
        MessageType::GetData,
        MessageType::SynchronizeTime,
        MessageType::GetPowerQualityValues,
        MessageType::SetDeviceCommunicationSettings,
        MessageType::AddMeter,
        MessageType::RequestPeriodicMeterData,
    ];

    /// The stable discriminant of this variant.
    pub const fn ordinal(self) -> u16 {
        self as u16
    }

    /// The wire name, e.g. `GET_DATA`.
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageType::GetData => "GET_DATA",
            MessageType::SynchronizeTime => "SYNCHRONIZE_TIME",
            MessageType::GetPowerQualityValues => "GET_POWER_QUALITY_VALUES",
            MessageType::SetDeviceCommunicationSettings => "SET_DEVICE_COMMUNICATION_SETTINGS",
            MessageType::AddMeter => "ADD_METER",
            MessageType::RequestPeriodicMeterData => "REQUEST_PERIODIC_METER_DATA",
        }
    }

    /// Looks a variant up by its stable discriminant.
    pub fn from_ordinal(ordinal: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.ordinal() == ordinal)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = DispatchError;

    /// Exact, case-sensitive match against the wire names.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.is_empty() {
            return Err(DispatchError::MissingMessageType);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .ok_or_else(|| DispatchError::UnknownMessageType(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_stable() {
        assert_eq!(MessageType::GetData.ordinal(), 0);
        assert_eq!(MessageType::SynchronizeTime.ordinal(), 1);
        assert_eq!(MessageType::GetPowerQualityValues.ordinal(), 2);
        assert_eq!(MessageType::SetDeviceCommunicationSettings.ordinal(), 3);
        assert_eq!(MessageType::AddMeter.ordinal(), 4);
        assert_eq!(MessageType::RequestPeriodicMeterData.ordinal(), 5);
    }

    #[test]
    fn all_is_in_ordinal_order() {
        for (index, message_type) in MessageType::ALL.iter().enumerate() {
            assert_eq!(message_type.ordinal() as usize, index);
            assert_eq!(MessageType::from_ordinal(index as u16), Some(*message_type));
        }
        assert_eq!(MessageType::from_ordinal(99), None);
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!("GET_DATA".parse::<MessageType>().ok(), Some(MessageType::GetData));
        assert!(matches!(
            "get_data".parse::<MessageType>(),
            Err(DispatchError::UnknownMessageType(raw)) if raw == "get_data"
        ));
        assert!(matches!("".parse::<MessageType>(), Err(DispatchError::MissingMessageType)));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&MessageType::SetDeviceCommunicationSettings).unwrap();
        assert_eq!(json, "\"SET_DEVICE_COMMUNICATION_SETTINGS\"");
        for message_type in MessageType::ALL {
            let json = serde_json::to_value(message_type).unwrap();
            assert_eq!(json.as_str(), Some(message_type.as_str()));
        }
    }
}
