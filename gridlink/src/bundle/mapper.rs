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

use std::collections::HashSet;

use gridlink_core::prelude::{ActionMapper, BundleAction, MappingError, MessageType, Payload, WireAction};

/// Maps wire actions by parsing their action type as a [`MessageType`] and
/// decoding the parameters as that type's request payload.
#[derive(Debug, Clone)]
pub struct PayloadActionMapper {
    supported: HashSet<MessageType>,
}

impl Default for PayloadActionMapper {
    fn default() -> Self {
        Self {
            supported: MessageType::ALL.into_iter().collect(),
        }
    }
}

impl PayloadActionMapper {
    /// A mapper accepting every message type.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapper accepting only `supported`.
    pub fn with_supported(supported: impl IntoIterator<Item = MessageType>) -> Self {
        Self {
            supported: supported.into_iter().collect(),
        }
    }
}

impl ActionMapper for PayloadActionMapper {
    fn map_action(&self, action: &WireAction) -> Result<BundleAction, MappingError> {
        let kind = action
            .action_type
            .parse::<MessageType>()
            .ok()
            .filter(|kind| self.supported.contains(kind))
            .ok_or_else(|| MappingError::UnsupportedActionType(action.action_type.clone()))?;
        let parameters = Payload::decode_request(kind, action.parameters.clone()).map_err(|e| {
            MappingError::InvalidParameters {
                action: kind,
                reason: e.to_string(),
            }
        })?;
        BundleAction::new(kind, parameters).map_err(|e| MappingError::InvalidParameters {
            action: kind,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn maps_known_actions_in_order() {
        let mapper = PayloadActionMapper::new();
        let actions = mapper
            .map_all_actions(&[
                WireAction::new("SYNCHRONIZE_TIME", json!({})),
                WireAction::new("GET_POWER_QUALITY_VALUES", json!({"logicalDevices": ["LD1"]})),
            ])
            .unwrap();
        let kinds: Vec<_> = actions.iter().map(BundleAction::kind).collect();
        assert_eq!(
            kinds,
            vec![MessageType::SynchronizeTime, MessageType::GetPowerQualityValues]
        );
    }

    #[test]
    fn unknown_or_unsupported_actions_fail() {
        let mapper = PayloadActionMapper::with_supported([MessageType::GetData]);
        assert_eq!(
            mapper.map_action(&WireAction::new("FIRMWARE_UPGRADE", json!({}))),
            Err(MappingError::UnsupportedActionType("FIRMWARE_UPGRADE".into()))
        );
        assert_eq!(
            mapper.map_action(&WireAction::new("SYNCHRONIZE_TIME", json!({}))),
            Err(MappingError::UnsupportedActionType("SYNCHRONIZE_TIME".into()))
        );
    }

    #[test]
    fn bad_parameters_are_reported_per_action() {
        let mapper = PayloadActionMapper::new();
        let error = mapper
            .map_action(&WireAction::new("SET_DEVICE_COMMUNICATION_SETTINGS", json!({"useSn": 1})))
            .unwrap_err();
        assert!(matches!(
            error,
            MappingError::InvalidParameters { action: MessageType::SetDeviceCommunicationSettings, .. }
        ));
    }
}
