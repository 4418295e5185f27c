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

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;
use crate::message::MessageType;
use crate::payload::Payload;

/// One element of a bundle: an action kind and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleAction {
    kind: MessageType,
    parameters: Payload,
}

impl BundleAction {
    /// Builds an action, checking that the parameters belong to `kind`.
    pub fn new(kind: MessageType, parameters: Payload) -> Result<Self, DispatchError> {
        match parameters.request_type() {
            Some(actual) if actual == kind => Ok(Self { kind, parameters }),
            _ => Err(DispatchError::decode(
                kind.as_str(),
                "parameters do not match the action kind",
            )),
        }
    }

    /// Derives the kind from a request payload.
    pub fn from_request(parameters: Payload) -> Result<Self, DispatchError> {
        let kind = parameters
            .request_type()
            .ok_or_else(|| DispatchError::decode("BUNDLE_ACTION", "payload is not a request"))?;
        Ok(Self { kind, parameters })
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn parameters(&self) -> &Payload {
        &self.parameters
    }

    pub fn into_parameters(self) -> Payload {
        self.parameters
    }
}

/// A bundle action as it arrives from a client-facing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAction {
    pub action_type: String,
    #[serde(default)]
    pub parameters: Value,
}

impl WireAction {
    pub fn new(action_type: impl Into<String>, parameters: Value) -> Self {
        Self {
            action_type: action_type.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SynchronizeTimeRequest;

    #[test]
    fn kind_must_match_parameters() {
        let payload = Payload::SynchronizeTimeRequest(SynchronizeTimeRequest::default());
        assert!(BundleAction::new(MessageType::SynchronizeTime, payload.clone()).is_ok());
        assert!(BundleAction::new(MessageType::GetData, payload.clone()).is_err());
        assert_eq!(
            BundleAction::from_request(payload).unwrap().kind(),
            MessageType::SynchronizeTime
        );
        assert!(BundleAction::from_request(Payload::Empty).is_err());
    }
}
