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

use crate::error::{ComponentType, DispatchError};
use crate::message::{CorrelationId, DeviceMessageMetadata, MessagePriority, MessageType};
use crate::payload::Payload;

/// Outcome of a device function as reported to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseResult {
    Ok,
    NotOk,
    NotFound,
}

/// Machine-readable description of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    pub code: String,
    pub message: String,
    pub component: ComponentType,
}

impl ErrorDescriptor {
    pub fn new(code: impl Into<String>, message: impl Into<String>, component: ComponentType) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            component,
        }
    }

    /// A device that did not answer in time.
    pub fn timeout(component: ComponentType) -> Self {
        Self::new("TIMEOUT", "no response received before the deadline", component)
    }
}

impl From<&DispatchError> for ErrorDescriptor {
    fn from(error: &DispatchError) -> Self {
        Self::new(error.code(), error.to_string(), error.component())
    }
}

/// A response travelling back to the requester, correlated by `correlation_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub correlation_id: CorrelationId,
    pub organisation_identification: String,
    pub device_identification: String,
    pub message_type: MessageType,
    pub priority: MessagePriority,
    pub result: ResponseResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_slot: Option<usize>,
}

impl ResponseEnvelope {
    /// A successful response for the request described by `metadata`.
    pub fn ok(metadata: &DeviceMessageMetadata, payload: Payload) -> Self {
        Self::from_metadata(metadata, ResponseResult::Ok, Some(payload), None)
    }

    /// A failed response carrying the descriptor of `error`.
    pub fn error(metadata: &DeviceMessageMetadata, error: &DispatchError) -> Self {
        Self::failure(metadata, ErrorDescriptor::from(error))
    }

    pub fn failure(metadata: &DeviceMessageMetadata, descriptor: ErrorDescriptor) -> Self {
        Self::from_metadata(metadata, ResponseResult::NotOk, None, Some(descriptor))
    }

    fn from_metadata(
        metadata: &DeviceMessageMetadata,
        result: ResponseResult,
        payload: Option<Payload>,
        error: Option<ErrorDescriptor>,
    ) -> Self {
        Self {
            correlation_id: metadata.correlation_id.clone(),
            organisation_identification: metadata.organisation_identification.clone(),
            device_identification: metadata.device_identification.clone(),
            message_type: metadata.message_type,
            priority: metadata.priority,
            result,
            payload,
            error,
            bundle_slot: metadata.bundle_slot,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result == ResponseResult::Ok
    }

    /// The routing metadata this response answers.
    pub fn metadata(&self) -> DeviceMessageMetadata {
        DeviceMessageMetadata {
            correlation_id: self.correlation_id.clone(),
            organisation_identification: self.organisation_identification.clone(),
            device_identification: self.device_identification.clone(),
            message_type: self.message_type,
            priority: self.priority,
            bundle_slot: self.bundle_slot,
        }
    }
}
