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

//! Error taxonomy for the dispatch and correlation core.
//!
//! Every failure that can cross the dispatch boundary is a [`DispatchError`].
//! Its [`ErrorKind`] decides what the boundary does with it. Protocol and
//! configuration errors are logged and returned to the caller. Decode errors
//! are logged and the request dropped. Functional and downstream errors become
//! error responses to the requester.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::MessageType;

/// The five failure categories the dispatch boundary distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or unknown message type, missing correlation id or identification.
    Protocol,
    /// The payload could not be interpreted; no reliable reply address exists.
    Decode,
    /// A business rule was violated.
    Functional,
    /// The device or a downstream collaborator failed.
    Downstream,
    /// A deployment defect, such as an unmapped handler.
    Configuration,
}

/// The subsystem a functional error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    DomainSmartMetering,
    DomainDistributionAutomation,
    WsSmartMetering,
    OsgpCore,
    Unknown,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentType::DomainSmartMetering => "DOMAIN_SMART_METERING",
            ComponentType::DomainDistributionAutomation => "DOMAIN_DISTRIBUTION_AUTOMATION",
            ComponentType::WsSmartMetering => "WS_SMART_METERING",
            ComponentType::OsgpCore => "OSGP_CORE",
            ComponentType::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Business-rule violations reported back to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionalErrorType {
    ExistingDevice,
    UnknownDevice,
    UnsupportedActionType,
    EmptyBundle,
    UnknownCorrelationId,
    InvalidBundleSlot,
}

impl FunctionalErrorType {
    /// Stable machine-readable code used in error responses.
    pub const fn code(self) -> &'static str {
        match self {
            FunctionalErrorType::ExistingDevice => "EXISTING_DEVICE",
            FunctionalErrorType::UnknownDevice => "UNKNOWN_DEVICE",
            FunctionalErrorType::UnsupportedActionType => "UNSUPPORTED_ACTION_TYPE",
            FunctionalErrorType::EmptyBundle => "EMPTY_BUNDLE",
            FunctionalErrorType::UnknownCorrelationId => "UNKNOWN_CORRELATION_ID",
            FunctionalErrorType::InvalidBundleSlot => "INVALID_BUNDLE_SLOT",
        }
    }
}

impl fmt::Display for FunctionalErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A business-rule violation, attributed to the component that detected it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{error_type} in {component}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct FunctionalError {
    pub error_type: FunctionalErrorType,
    pub component: ComponentType,
    pub detail: Option<String>,
}

impl FunctionalError {
    pub fn new(error_type: FunctionalErrorType, component: ComponentType) -> Self {
        Self {
            error_type,
            component,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Failures of the fire-and-forget transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport channel is closed")]
    ChannelClosed,
    #[error("transport channel is full")]
    Full,
}

/// Failures of a repository collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("serialization failure: {0}")]
    Serialization(String),
}

/// Failures of the wire-action mapper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("unsupported action type: {0}")]
    UnsupportedActionType(String),
    #[error("invalid parameters for {action}: {reason}")]
    InvalidParameters { action: MessageType, reason: String },
}

/// Failures while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to locate configuration directories: {0}")]
    Directories(String),
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Any failure that can reach the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("message type is missing")]
    MissingMessageType,
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
    #[error("correlation id is missing")]
    MissingCorrelationId,
    #[error("{field} is missing")]
    MissingIdentification { field: &'static str },
    #[error("no handler registered for {0}")]
    NoHandlerRegistered(MessageType),
    #[error("a handler for {0} is already registered")]
    DuplicateHandler(MessageType),
    #[error("no handler registered for: {}", display_types(.missing))]
    IncompleteRegistry { missing: Vec<MessageType> },
    #[error("cannot decode {message_type} payload: {reason}")]
    Decode { message_type: String, reason: String },
    #[error(transparent)]
    Functional(#[from] FunctionalError),
    #[error("downstream failure: {reason}")]
    Downstream { reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn display_types(types: &[MessageType]) -> String {
    types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl DispatchError {
    /// The category that drives boundary handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::MissingMessageType
            | DispatchError::UnknownMessageType(_)
            | DispatchError::MissingCorrelationId
            | DispatchError::MissingIdentification { .. } => ErrorKind::Protocol,
            DispatchError::NoHandlerRegistered(_)
            | DispatchError::DuplicateHandler(_)
            | DispatchError::IncompleteRegistry { .. } => ErrorKind::Configuration,
            DispatchError::Decode { .. } => ErrorKind::Decode,
            DispatchError::Functional(_) => ErrorKind::Functional,
            DispatchError::Downstream { .. }
            | DispatchError::Transport(_)
            | DispatchError::Repository(_) => ErrorKind::Downstream,
        }
    }

    /// Stable machine-readable code used in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::MissingMessageType => "MISSING_MESSAGE_TYPE",
            DispatchError::UnknownMessageType(_) => "UNKNOWN_MESSAGE_TYPE",
            DispatchError::MissingCorrelationId => "MISSING_CORRELATION_ID",
            DispatchError::MissingIdentification { .. } => "MISSING_IDENTIFICATION",
            DispatchError::NoHandlerRegistered(_) => "NO_HANDLER_REGISTERED",
            DispatchError::DuplicateHandler(_) => "DUPLICATE_HANDLER",
            DispatchError::IncompleteRegistry { .. } => "INCOMPLETE_REGISTRY",
            DispatchError::Decode { .. } => "DECODE_ERROR",
            DispatchError::Functional(error) => error.error_type.code(),
            DispatchError::Downstream { .. } => "DOWNSTREAM_FAILURE",
            DispatchError::Transport(TransportError::ChannelClosed) => "TRANSPORT_CLOSED",
            DispatchError::Transport(TransportError::Full) => "TRANSPORT_FULL",
            DispatchError::Repository(_) => "REPOSITORY_FAILURE",
        }
    }

    /// The component to attribute the error to in a response.
    pub fn component(&self) -> ComponentType {
        match self {
            DispatchError::Functional(error) => error.component,
            _ => ComponentType::DomainSmartMetering,
        }
    }

    pub fn decode(message_type: impl Into<String>, reason: impl fmt::Display) -> Self {
        DispatchError::Decode {
            message_type: message_type.into(),
            reason: reason.to_string(),
        }
    }

    pub fn downstream(reason: impl fmt::Display) -> Self {
        DispatchError::Downstream {
            reason: reason.to_string(),
        }
    }
}

impl From<MappingError> for DispatchError {
    fn from(error: MappingError) -> Self {
        match error {
            MappingError::UnsupportedActionType(action) => DispatchError::Functional(
                FunctionalError::new(
                    FunctionalErrorType::UnsupportedActionType,
                    ComponentType::WsSmartMetering,
                )
                .with_detail(action),
            ),
            MappingError::InvalidParameters { action, reason } => {
                DispatchError::decode(action.as_str(), reason)
            }
        }
    }
}
