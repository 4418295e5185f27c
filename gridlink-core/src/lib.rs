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

#![forbid(unsafe_code)]
//! Gridlink Core
//!
//! The data model shared by every gridlink component: the closed
//! [`MessageType`](message::MessageType) set, envelopes and their correlation
//! ids, response envelopes, scheduled tasks, payload value objects, the error
//! taxonomy and the contracts of the external collaborators (device store,
//! scheduled-task store, transport, action mapper).

/// Error taxonomy of the dispatch boundary.
pub mod error;
/// Envelope, correlation and scheduling model.
pub mod message;
/// Type-specific payload value objects.
pub mod payload;
/// Collaborator contracts.
pub mod traits;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use async_trait::async_trait;
    pub use gridlink_macro::grid_payload;

    pub use crate::error::{
        ComponentType, ConfigError, DispatchError, ErrorKind, FunctionalError,
        FunctionalErrorType, MappingError, RepositoryError, TransportError,
    };
    pub use crate::message::{
        build_downstream_request, BundleAction, CorrelationId, CorrelationIdProvider,
        DeviceMessageMetadata, DeviceRequest, DomainInfo, Envelope, ErrorDescriptor,
        MessagePriority, MessageType, ResponseEnvelope, ResponseResult, ScheduledTask,
        ScheduledTaskId, TaskStatus, WireAction, WireEnvelope,
    };
    pub use crate::payload::Payload;
    pub use crate::traits::{
        ActionMapper, DeviceRecord, DeviceRepository, RequestSender, ResponseSender,
        ScheduledTaskRepository,
    };
}
