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

//! Envelope, correlation and scheduling model.

pub use bundle_action::{BundleAction, WireAction};
pub use correlation::{CorrelationId, CorrelationIdProvider};
pub use envelope::{build_downstream_request, DeviceMessageMetadata, DeviceRequest, DomainInfo, Envelope};
pub use message_type::MessageType;
pub use priority::MessagePriority;
pub use response::{ErrorDescriptor, ResponseEnvelope, ResponseResult};
pub use scheduled_task::{ScheduledTask, ScheduledTaskId, TaskStatus};
pub use wire::WireEnvelope;

mod bundle_action;
mod correlation;
mod envelope;
mod message_type;
mod priority;
mod response;
mod scheduled_task;
mod wire;
