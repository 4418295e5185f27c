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

//! Contracts of the external collaborators the core talks to.

pub use action_mapper::ActionMapper;
pub use device_repository::{DeviceRecord, DeviceRepository};
pub use scheduled_task_repository::ScheduledTaskRepository;
pub use transport::{RequestSender, ResponseSender};

/// Wire-action mapping contract.
mod action_mapper;
/// Device lookup and save contract.
mod device_repository;
mod scheduled_task_repository;
/// Outbound request and response channels.
mod transport;
