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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;

/// What the device store knows about one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_identification: String,
    pub device_type: String,
    #[serde(default)]
    pub owner_organisation: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub protocol_name: String,
    pub protocol_version: String,
}

/// Lookup and save contract of the device store.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// The organisation currently owning `device`, if any.
    async fn find_owner_organisation(&self, device: &str) -> Result<Option<String>, RepositoryError>;

    /// The last known network address of `device`.
    async fn find_device_ip_address(&self, device: &str) -> Result<Option<String>, RepositoryError>;

    async fn device_exists(&self, device: &str) -> Result<bool, RepositoryError>;

    async fn save_device(&self, record: DeviceRecord) -> Result<(), RepositoryError>;

    /// Stores `record` unless a device with the same identification exists.
    /// Returns `false`, leaving the stored device untouched, when it does. The
    /// check and the insert are one atomic step.
    async fn add_device(&self, record: DeviceRecord) -> Result<bool, RepositoryError>;
}
