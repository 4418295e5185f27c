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

//! Meter management functions.

use chrono::{DateTime, Utc};
use gridlink_macro::grid_payload;

/// DLMS communication parameters of a meter.
#[grid_payload(camel)]
pub struct SetDeviceCommunicationSettingsRequest {
    pub challenge_length: u32,
    pub with_list_supported: bool,
    pub selective_access_supported: bool,
    pub ip_address_is_static: bool,
    pub use_sn: bool,
    pub use_hdlc: bool,
}

#[grid_payload]
#[derive(Copy, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    Daily,
    Monthly,
    Interval,
}

/// Requests the periodic reads of a meter between two dates.
#[grid_payload(camel)]
pub struct PeriodicMeterReadsQuery {
    pub period_type: PeriodType,
    pub begin_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Read through the profile-generic object instead of the plain registers.
    #[serde(default)]
    pub profile_generic: bool,
}
