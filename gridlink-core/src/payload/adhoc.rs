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

//! Ad-hoc device functions: data reads and time synchronisation.

use chrono::{DateTime, Utc};
use gridlink_macro::grid_payload;

/// Selects one measurement node of a system.
#[grid_payload(camel)]
pub struct MeasurementFilter {
    pub id: u32,
    pub node: String,
    /// Read every measurement instead of just this node.
    pub all: bool,
}

/// Selects the measurements of one system on the device.
#[grid_payload(camel)]
pub struct SystemFilter {
    pub id: u32,
    pub system_type: String,
    #[serde(default)]
    pub measurement_filters: Vec<MeasurementFilter>,
    pub all: bool,
}

#[grid_payload(camel)]
pub struct GetDataRequest {
    pub system_filters: Vec<SystemFilter>,
}

/// One phase of a measurement.
#[grid_payload(camel)]
pub struct Phase {
    pub id: u32,
    pub name: String,
    pub quality: u32,
    pub time: DateTime<Utc>,
    pub value: f64,
}

#[grid_payload(camel)]
pub struct Measurement {
    pub id: u32,
    pub node: String,
    pub quality: u32,
    pub time: DateTime<Utc>,
    pub value: f64,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// The measurements a device reported for one system.
#[grid_payload(camel)]
pub struct SystemIdentifier {
    pub id: u32,
    pub system_type: String,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

/// Reporting metadata attached to unsolicited device reports.
#[grid_payload(camel)]
pub struct Report {
    pub report_type: String,
    pub sequence_number: u32,
    pub time: DateTime<Utc>,
}

#[grid_payload(camel)]
pub struct GetDataResponse {
    pub systems: Vec<SystemIdentifier>,
    #[serde(default)]
    pub report: Option<Report>,
}

/// Pushes the platform clock to a device. Without a reference time the
/// protocol adapter uses its own clock at send time.
#[grid_payload(camel)]
#[derive(Default)]
pub struct SynchronizeTimeRequest {
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,
}
