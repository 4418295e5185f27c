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

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gridlink_core::prelude::{
    build_downstream_request, CorrelationId, CorrelationIdProvider, DeviceMessageMetadata,
    DeviceRepository, DispatchError, MessagePriority, MessageType, Payload, RequestSender,
    ResponseEnvelope,
};
use gridlink_core::payload::{
    GetDataRequest, GetDataResponse, Measurement, MeasurementFilter, Phase, SystemFilter,
    SystemIdentifier,
};
use tracing::{info, info_span, warn, Instrument};

use crate::common::Diagnostics;
use crate::intake::ResponseIntake;

/// The system and measurement the connectivity alarm is reported on.
pub const ALARM_SYSTEM_ID: u32 = 1;
pub const ALARM_SYSTEM_TYPE: &str = "RTU";
pub const ALARM_MEASUREMENT_ID: u32 = 1;
pub const ALARM_MEASUREMENT_NODE: &str = "Alm1";
pub const ALARM_PHASE_ID: u32 = 1;
pub const ALARM_PHASE_NAME: &str = "phsA";
/// Measurement value meaning "alarm active".
pub const ALARM_ON: f64 = 1.0;
const GOOD_QUALITY: u32 = 0;

/// Direction of a connectivity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryKind {
    ConnectionLost,
    CommunicationRestored,
}

/// A connectivity change for a device, resolved against its current owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverySignal {
    pub kind: RecoveryKind,
    pub device_identification: String,
    pub organisation_identification: String,
}

/// What a recovery operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// A synthetic response or a fresh request was emitted under this id.
    Emitted(CorrelationId),
    /// The device has no owner organisation; nothing was emitted.
    Skipped,
}

/// Reacts to devices losing and regaining connectivity.
///
/// Loss is reported as a locally made GET_DATA response carrying an active alarm
/// measurement, injected through the normal response path so subscribers need
/// no separate protocol. Restoration triggers a real GET_DATA read of the same
/// measurement.
pub struct CommunicationRecovery {
    devices: Arc<dyn DeviceRepository>,
    ids: CorrelationIdProvider,
    intake: Arc<ResponseIntake>,
    requests: Arc<dyn RequestSender>,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for CommunicationRecovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunicationRecovery").finish_non_exhaustive()
    }
}

impl CommunicationRecovery {
    pub fn new(
        devices: Arc<dyn DeviceRepository>,
        ids: CorrelationIdProvider,
        intake: Arc<ResponseIntake>,
        requests: Arc<dyn RequestSender>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            devices,
            ids,
            intake,
            requests,
            diagnostics,
        }
    }

    /// Resolves the owner of `device`. `None` when the device has no owner.
    pub async fn signal(
        &self,
        device: &str,
        kind: RecoveryKind,
    ) -> Result<Option<RecoverySignal>, DispatchError> {
        let owner = self.devices.find_owner_organisation(device).await?;
        Ok(owner.map(|organisation_identification| RecoverySignal {
            kind,
            device_identification: device.to_string(),
            organisation_identification,
        }))
    }

    /// Emits a synthetic alarm response for `device` without contacting it.
    pub async fn signal_connection_lost(&self, device: &str) -> Result<RecoveryOutcome, DispatchError> {
        let span = info_span!(parent: self.diagnostics.span(), "connection_lost", device);
        async {
            let Some(signal) = self.signal(device, RecoveryKind::ConnectionLost).await? else {
                warn!("device has no owner organisation; connection loss not reported");
                return Ok(RecoveryOutcome::Skipped);
            };

            let correlation_id = self
                .ids
                .new_correlation_id(&signal.organisation_identification, &signal.device_identification);
            let metadata = DeviceMessageMetadata::new(
                correlation_id.clone(),
                signal.organisation_identification,
                signal.device_identification,
                MessageType::GetData,
                MessagePriority::default(),
                None,
            );
            let response = ResponseEnvelope::ok(
                &metadata,
                Payload::GetDataResponse(alarm_response(Utc::now())),
            );
            self.intake.on_response(response).await?;
            info!(%correlation_id, "connection loss reported as alarm");
            Ok::<_, DispatchError>(RecoveryOutcome::Emitted(correlation_id))
        }
        .instrument(span)
        .await
    }

    /// Sends a fresh GET_DATA read of the alarm measurement to `device`.
    pub async fn restore_communication(&self, device: &str) -> Result<RecoveryOutcome, DispatchError> {
        let span = info_span!(parent: self.diagnostics.span(), "restore_communication", device);
        async {
            let Some(signal) = self
                .signal(device, RecoveryKind::CommunicationRestored)
                .await?
            else {
                warn!("device has no owner organisation; communication not restored");
                return Ok(RecoveryOutcome::Skipped);
            };

            let ip_address = self.devices.find_device_ip_address(device).await?;
            let correlation_id = self
                .ids
                .new_correlation_id(&signal.organisation_identification, &signal.device_identification);
            let request = build_downstream_request(
                correlation_id.clone(),
                &signal.organisation_identification,
                &signal.device_identification,
                Payload::GetDataRequest(alarm_filter()),
                MessageType::GetData,
                ip_address,
            );
            self.requests.send(request).await?;
            info!(%correlation_id, "data request sent after reconnection");
            Ok::<_, DispatchError>(RecoveryOutcome::Emitted(correlation_id))
        }
        .instrument(span)
        .await
    }
}

/// The synthetic GET_DATA response reporting an active connectivity alarm.
pub fn alarm_response(now: DateTime<Utc>) -> GetDataResponse {
    let phase = Phase {
        id: ALARM_PHASE_ID,
        name: ALARM_PHASE_NAME.to_string(),
        quality: GOOD_QUALITY,
        time: now,
        value: ALARM_ON,
    };
    let measurement = Measurement {
        id: ALARM_MEASUREMENT_ID,
        node: ALARM_MEASUREMENT_NODE.to_string(),
        quality: GOOD_QUALITY,
        time: now,
        value: ALARM_ON,
        phases: vec![phase],
    };
    GetDataResponse {
        systems: vec![SystemIdentifier {
            id: ALARM_SYSTEM_ID,
            system_type: ALARM_SYSTEM_TYPE.to_string(),
            measurements: vec![measurement],
        }],
        report: None,
    }
}

/// The GET_DATA filter selecting exactly the alarm measurement.
pub fn alarm_filter() -> GetDataRequest {
    GetDataRequest {
        system_filters: vec![SystemFilter {
            id: ALARM_SYSTEM_ID,
            system_type: ALARM_SYSTEM_TYPE.to_string(),
            measurement_filters: vec![MeasurementFilter {
                id: ALARM_MEASUREMENT_ID,
                node: ALARM_MEASUREMENT_NODE.to_string(),
                all: false,
            }],
            all: false,
        }],
    }
}
