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
use std::time::Duration;

use gridlink::prelude::*;
use gridlink::recovery::{ALARM_MEASUREMENT_NODE, ALARM_ON};
use gridlink_test::prelude::*;

use crate::setup::*;

mod setup;

struct RecoveryFixture {
    transport: Arc<RecordingTransport>,
    recovery: CommunicationRecovery,
}

fn fixture(devices: InMemoryDeviceRepository) -> RecoveryFixture {
    let transport = RecordingTransport::new();
    let devices: Arc<InMemoryDeviceRepository> = Arc::new(devices);
    let diagnostics = Diagnostics::new("recovery-test");
    let bundles = Arc::new(BundleOrchestrator::new(
        CorrelationIdProvider,
        transport.clone(),
        devices.clone(),
        Arc::new(PayloadActionMapper::new()),
        Duration::from_secs(300),
        diagnostics.child("bundles"),
    ));
    let intake = Arc::new(ResponseIntake::new(
        bundles,
        transport.clone(),
        diagnostics.child("intake"),
    ));
    let recovery = CommunicationRecovery::new(
        devices,
        CorrelationIdProvider,
        intake,
        transport.clone(),
        diagnostics.child("recovery"),
    );
    RecoveryFixture {
        transport,
        recovery,
    }
}

/// Losing a device's connection yields one synthetic alarm response for its
/// owner and nothing towards the device.
#[gridlink_test]
async fn test_connection_lost_emits_alarm_response() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(InMemoryDeviceRepository::new().with_device(meter("D1", Some("O1"))));

    let outcome = fx.recovery.signal_connection_lost("D1").await?;

    let RecoveryOutcome::Emitted(correlation_id) = outcome else {
        panic!("expected an emitted alarm, got {outcome:?}");
    };
    assert!(correlation_id.as_str().starts_with("O1|||D1|||corr_"));
    assert!(fx.transport.requests().is_empty());

    let responses = fx.transport.responses();
    assert_eq!(responses.len(), 1);
    let response = &responses[0];
    assert_eq!(response.correlation_id, correlation_id);
    assert_eq!(response.organisation_identification, "O1");
    assert_eq!(response.message_type, MessageType::GetData);
    assert!(response.is_ok());
    let Some(Payload::GetDataResponse(data)) = &response.payload else {
        panic!("expected a GET_DATA response payload");
    };
    let measurement = &data.systems[0].measurements[0];
    assert_eq!(measurement.node, ALARM_MEASUREMENT_NODE);
    assert_eq!(measurement.value, ALARM_ON);
    Ok(())
}

#[gridlink_test]
async fn test_each_alarm_gets_a_fresh_correlation_id() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(InMemoryDeviceRepository::new().with_device(meter("D1", Some("O1"))));

    fx.recovery.signal_connection_lost("D1").await?;
    fx.recovery.signal_connection_lost("D1").await?;

    let responses = fx.transport.responses();
    assert_eq!(responses.len(), 2);
    assert_ne!(responses[0].correlation_id, responses[1].correlation_id);
    Ok(())
}

/// A device without an owner is a silent no-op in both directions.
#[gridlink_test]
async fn test_ownerless_device_is_skipped() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(InMemoryDeviceRepository::new().with_device(meter("D2", None)));

    assert_eq!(
        fx.recovery.signal_connection_lost("D2").await?,
        RecoveryOutcome::Skipped
    );
    assert_eq!(
        fx.recovery.restore_communication("D2").await?,
        RecoveryOutcome::Skipped
    );
    assert_eq!(
        fx.recovery.signal_connection_lost("unknown").await?,
        RecoveryOutcome::Skipped
    );
    assert!(fx.transport.responses().is_empty());
    assert!(fx.transport.requests().is_empty());
    Ok(())
}

/// Restored communication sends a GET_DATA read of the alarm measurement.
#[gridlink_test]
async fn test_restore_sends_data_request() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(InMemoryDeviceRepository::new().with_device(meter("D1", Some("O1"))));

    let RecoveryOutcome::Emitted(correlation_id) = fx.recovery.restore_communication("D1").await?
    else {
        panic!("expected an emitted request");
    };

    let requests = fx.transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.correlation_id(), &correlation_id);
    assert_eq!(request.message_type()?, MessageType::GetData);
    assert_eq!(request.ip_address(), Some("10.0.0.7"));
    let Payload::GetDataRequest(filter) = request.payload() else {
        panic!("expected a GET_DATA request payload");
    };
    assert_eq!(
        filter.system_filters[0].measurement_filters[0].node,
        ALARM_MEASUREMENT_NODE
    );
    assert!(fx.transport.responses().is_empty());
    Ok(())
}
