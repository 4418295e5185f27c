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

use chrono::Utc;
use gridlink::prelude::*;
use gridlink_core::payload::{SetDeviceCommunicationSettingsRequest, SynchronizeTimeRequest};
use gridlink_test::prelude::*;
use serde_json::json;

use crate::setup::*;

mod setup;

const RETENTION: Duration = Duration::from_secs(60);

struct BundleFixture {
    transport: Arc<RecordingTransport>,
    bundles: Arc<BundleOrchestrator>,
    intake: ResponseIntake,
}

fn fixture(response_timeout: Duration) -> BundleFixture {
    let transport = RecordingTransport::new();
    let devices = Arc::new(InMemoryDeviceRepository::new().with_device(meter("D1", Some("O1"))));
    let diagnostics = Diagnostics::new("bundle-test");
    let bundles = Arc::new(BundleOrchestrator::new(
        CorrelationIdProvider,
        transport.clone(),
        devices,
        Arc::new(PayloadActionMapper::new()),
        response_timeout,
        diagnostics.child("bundles"),
    )
    .with_retention(RETENTION));
    let intake = ResponseIntake::new(bundles.clone(), transport.clone(), diagnostics.child("intake"));
    BundleFixture {
        transport,
        bundles,
        intake,
    }
}

fn three_actions() -> anyhow::Result<Vec<BundleAction>> {
    Ok(vec![
        BundleAction::from_request(Payload::GetDataRequest(get_data_request()))?,
        BundleAction::from_request(Payload::SynchronizeTimeRequest(
            SynchronizeTimeRequest::default(),
        ))?,
        BundleAction::from_request(Payload::SetDeviceCommunicationSettingsRequest(
            SetDeviceCommunicationSettingsRequest {
                challenge_length: 16,
                with_list_supported: true,
                selective_access_supported: true,
                ip_address_is_static: false,
                use_sn: false,
                use_hdlc: true,
            },
        ))?,
    ])
}

/// The metadata of an outbound request, as its response would carry it.
fn metadata_of(request: &Envelope) -> DeviceMessageMetadata {
    DeviceMessageMetadata::new(
        request.correlation_id().clone(),
        request.organisation_identification().to_string(),
        request.device_identification().to_string(),
        request.message_type().expect("outbound requests are typed"),
        request.priority(),
        request.bundle_slot(),
    )
}

fn ok_response(request: &Envelope, value: serde_json::Value) -> ResponseEnvelope {
    ResponseEnvelope::ok(&metadata_of(request), Payload::Opaque(value))
}

/// Partial responses arriving in the order 3, 1, 2 are assembled back into
/// submission order.
#[gridlink_test]
async fn test_bundle_slots_follow_submission_order() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));

    let correlation_id = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::DEFAULT)
        .await?;

    let sent = fx.transport.requests();
    assert_eq!(sent.len(), 3);
    for (index, request) in sent.iter().enumerate() {
        assert_eq!(request.correlation_id(), &correlation_id);
        assert_eq!(request.bundle_slot(), Some(index));
        assert_eq!(request.ip_address(), Some("10.0.0.7"));
    }
    assert!(correlation_id.as_str().starts_with("O1|||D1|||corr_"));

    let pending = fx.bundles.assemble_bundle_response(&correlation_id)?;
    assert!(!pending.complete);
    assert!(pending.slots.iter().all(|s| s.outcome.is_pending()));

    for index in [2, 0, 1] {
        let response = ok_response(&sent[index], json!({ "slot": index }));
        let outcome = fx.intake.on_response(response).await?;
        assert!(matches!(outcome, IntakeOutcome::Bundled(SlotWrite::Recorded { .. })));
    }

    let assembled = fx.bundles.assemble_bundle_response(&correlation_id)?;
    assert!(assembled.complete);
    let kinds: Vec<_> = assembled.slots.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            MessageType::GetData,
            MessageType::SynchronizeTime,
            MessageType::SetDeviceCommunicationSettings,
        ]
    );
    for (index, slot) in assembled.slots.iter().enumerate() {
        assert_eq!(slot.index, index);
        assert_eq!(
            slot.outcome,
            SlotOutcome::Succeeded(Payload::Opaque(json!({ "slot": index })))
        );
    }
    assert!(fx.transport.responses().is_empty());
    assert!(fx.bundles.release(&correlation_id).is_some());
    assert_eq!(fx.bundles.open_bundles(), 0);
    Ok(())
}

/// One failing action leaves the other slots intact.
#[gridlink_test]
async fn test_failing_slot_keeps_the_others() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));
    let correlation_id = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::HIGHEST)
        .await?;
    let sent = fx.transport.requests();

    fx.intake
        .on_response(ok_response(&sent[0], json!("first")))
        .await?;
    let failure = ErrorDescriptor::new("NOT_OK", "clock rejected", ComponentType::OsgpCore);
    fx.intake
        .on_response(ResponseEnvelope::failure(&metadata_of(&sent[1]), failure.clone()))
        .await?;
    fx.intake
        .on_response(ok_response(&sent[2], json!("third")))
        .await?;

    let assembled = fx.bundles.assemble_bundle_response(&correlation_id)?;
    assert!(assembled.complete);
    assert_eq!(
        assembled.slots[0].outcome,
        SlotOutcome::Succeeded(Payload::Opaque(json!("first")))
    );
    assert_eq!(assembled.slots[1].outcome, SlotOutcome::Failed(failure));
    assert_eq!(
        assembled.slots[2].outcome,
        SlotOutcome::Succeeded(Payload::Opaque(json!("third")))
    );
    Ok(())
}

#[gridlink_test]
async fn test_duplicate_partial_response_is_ignored() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));
    let correlation_id = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::DEFAULT)
        .await?;
    let sent = fx.transport.requests();

    let first = fx
        .bundles
        .record_partial_response(&ok_response(&sent[0], json!(1)))?;
    let second = fx
        .bundles
        .record_partial_response(&ok_response(&sent[0], json!(2)))?;

    assert_eq!(first, SlotWrite::Recorded { complete: false });
    assert_eq!(second, SlotWrite::Duplicate);
    let assembled = fx.bundles.assemble_bundle_response(&correlation_id)?;
    assert_eq!(
        assembled.slots[0].outcome,
        SlotOutcome::Succeeded(Payload::Opaque(json!(1)))
    );
    assert!(fx.bundles.release(&correlation_id).is_none());
    Ok(())
}

#[gridlink_test]
async fn test_unknown_bundle_and_bad_slot_are_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));
    fx.bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::DEFAULT)
        .await?;
    let sent = fx.transport.requests();

    let mut out_of_range = ok_response(&sent[0], json!(null));
    out_of_range.bundle_slot = Some(7);
    let error = fx.bundles.record_partial_response(&out_of_range).unwrap_err();
    assert_eq!(error.code(), "INVALID_BUNDLE_SLOT");

    let mut stranger = ok_response(&sent[0], json!(null));
    stranger.correlation_id = correlation_id("O1|||D1|||corr_unknown");
    let error = fx.bundles.record_partial_response(&stranger).unwrap_err();
    assert_eq!(error.code(), "UNKNOWN_CORRELATION_ID");
    assert_eq!(fx.intake.on_response(stranger).await?, IntakeOutcome::Dropped);
    Ok(())
}

#[gridlink_test]
async fn test_empty_bundle_is_a_functional_error() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));

    let error = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", Vec::new(), MessagePriority::DEFAULT)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Functional);
    assert_eq!(error.code(), "EMPTY_BUNDLE");
    assert!(fx.transport.requests().is_empty());
    Ok(())
}

/// An action whose send fails holds the transport error in its slot.
#[gridlink_test]
async fn test_send_failure_fills_the_slot() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));
    fx.transport.set_closed(true);

    let correlation_id = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::DEFAULT)
        .await?;

    let assembled = fx.bundles.assemble_bundle_response(&correlation_id)?;
    assert!(assembled.complete);
    for slot in &assembled.slots {
        match &slot.outcome {
            SlotOutcome::Failed(descriptor) => assert_eq!(descriptor.code, "TRANSPORT_CLOSED"),
            other => panic!("slot {} not failed: {other:?}", slot.index),
        }
    }
    Ok(())
}

#[gridlink_test]
async fn test_expired_bundle_fails_pending_slots() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::ZERO);
    let correlation_id = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::DEFAULT)
        .await?;
    let sent = fx.transport.requests();
    fx.bundles
        .record_partial_response(&ok_response(&sent[1], json!("in time")))?;

    let expired = fx.bundles.expire_stale(Utc::now());

    assert_eq!(expired, 2);
    let assembled = fx.bundles.assemble_bundle_response(&correlation_id)?;
    assert!(assembled.complete);
    assert!(matches!(&assembled.slots[0].outcome, SlotOutcome::Failed(d) if d.code == "TIMEOUT"));
    assert!(matches!(assembled.slots[1].outcome, SlotOutcome::Succeeded(_)));
    assert_eq!(fx.bundles.expire_stale(Utc::now()), 0);
    Ok(())
}

/// Wire actions are mapped before anything is sent; one unsupported action
/// rejects the whole bundle.
#[gridlink_test]
async fn test_wire_bundle_maps_actions() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));

    let correlation_id = fx
        .bundles
        .enqueue_wire_bundle(
            "O1",
            "D1",
            &[
                WireAction::new("SYNCHRONIZE_TIME", json!({})),
                WireAction::new("GET_POWER_QUALITY_VALUES", json!({ "logicalDevices": ["LD1"] })),
            ],
            MessagePriority::DEFAULT,
        )
        .await?;
    assert_eq!(fx.transport.requests().len(), 2);
    assert_eq!(
        fx.bundles.assemble_bundle_response(&correlation_id)?.slots[1].kind,
        MessageType::GetPowerQualityValues
    );

    let error = fx
        .bundles
        .enqueue_wire_bundle(
            "O1",
            "D1",
            &[
                WireAction::new("SYNCHRONIZE_TIME", json!({})),
                WireAction::new("FIRMWARE_UPDATE", json!({})),
            ],
            MessagePriority::DEFAULT,
        )
        .await
        .unwrap_err();
    assert_eq!(error.code(), "UNSUPPORTED_ACTION_TYPE");
    assert_eq!(fx.transport.requests().len(), 2);
    Ok(())
}

/// A response is only written into the slot whose action it answers, for the
/// bundle's own device and organisation.
#[gridlink_test]
async fn test_misaddressed_partial_response_leaves_slot_pending() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));
    let correlation_id = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::DEFAULT)
        .await?;
    let sent = fx.transport.requests();

    // SYNCHRONIZE_TIME answer pointed at the GET_DATA slot.
    let mut wrong_kind = ok_response(&sent[1], json!("clock"));
    wrong_kind.bundle_slot = Some(0);
    let error = fx.bundles.record_partial_response(&wrong_kind).unwrap_err();
    assert_eq!(error.code(), "INVALID_BUNDLE_SLOT");

    let mut wrong_device = ok_response(&sent[0], json!("elsewhere"));
    wrong_device.device_identification = "D2".to_string();
    let error = fx.bundles.record_partial_response(&wrong_device).unwrap_err();
    assert_eq!(error.code(), "INVALID_BUNDLE_SLOT");

    let mut wrong_owner = ok_response(&sent[0], json!("elsewhere"));
    wrong_owner.organisation_identification = "O2".to_string();
    assert!(fx.bundles.record_partial_response(&wrong_owner).is_err());

    let assembled = fx.bundles.assemble_bundle_response(&correlation_id)?;
    assert!(assembled.slots[0].outcome.is_pending());

    let write = fx
        .bundles
        .record_partial_response(&ok_response(&sent[0], json!("data")))?;
    assert_eq!(write, SlotWrite::Recorded { complete: false });
    assert_eq!(
        fx.bundles.assemble_bundle_response(&correlation_id)?.slots[0].outcome,
        SlotOutcome::Succeeded(Payload::Opaque(json!("data")))
    );
    Ok(())
}

/// Complete bundles are dropped once their retention has passed; pending ones
/// stay until they complete or time out.
#[gridlink_test]
async fn test_settled_bundles_are_purged_after_retention() -> anyhow::Result<()> {
    initialize_tracing();
    let fx = fixture(Duration::from_secs(300));
    let finished = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::DEFAULT)
        .await?;
    let sent = fx.transport.requests();
    for request in &sent {
        fx.bundles
            .record_partial_response(&ok_response(request, json!(null)))?;
    }
    let waiting = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", three_actions()?, MessagePriority::DEFAULT)
        .await?;
    assert_eq!(fx.bundles.open_bundles(), 2);

    assert_eq!(fx.bundles.purge_settled(Utc::now()), 0);
    assert!(fx.bundles.assemble_bundle_response(&finished)?.complete);

    let past_retention = || Utc::now() + chrono::Duration::seconds(61);
    assert_eq!(fx.bundles.purge_settled(past_retention()), 1);
    assert_eq!(fx.bundles.open_bundles(), 1);
    let error = fx.bundles.assemble_bundle_response(&finished).unwrap_err();
    assert_eq!(error.code(), "UNKNOWN_CORRELATION_ID");
    assert!(!fx.bundles.assemble_bundle_response(&waiting)?.complete);

    // Timing out completes the bundle, which starts its retention.
    fx.bundles
        .expire_stale(Utc::now() + chrono::Duration::seconds(301));
    assert!(fx.bundles.assemble_bundle_response(&waiting)?.complete);
    assert_eq!(fx.bundles.purge_settled(Utc::now()), 0);
    assert_eq!(fx.bundles.purge_settled(past_retention()), 1);
    assert_eq!(fx.bundles.open_bundles(), 0);
    Ok(())
}

/// Partial responses for one bundle recorded from many tasks at once,
/// including racing duplicates, each land in their own slot exactly once.
#[gridlink_test]
async fn test_concurrent_partial_responses_fill_each_slot_once() -> anyhow::Result<()> {
    initialize_tracing();
    const SLOTS: usize = 16;
    const WRITERS_PER_SLOT: usize = 3;
    let fx = fixture(Duration::from_secs(300));

    let mut actions = Vec::with_capacity(SLOTS);
    for index in 0..SLOTS {
        actions.push(if index % 2 == 0 {
            BundleAction::from_request(Payload::GetDataRequest(get_data_request()))?
        } else {
            BundleAction::from_request(Payload::SynchronizeTimeRequest(
                SynchronizeTimeRequest::default(),
            ))?
        });
    }
    let correlation_id = fx
        .bundles
        .enqueue_bundle_request("O1", "D1", actions, MessagePriority::DEFAULT)
        .await?;
    let sent = fx.transport.requests();
    assert_eq!(sent.len(), SLOTS);

    let total = SLOTS * WRITERS_PER_SLOT;
    let start = Arc::new(tokio::sync::Barrier::new(total));
    let mut writers = Vec::with_capacity(total);
    // Stride 7 is coprime with the slot count, so slots are visited out of order.
    for step in 0..total {
        let index = (step * 7) % SLOTS;
        let response = ok_response(&sent[index], json!({ "slot": index, "writer": step }));
        let bundles = Arc::clone(&fx.bundles);
        let start = Arc::clone(&start);
        writers.push(tokio::spawn(async move {
            start.wait().await;
            (index, bundles.record_partial_response(&response))
        }));
    }

    let mut recorded = [0usize; SLOTS];
    let mut duplicates = 0;
    for writer in writers {
        let (index, write) = writer.await?;
        match write? {
            SlotWrite::Recorded { .. } => recorded[index] += 1,
            SlotWrite::Duplicate => duplicates += 1,
        }
    }
    assert!(recorded.iter().all(|count| *count == 1), "{recorded:?}");
    assert_eq!(duplicates, total - SLOTS);

    let assembled = fx.bundles.assemble_bundle_response(&correlation_id)?;
    assert!(assembled.complete);
    for (index, slot) in assembled.slots.iter().enumerate() {
        assert_eq!(slot.index, index);
        assert_eq!(slot.kind, sent[index].message_type()?);
        match &slot.outcome {
            SlotOutcome::Succeeded(Payload::Opaque(value)) => assert_eq!(value["slot"], json!(index)),
            other => panic!("slot {index} holds {other:?}"),
        }
    }
    Ok(())
}
