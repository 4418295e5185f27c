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

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gridlink::prelude::*;
use gridlink_core::payload::{GetDataRequest, MeasurementFilter, SystemFilter};
use parking_lot::Mutex;
use serde_json::json;

pub use gridlink_test::prelude::initialize_tracing;

/// A handler that records every request it receives and optionally fails.
#[derive(Clone, Default)]
pub struct CountingHandler {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<DeviceRequest>>>,
    failure: Option<DispatchError>,
}

impl CountingHandler {
    pub fn failing(error: DispatchError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DeviceRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl MessageHandler for CountingHandler {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "CountingHandler"
    }
}

/// A dispatcher wired to in-memory collaborators, with one counting handler
/// per registered type.
pub struct Harness {
    pub transport: Arc<RecordingTransport>,
    pub devices: Arc<InMemoryDeviceRepository>,
    pub tasks: Arc<InMemoryScheduledTaskRepository>,
    pub dispatcher: Arc<Dispatcher>,
    pub poller: DueTaskPoller,
    pub handlers: Vec<(MessageType, CountingHandler)>,
}

impl Harness {
    /// Counting handlers for every message type.
    pub fn complete() -> Self {
        Self::with_handlers(
            MessageType::ALL
                .into_iter()
                .map(|t| (t, CountingHandler::default()))
                .collect(),
        )
    }

    pub fn with_handlers(handlers: Vec<(MessageType, CountingHandler)>) -> Self {
        let transport = RecordingTransport::new();
        let devices = Arc::new(InMemoryDeviceRepository::new());
        let tasks = Arc::new(InMemoryScheduledTaskRepository::new());

        let mut builder = HandlerRegistry::builder();
        for (message_type, handler) in &handlers {
            builder = builder
                .register(*message_type, handler.clone())
                .expect("each type registered once");
        }
        let diagnostics = Diagnostics::new("test");
        let deferral = ScheduledDeferral::new(
            tasks.clone(),
            GridlinkConfig::default().domain_info(),
            diagnostics.child("deferral"),
        );
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(builder.build()),
            deferral,
            transport.clone(),
            diagnostics.child("dispatcher"),
        ));
        let poller = DueTaskPoller::new(
            tasks.clone(),
            dispatcher.clone(),
            Duration::from_millis(10),
            50,
            diagnostics.child("scheduler"),
        );
        Self {
            transport,
            devices,
            tasks,
            dispatcher,
            poller,
            handlers,
        }
    }

    pub fn handler(&self, message_type: MessageType) -> &CountingHandler {
        &self
            .handlers
            .iter()
            .find(|(t, _)| *t == message_type)
            .expect("handler registered for type")
            .1
    }

    pub fn total_calls(&self) -> usize {
        self.handlers.iter().map(|(_, h)| h.calls()).sum()
    }
}

pub fn meter(device: &str, owner: Option<&str>) -> DeviceRecord {
    DeviceRecord {
        device_identification: device.to_string(),
        device_type: "SMART_METER_E".to_string(),
        owner_organisation: owner.map(str::to_string),
        ip_address: Some("10.0.0.7".to_string()),
        protocol_name: "DSMR".to_string(),
        protocol_version: "4.2.2".to_string(),
    }
}

pub fn correlation_id(raw: &str) -> CorrelationId {
    CorrelationId::from_inbound(raw).expect("non-empty correlation id")
}

pub fn get_data_request() -> GetDataRequest {
    GetDataRequest {
        system_filters: vec![SystemFilter {
            id: 1,
            system_type: "RTU".to_string(),
            measurement_filters: vec![MeasurementFilter {
                id: 1,
                node: "Alm1".to_string(),
                all: false,
            }],
            all: false,
        }],
    }
}

pub fn get_data_envelope(correlation: &str, org: &str, device: &str) -> Envelope {
    Envelope::new(
        correlation_id(correlation),
        org,
        device,
        MessageType::GetData,
        Payload::GetDataRequest(get_data_request()),
    )
}

pub fn synchronize_time_envelope(
    correlation: &str,
    schedule_time: Option<DateTime<Utc>>,
) -> Envelope {
    Envelope::new(
        correlation_id(correlation),
        "O1",
        "D1",
        MessageType::SynchronizeTime,
        Payload::SynchronizeTimeRequest(Default::default()),
    )
    .with_schedule_time(schedule_time)
}

pub fn wire_frame(message_type: Option<&str>, payload: serde_json::Value) -> WireEnvelope {
    WireEnvelope {
        correlation_id: Some("C-wire".to_string()),
        organisation_identification: Some("O1".to_string()),
        device_identification: Some("D1".to_string()),
        message_type: message_type.map(str::to_string),
        payload,
        ..WireEnvelope::default()
    }
}

pub fn empty_object() -> serde_json::Value {
    json!({})
}
