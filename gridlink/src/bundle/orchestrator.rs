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

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gridlink_core::prelude::{
    build_downstream_request, ActionMapper, BundleAction, ComponentType, CorrelationId,
    CorrelationIdProvider, DeviceRepository, DispatchError, ErrorDescriptor, FunctionalError,
    FunctionalErrorType, MessagePriority, MessageType, RequestSender, ResponseEnvelope,
    WireAction,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn, Instrument};

use crate::bundle::state::{BundleResponse, BundleState, SlotOutcome, SlotWrite};
use crate::common::Diagnostics;

/// Submits multi-action bundles for one device and reassembles their partial
/// responses in submission order.
///
/// Each bundle lives behind its own lock, so partial responses for different
/// bundles never contend and concurrent responses for the same bundle are
/// applied one at a time.
pub struct BundleOrchestrator {
    ids: CorrelationIdProvider,
    requests: Arc<dyn RequestSender>,
    devices: Arc<dyn DeviceRepository>,
    mapper: Arc<dyn ActionMapper>,
    bundles: DashMap<CorrelationId, Arc<Mutex<BundleState>>>,
    response_timeout: Duration,
    retention: Duration,
    diagnostics: Diagnostics,
}

/// How long a complete bundle stays retrievable unless configured otherwise.
pub const DEFAULT_BUNDLE_RETENTION: Duration = Duration::from_secs(600);

impl std::fmt::Debug for BundleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleOrchestrator")
            .field("open_bundles", &self.bundles.len())
            .field("response_timeout", &self.response_timeout)
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

fn functional(error_type: FunctionalErrorType) -> FunctionalError {
    FunctionalError::new(error_type, ComponentType::DomainSmartMetering)
}

impl BundleOrchestrator {
    pub fn new(
        ids: CorrelationIdProvider,
        requests: Arc<dyn RequestSender>,
        devices: Arc<dyn DeviceRepository>,
        mapper: Arc<dyn ActionMapper>,
        response_timeout: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            ids,
            requests,
            devices,
            mapper,
            bundles: DashMap::new(),
            response_timeout,
            retention: DEFAULT_BUNDLE_RETENTION,
            diagnostics,
        }
    }

    /// Keeps complete bundles retrievable for `retention` before
    /// [`purge_settled`](Self::purge_settled) drops them.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Submits `actions` for `device_id` under one fresh correlation id.
    ///
    /// All slots exist before the first request is sent, so a fast response can
    /// always be recorded. Every action is sent even when an earlier send
    /// fails; the failing action's slot holds the error instead. Returns as soon
    /// as the requests are queued.
    pub async fn enqueue_bundle_request(
        &self,
        organisation_id: &str,
        device_id: &str,
        actions: Vec<BundleAction>,
        priority: MessagePriority,
    ) -> Result<CorrelationId, DispatchError> {
        async {
            if actions.is_empty() {
                return Err(functional(FunctionalErrorType::EmptyBundle)
                    .with_detail("a bundle needs at least one action")
                    .into());
            }
            if organisation_id.trim().is_empty() {
                return Err(DispatchError::MissingIdentification {
                    field: "organisationIdentification",
                });
            }
            if device_id.trim().is_empty() {
                return Err(DispatchError::MissingIdentification {
                    field: "deviceIdentification",
                });
            }

            let correlation_id = self.ids.new_correlation_id(organisation_id, device_id);
            let kinds: Vec<MessageType> = actions.iter().map(BundleAction::kind).collect();
            let state = Arc::new(Mutex::new(BundleState::new(
                correlation_id.clone(),
                organisation_id,
                device_id,
                &kinds,
                Utc::now(),
            )));
            self.bundles.insert(correlation_id.clone(), Arc::clone(&state));

            let ip_address = match self.devices.find_device_ip_address(device_id).await {
                Ok(address) => address,
                Err(e) => {
                    warn!(device = device_id, error = %e, "no address hint for bundle");
                    None
                }
            };

            for (index, action) in actions.into_iter().enumerate() {
                let kind = action.kind();
                let request = build_downstream_request(
                    correlation_id.clone(),
                    organisation_id,
                    device_id,
                    action.into_parameters(),
                    kind,
                    ip_address.clone(),
                )
                .with_priority(priority)
                .with_bundle_slot(Some(index));

                if let Err(e) = self.requests.send(request).await {
                    let error = DispatchError::from(e);
                    warn!(%correlation_id, slot = index, action = %kind, error = %error,
                        "bundle action could not be sent");
                    state
                        .lock()
                        .record(index, SlotOutcome::Failed(ErrorDescriptor::from(&error)));
                }
            }

            info!(%correlation_id, device = device_id, actions = kinds.len(), "bundle enqueued");
            Ok::<_, DispatchError>(correlation_id)
        }
        .instrument(self.diagnostics.span().clone())
        .await
    }

    /// Maps wire actions through the action mapper, then submits them.
    pub async fn enqueue_wire_bundle(
        &self,
        organisation_id: &str,
        device_id: &str,
        actions: &[WireAction],
        priority: MessagePriority,
    ) -> Result<CorrelationId, DispatchError> {
        let mapped = self.mapper.map_all_actions(actions)?;
        self.enqueue_bundle_request(organisation_id, device_id, mapped, priority)
            .await
    }

    /// Writes one partial response into its bundle slot.
    ///
    /// A slot is written at most once; later responses for it are ignored. A
    /// response addressed to another device or organisation, or whose message
    /// type differs from the action submitted in that slot, fails with
    /// `INVALID_BUNDLE_SLOT` and leaves the slot untouched.
    pub fn record_partial_response(
        &self,
        response: &ResponseEnvelope,
    ) -> Result<SlotWrite, DispatchError> {
        let _entered = self.diagnostics.span().enter();
        let index = response.bundle_slot.ok_or_else(|| {
            functional(FunctionalErrorType::InvalidBundleSlot).with_detail("response has no bundle slot")
        })?;
        let state = self.bundle(&response.correlation_id)?;

        let write = {
            let mut state = state.lock();
            if let Err(detail) = state.check_response(index, response) {
                warn!(correlation_id = %response.correlation_id, slot = index, %detail,
                    "partial response rejected");
                return Err(functional(FunctionalErrorType::InvalidBundleSlot)
                    .with_detail(detail)
                    .into());
            }
            state
                .record(index, SlotOutcome::from_response(response))
                .ok_or_else(|| {
                    functional(FunctionalErrorType::InvalidBundleSlot)
                        .with_detail(format!("slot {index} is out of range"))
                })?
        };

        match write {
            SlotWrite::Recorded { complete } => debug!(
                correlation_id = %response.correlation_id,
                slot = index,
                complete,
                "partial response recorded"
            ),
            SlotWrite::Duplicate => warn!(
                correlation_id = %response.correlation_id,
                slot = index,
                "duplicate partial response ignored"
            ),
        }
        Ok(write)
    }

    /// The bundle's slots in submission order, and whether all are filled.
    pub fn assemble_bundle_response(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<BundleResponse, DispatchError> {
        Ok(self.bundle(correlation_id)?.lock().snapshot())
    }

    /// Fails the pending slots of every bundle older than the response timeout.
    /// Returns the number of slots failed.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> usize {
        let _entered = self.diagnostics.span().enter();
        let timeout = chrono::Duration::from_std(self.response_timeout)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let descriptor = ErrorDescriptor::timeout(ComponentType::OsgpCore);
        let states: Vec<_> = self
            .bundles
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut failed = 0;
        for (correlation_id, state) in states {
            let mut state = state.lock();
            let expired = state
                .created_at()
                .checked_add_signed(timeout)
                .is_some_and(|deadline| deadline <= now);
            if expired && !state.is_complete() {
                let count = state.fail_pending(&descriptor);
                warn!(%correlation_id, slots = count, total = state.len(), "bundle slots timed out");
                failed += count;
            }
        }
        failed
    }

    /// Removes a complete bundle and returns its final response. A bundle with
    /// pending slots is kept and `None` returned.
    pub fn release(&self, correlation_id: &CorrelationId) -> Option<BundleResponse> {
        let (_, state) = self
            .bundles
            .remove_if(correlation_id, |_, state| state.lock().is_complete())?;
        let response = state.lock().snapshot();
        Some(response)
    }

    /// Drops complete bundles that finished more than the retention period
    /// before `now`. Returns how many were dropped.
    pub fn purge_settled(&self, now: DateTime<Utc>) -> usize {
        let _entered = self.diagnostics.span().enter();
        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let before = self.bundles.len();
        self.bundles.retain(|correlation_id, state| {
            let state = state.lock();
            let settled = state
                .completed_at()
                .and_then(|at| at.checked_add_signed(retention))
                .is_some_and(|deadline| deadline <= now);
            if settled {
                debug!(%correlation_id, "settled bundle dropped");
            }
            !settled
        });
        before.saturating_sub(self.bundles.len())
    }

    pub fn open_bundles(&self) -> usize {
        self.bundles.len()
    }

    fn bundle(&self, correlation_id: &CorrelationId) -> Result<Arc<Mutex<BundleState>>, DispatchError> {
        self.bundles
            .get(correlation_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                functional(FunctionalErrorType::UnknownCorrelationId)
                    .with_detail(correlation_id.to_string())
                    .into()
            })
    }
}
