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

use chrono::{DateTime, Utc};
use gridlink_core::prelude::{
    ComponentType, CorrelationId, ErrorDescriptor, MessageType, Payload, ResponseEnvelope,
    ResponseResult,
};
use serde::Serialize;

/// Result held in one bundle slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotOutcome {
    Pending,
    Succeeded(Payload),
    Failed(ErrorDescriptor),
}

impl SlotOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, SlotOutcome::Pending)
    }

    /// Reads the outcome a device response reports.
    pub fn from_response(response: &ResponseEnvelope) -> Self {
        match response.result {
            ResponseResult::Ok => {
                SlotOutcome::Succeeded(response.payload.clone().unwrap_or(Payload::Empty))
            }
            ResponseResult::NotOk | ResponseResult::NotFound => {
                SlotOutcome::Failed(response.error.clone().unwrap_or_else(|| {
                    let code = if response.result == ResponseResult::NotFound {
                        "NOT_FOUND"
                    } else {
                        "NOT_OK"
                    };
                    ErrorDescriptor::new(code, "device reported a failure", ComponentType::OsgpCore)
                }))
            }
        }
    }
}

/// One position of a bundle: the action kind submitted there and its result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSlot {
    pub index: usize,
    pub kind: MessageType,
    pub outcome: SlotOutcome,
}

/// Snapshot of a bundle's slots, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleResponse {
    pub correlation_id: CorrelationId,
    pub organisation_identification: String,
    pub device_identification: String,
    pub slots: Vec<BundleSlot>,
    /// Every slot holds a result.
    pub complete: bool,
}

/// Result of writing a partial response into a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWrite {
    Recorded { complete: bool },
    /// The slot already held a result; the write was ignored.
    Duplicate,
}

/// Mutable state of one bundle. Always accessed under its per-bundle lock.
#[derive(Debug)]
pub(crate) struct BundleState {
    correlation_id: CorrelationId,
    organisation_identification: String,
    device_identification: String,
    slots: Vec<BundleSlot>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl BundleState {
    pub(crate) fn new(
        correlation_id: CorrelationId,
        organisation_identification: &str,
        device_identification: &str,
        kinds: &[MessageType],
        created_at: DateTime<Utc>,
    ) -> Self {
        let slots = kinds
            .iter()
            .enumerate()
            .map(|(index, kind)| BundleSlot {
                index,
                kind: *kind,
                outcome: SlotOutcome::Pending,
            })
            .collect();
        Self {
            correlation_id,
            organisation_identification: organisation_identification.to_string(),
            device_identification: device_identification.to_string(),
            slots,
            created_at,
            completed_at: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the last pending slot was filled.
    pub(crate) fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| !slot.outcome.is_pending())
    }

    /// Checks that `response` belongs in slot `index`: same device and
    /// organisation as the bundle, and the action kind submitted there.
    /// Returns the reason on mismatch.
    pub(crate) fn check_response(&self, index: usize, response: &ResponseEnvelope) -> Result<(), String> {
        if response.organisation_identification != self.organisation_identification
            || response.device_identification != self.device_identification
        {
            return Err(format!(
                "response for {}/{} does not match bundle for {}/{}",
                response.organisation_identification,
                response.device_identification,
                self.organisation_identification,
                self.device_identification
            ));
        }
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| format!("slot {index} is out of range"))?;
        if slot.kind != response.message_type {
            return Err(format!(
                "slot {index} holds {} but the response is {}",
                slot.kind, response.message_type
            ));
        }
        Ok(())
    }

    fn stamp_completion(&mut self) -> bool {
        let complete = self.is_complete();
        if complete && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
        complete
    }

    /// Writes `outcome` into slot `index` unless it already holds one. `None`
    /// when the index is out of range.
    pub(crate) fn record(&mut self, index: usize, outcome: SlotOutcome) -> Option<SlotWrite> {
        let slot = self.slots.get_mut(index)?;
        if !slot.outcome.is_pending() {
            return Some(SlotWrite::Duplicate);
        }
        slot.outcome = outcome;
        Some(SlotWrite::Recorded {
            complete: self.stamp_completion(),
        })
    }

    /// Fails every pending slot with `descriptor`; returns how many were failed.
    pub(crate) fn fail_pending(&mut self, descriptor: &ErrorDescriptor) -> usize {
        let mut failed = 0;
        for slot in self.slots.iter_mut().filter(|s| s.outcome.is_pending()) {
            slot.outcome = SlotOutcome::Failed(descriptor.clone());
            failed += 1;
        }
        self.stamp_completion();
        failed
    }

    pub(crate) fn snapshot(&self) -> BundleResponse {
        BundleResponse {
            correlation_id: self.correlation_id.clone(),
            organisation_identification: self.organisation_identification.clone(),
            device_identification: self.device_identification.clone(),
            slots: self.slots.clone(),
            complete: self.is_complete(),
        }
    }
}
