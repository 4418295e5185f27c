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

use std::fmt;

use chrono::{DateTime, Utc};
use mti::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, RepositoryError};
use crate::message::{
    CorrelationId, DeviceMessageMetadata, DomainInfo, Envelope, MessagePriority, MessageType,
};
use crate::payload::Payload;

/// Identity of a persisted scheduled task (`task_<uuidv7>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduledTaskId(String);

impl ScheduledTaskId {
    pub fn generate() -> Self {
        Self("task".create_type_id::<V7>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduledTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a scheduled task.
///
/// `Created -> Due -> Dispatched` or `Created -> Cancelled`; both end states are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Created,
    Due,
    Dispatched,
    Cancelled,
}

impl TaskStatus {
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Created, TaskStatus::Due)
                | (TaskStatus::Due, TaskStatus::Dispatched)
                | (TaskStatus::Created, TaskStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Dispatched | TaskStatus::Cancelled)
    }
}

/// A persisted deferral record. Its content never changes after creation;
/// only the repository advances `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: ScheduledTaskId,
    pub correlation_id: CorrelationId,
    pub organisation_identification: String,
    pub device_identification: String,
    pub message_type: MessageType,
    pub domain: DomainInfo,
    pub priority: MessagePriority,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub payload: Value,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub scheduled_time: DateTime<Utc>,
    pub status: TaskStatus,
}

impl ScheduledTask {
    /// Captures a request for later execution in `Created` state.
    pub fn new(
        metadata: &DeviceMessageMetadata,
        domain: DomainInfo,
        ip_address: Option<String>,
        payload: &Payload,
        scheduled_time: DateTime<Utc>,
    ) -> Result<Self, RepositoryError> {
        let payload = payload
            .to_value()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        Ok(Self {
            id: ScheduledTaskId::generate(),
            correlation_id: metadata.correlation_id.clone(),
            organisation_identification: metadata.organisation_identification.clone(),
            device_identification: metadata.device_identification.clone(),
            message_type: metadata.message_type,
            domain,
            priority: metadata.priority,
            ip_address,
            payload,
            scheduled_time,
            status: TaskStatus::Created,
        })
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Created && self.scheduled_time <= now
    }

    /// Rebuilds the original request with the schedule time cleared, so a second
    /// pass through dispatch executes it immediately.
    pub fn rehydrate(&self) -> Result<Envelope, DispatchError> {
        let payload = Payload::decode_request(self.message_type, self.payload.clone())?;
        Ok(Envelope::new(
            self.correlation_id.clone(),
            self.organisation_identification.clone(),
            self.device_identification.clone(),
            self.message_type,
            payload,
        )
        .with_priority(self.priority)
        .with_ip_address(self.ip_address.clone())
        .with_schedule_time(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SynchronizeTimeRequest;

    fn task(at: DateTime<Utc>) -> ScheduledTask {
        let metadata = DeviceMessageMetadata::new(
            CorrelationId::from_inbound("C1").unwrap(),
            "O1".into(),
            "D1".into(),
            MessageType::SynchronizeTime,
            MessagePriority::HIGHEST,
            None,
        );
        ScheduledTask::new(
            &metadata,
            DomainInfo::new("SMART_METERING".into(), "1.0".into()),
            Some("10.0.0.1".into()),
            &Payload::SynchronizeTimeRequest(SynchronizeTimeRequest::default()),
            at,
        )
        .unwrap()
    }

    #[test]
    fn only_forward_transitions_are_allowed() {
        assert!(TaskStatus::Created.can_transition_to(TaskStatus::Due));
        assert!(TaskStatus::Due.can_transition_to(TaskStatus::Dispatched));
        assert!(TaskStatus::Created.can_transition_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Due.can_transition_to(TaskStatus::Due));
        assert!(!TaskStatus::Dispatched.can_transition_to(TaskStatus::Due));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Due));
        assert!(!TaskStatus::Created.can_transition_to(TaskStatus::Dispatched));
    }

    #[test]
    fn rehydrated_envelope_has_no_schedule_time() {
        let at = Utc::now();
        let envelope = task(at).rehydrate().unwrap();
        assert_eq!(envelope.schedule_time(), None);
        assert_eq!(envelope.correlation_id().as_str(), "C1");
        assert_eq!(envelope.priority(), MessagePriority::HIGHEST);
        assert_eq!(envelope.ip_address(), Some("10.0.0.1"));
        assert_eq!(envelope.message_type(), Ok(MessageType::SynchronizeTime));
    }

    #[test]
    fn due_only_once_elapsed() {
        let now = Utc::now();
        let task = task(now + chrono::Duration::seconds(10));
        assert!(!task.is_due(now));
        assert!(task.is_due(now + chrono::Duration::seconds(10)));
    }

    #[test]
    fn survives_a_json_round_trip() {
        let original = task(DateTime::from_timestamp_millis(1_700_000_000_000).unwrap());
        let json = serde_json::to_string(&original).unwrap();
        let restored: ScheduledTask = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
    }
}
