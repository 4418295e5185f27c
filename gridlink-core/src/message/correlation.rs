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

use mti::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::DispatchError;

const SEPARATOR: &str = "|||";

/// Opaque token joining a request to its eventual asynchronous response.
///
/// A value is either minted by [`CorrelationIdProvider`] or accepted from the
/// wire with [`CorrelationId::from_inbound`]; it is never assembled by hand and
/// never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Accepts a correlation id received from a caller or a device so it can be
    /// threaded through. Surrounding whitespace is trimmed; an empty value is a
    /// protocol error.
    pub fn from_inbound(raw: impl AsRef<str>) -> Result<Self, DispatchError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DispatchError::MissingCorrelationId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = DispatchError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::from_inbound(raw)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

/// The only place new correlation ids come from.
///
/// Ids have the form `{organisation}|||{device}|||corr_<uuidv7>`. The prefix keeps
/// them traceable in logs; the time-ordered UUIDv7 suffix makes every id unique
/// for its (organisation, device, time) triple.
#[derive(Debug, Clone, Default)]
pub struct CorrelationIdProvider;

impl CorrelationIdProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn new_correlation_id(&self, organisation_id: &str, device_id: &str) -> CorrelationId {
        let suffix = "corr".create_type_id::<V7>();
        let id = CorrelationId(format!(
            "{organisation_id}{SEPARATOR}{device_id}{SEPARATOR}{suffix}"
        ));
        trace!(correlation_id = %id, "minted correlation id");
        id
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn minted_ids_carry_org_and_device() {
        let provider = CorrelationIdProvider::new();
        let id = provider.new_correlation_id("O1", "D1");
        let parts: Vec<&str> = id.as_str().split(SEPARATOR).collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "O1");
        assert_eq!(parts[1], "D1");
        assert!(parts[2].starts_with("corr_"));
    }

    #[test]
    fn minted_ids_are_unique() {
        let provider = CorrelationIdProvider::new();
        let ids: HashSet<CorrelationId> = (0..1_000)
            .map(|_| provider.new_correlation_id("O1", "D1"))
            .collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn inbound_ids_are_trimmed_and_non_empty() {
        assert_eq!(CorrelationId::from_inbound(" C1 ").unwrap().as_str(), "C1");
        assert_eq!(
            CorrelationId::from_inbound("   "),
            Err(DispatchError::MissingCorrelationId)
        );
    }

    #[test]
    fn deserialization_rejects_empty_ids() {
        let parsed: Result<CorrelationId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
        let parsed: CorrelationId = serde_json::from_str("\"C1\"").unwrap();
        assert_eq!(parsed.as_str(), "C1");
    }
}
