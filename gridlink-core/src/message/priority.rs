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

use serde::{Deserialize, Serialize};

/// Delivery priority of an envelope, `0..=9`, higher is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct MessagePriority(u8);

impl MessagePriority {
    pub const LOWEST: MessagePriority = MessagePriority(0);
    pub const DEFAULT: MessagePriority = MessagePriority(4);
    pub const HIGHEST: MessagePriority = MessagePriority(9);

    /// Returns `None` for values outside `0..=9`.
    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::HIGHEST.0)
            .map(Self)
    }

    /// Parses a priority as callers send it, falling back to the default for
    /// anything missing, unparsable or out of range.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|r| r.trim().parse::<i64>().ok())
            .and_then(Self::new)
            .unwrap_or_default()
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for MessagePriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i64> for MessagePriority {
    fn from(value: i64) -> Self {
        Self::new(value).unwrap_or_default()
    }
}

impl From<MessagePriority> for u8 {
    fn from(priority: MessagePriority) -> Self {
        priority.0
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_falls_back_to_default() {
        assert_eq!(MessagePriority::from(12), MessagePriority::DEFAULT);
        assert_eq!(MessagePriority::from(-1), MessagePriority::DEFAULT);
        assert_eq!(MessagePriority::from(9), MessagePriority::HIGHEST);
    }

    #[test]
    fn parses_caller_strings() {
        assert_eq!(MessagePriority::parse_or_default(Some("7")).value(), 7);
        assert_eq!(MessagePriority::parse_or_default(Some("urgent")), MessagePriority::DEFAULT);
        assert_eq!(MessagePriority::parse_or_default(None), MessagePriority::DEFAULT);
    }

    #[test]
    fn higher_is_more_urgent() {
        assert!(MessagePriority::HIGHEST > MessagePriority::DEFAULT);
        assert!(MessagePriority::DEFAULT > MessagePriority::LOWEST);
    }
}
