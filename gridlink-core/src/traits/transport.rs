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

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::{Envelope, ResponseEnvelope};

/// Outbound path towards the protocol adapters. Fire-and-forget: returns once
/// the request is queued, never when a device answers.
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send(&self, request: Envelope) -> Result<(), TransportError>;
}

/// Response path towards the requesting organisation.
#[async_trait]
pub trait ResponseSender: Send + Sync {
    async fn send_response(&self, response: ResponseEnvelope) -> Result<(), TransportError>;
}
