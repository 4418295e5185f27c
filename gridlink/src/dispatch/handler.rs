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

use async_trait::async_trait;
use gridlink_core::prelude::{DeviceRequest, DispatchError};

/// The single capability every message type is served by.
///
/// `handle` returns as soon as the downstream request is sent; the device's
/// answer re-enters the system later as an independent response. Cross-cutting
/// behaviour (tracing, error translation) is layered around implementations
/// rather than inherited.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError>;

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<H> MessageHandler for Arc<H>
where
    H: MessageHandler + ?Sized,
{
    async fn handle(&self, request: DeviceRequest) -> Result<(), DispatchError> {
        (**self).handle(request).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
