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

use std::collections::HashMap;
use std::sync::Arc;

use gridlink_core::prelude::{DispatchError, MessageType};
use tracing::{debug, trace};

use crate::dispatch::layers::Traced;
use crate::dispatch::MessageHandler;

/// Maps each [`MessageType`] variant to the handler serving it.
///
/// Built once at startup through [`HandlerRegistryBuilder`] and read-only
/// afterwards, so lookups need no locking. Keys are enum variants; nothing
/// depends on the position of a variant in its declaration.
pub struct HandlerRegistry {
    handlers: HashMap<MessageType, Arc<dyn MessageHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("registered_types", &self.registered_types())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Resolves a raw message type as received on the wire.
    ///
    /// Fails with `UnknownMessageType` when `raw` is not a valid type and with
    /// `NoHandlerRegistered` when it is valid but unmapped.
    pub fn resolve(&self, raw: &str) -> Result<Arc<dyn MessageHandler>, DispatchError> {
        let message_type: MessageType = raw.parse()?;
        self.resolve_type(message_type)
    }

    pub fn resolve_type(
        &self,
        message_type: MessageType,
    ) -> Result<Arc<dyn MessageHandler>, DispatchError> {
        self.handlers
            .get(&message_type)
            .cloned()
            .ok_or(DispatchError::NoHandlerRegistered(message_type))
    }

    pub fn contains(&self, message_type: MessageType) -> bool {
        self.handlers.contains_key(&message_type)
    }

    /// Types without a handler, in declaration order.
    pub fn missing(&self) -> Vec<MessageType> {
        MessageType::ALL
            .into_iter()
            .filter(|t| !self.handlers.contains_key(t))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn registered_types(&self) -> Vec<MessageType> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Collects handler registrations before the registry is frozen.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<MessageType, Arc<dyn MessageHandler>>,
}

impl HandlerRegistryBuilder {
    /// Registers `handler` for `message_type`, wrapped in [`Traced`].
    ///
    /// Each type takes exactly one handler; a second registration fails with
    /// `DuplicateHandler`.
    pub fn register<H>(mut self, message_type: MessageType, handler: H) -> Result<Self, DispatchError>
    where
        H: MessageHandler + 'static,
    {
        if self.handlers.contains_key(&message_type) {
            return Err(DispatchError::DuplicateHandler(message_type));
        }
        trace!(%message_type, handler = handler.name(), "registering handler");
        self.handlers
            .insert(message_type, Arc::new(Traced::new(handler)));
        Ok(self)
    }

    /// Freezes the registry, tolerating unmapped types. Requests for them fail
    /// at dispatch time with `NoHandlerRegistered`.
    pub fn build(self) -> HandlerRegistry {
        debug!(registered = self.handlers.len(), "handler registry built");
        HandlerRegistry {
            handlers: self.handlers,
        }
    }

    /// Freezes the registry, failing with `IncompleteRegistry` unless every
    /// message type has a handler.
    pub fn build_complete(self) -> Result<HandlerRegistry, DispatchError> {
        let registry = self.build();
        let missing = registry.missing();
        if missing.is_empty() {
            Ok(registry)
        } else {
            Err(DispatchError::IncompleteRegistry { missing })
        }
    }
}
