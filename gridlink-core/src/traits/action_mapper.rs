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

use crate::error::MappingError;
use crate::message::{BundleAction, WireAction};

/// Converts wire action DTOs into internal bundle actions.
///
/// Total over the supported action vocabulary; anything else fails with
/// [`MappingError::UnsupportedActionType`].
pub trait ActionMapper: Send + Sync {
    fn map_action(&self, action: &WireAction) -> Result<BundleAction, MappingError>;

    /// Maps every action in order, stopping at the first failure.
    fn map_all_actions(&self, actions: &[WireAction]) -> Result<Vec<BundleAction>, MappingError> {
        actions.iter().map(|action| self.map_action(action)).collect()
    }
}
