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

use tracing::{info_span, Span};

/// The diagnostics sink handed to each component at construction.
///
/// Wraps the span a component records under. Components instrument their work
/// with it instead of reaching for ambient state, so an embedding application
/// decides where each component's events go by choosing the parent span.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    component: &'static str,
    span: Span,
}

impl Diagnostics {
    /// A root sink for `component`.
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            span: info_span!("gridlink", component),
        }
    }

    /// A sink recording under an existing span.
    pub fn with_span(component: &'static str, span: Span) -> Self {
        Self { component, span }
    }

    /// A sink that records nothing.
    pub fn disabled(component: &'static str) -> Self {
        Self {
            component,
            span: Span::none(),
        }
    }

    /// A sink for a sub-component, nested under this one.
    pub fn child(&self, component: &'static str) -> Self {
        Self {
            component,
            span: info_span!(parent: &self.span, "gridlink", component),
        }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
