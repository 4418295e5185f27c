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

//! Message dispatch and scheduling for a smart metering platform.
//!
//! Inbound requests are validated and routed to one handler per message type.
//! Requests with a future schedule time are persisted and activated later by
//! the due-task poller. Multi-action bundles for one device are sent under a
//! single correlation id and their partial responses reassembled in order.
//!
//! ```rust,no_run
//! use gridlink::prelude::*;
//!
//! #[gridlink_main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = RecordingTransport::new();
//!     let runtime = GridlinkApp::launch_async(
//!         GridlinkConfig::default(),
//!         Collaborators::in_memory(transport.clone(), transport.clone()),
//!     )
//!     .await?;
//!     runtime.shutdown().await
//! }
//! ```

#![forbid(unsafe_code)]

pub mod bundle;
pub mod common;
pub mod dispatch;
pub mod infra;
pub mod intake;
pub mod recovery;
pub mod scheduling;
pub mod services;

pub mod prelude {
    pub use gridlink_core::prelude::*;
    pub use gridlink_macro::gridlink_main;
    pub use tokio;

    pub use crate::bundle::{
        BundleOrchestrator, BundleResponse, BundleSlot, PayloadActionMapper, SlotOutcome,
        SlotWrite,
    };
    pub use crate::common::{
        init_tracing, Collaborators, Diagnostics, GridlinkApp, GridlinkConfig, GridlinkRuntime,
    };
    pub use crate::dispatch::{
        DispatchOutcome, Dispatcher, HandlerRegistry, HandlerRegistryBuilder, MessageHandler,
    };
    pub use crate::infra::{
        FileScheduledTaskRepository, InMemoryDeviceRepository, InMemoryScheduledTaskRepository,
        RecordingTransport,
    };
    pub use crate::intake::{IntakeOutcome, ResponseIntake};
    pub use crate::recovery::{CommunicationRecovery, RecoveryKind, RecoveryOutcome};
    pub use crate::scheduling::{DueTaskPoller, PollReport, ScheduledDeferral};
}
