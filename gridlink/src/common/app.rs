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

use gridlink_core::prelude::{
    ActionMapper, CorrelationIdProvider, DeviceRepository, RequestSender, ResponseSender,
    ScheduledTaskRepository,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, trace};

use crate::bundle::{BundleOrchestrator, PayloadActionMapper};
use crate::common::runtime::{spawn_bundle_sweeper, GridlinkRuntime, RuntimeParts};
use crate::common::workers::InboundWorkers;
use crate::common::{Diagnostics, GridlinkConfig};
use crate::dispatch::{Dispatcher, HandlerRegistry, HandlerRegistryBuilder};
use crate::infra::{InMemoryDeviceRepository, InMemoryScheduledTaskRepository};
use crate::intake::ResponseIntake;
use crate::recovery::CommunicationRecovery;
use crate::scheduling::{DueTaskPoller, ScheduledDeferral};
use crate::services::register_standard_handlers;

/// The external systems a runtime talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub devices: Arc<dyn DeviceRepository>,
    pub tasks: Arc<dyn ScheduledTaskRepository>,
    pub requests: Arc<dyn RequestSender>,
    pub responses: Arc<dyn ResponseSender>,
    pub mapper: Arc<dyn ActionMapper>,
}

impl Collaborators {
    /// In-memory stores and the default action mapper around the given transport.
    pub fn in_memory(requests: Arc<dyn RequestSender>, responses: Arc<dyn ResponseSender>) -> Self {
        Self {
            devices: Arc::new(InMemoryDeviceRepository::new()),
            tasks: Arc::new(InMemoryScheduledTaskRepository::new()),
            requests,
            responses,
            mapper: Arc::new(PayloadActionMapper::new()),
        }
    }

    pub fn with_devices(mut self, devices: Arc<dyn DeviceRepository>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_tasks(mut self, tasks: Arc<dyn ScheduledTaskRepository>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn ActionMapper>) -> Self {
        self.mapper = mapper;
        self
    }
}

#[derive(Default, Debug, Clone)]
pub struct GridlinkApp;

impl GridlinkApp {
    /// Starts a runtime serving every message type with the standard handlers.
    pub async fn launch_async(
        config: GridlinkConfig,
        collaborators: Collaborators,
    ) -> anyhow::Result<GridlinkRuntime> {
        let builder = register_standard_handlers(
            HandlerRegistry::builder(),
            collaborators.requests.clone(),
            collaborators.devices.clone(),
        )?;
        Self::launch_with_handlers(config, collaborators, builder).await
    }

    /// Starts a runtime around caller-supplied handler registrations.
    ///
    /// With `dispatch.require_complete_registry` set, launching fails unless
    /// every message type has a handler.
    pub async fn launch_with_handlers(
        config: GridlinkConfig,
        collaborators: Collaborators,
        handlers: HandlerRegistryBuilder,
    ) -> anyhow::Result<GridlinkRuntime> {
        trace!("Starting gridlink initialization");
        let root = Diagnostics::new("runtime");

        let registry = if config.dispatch.require_complete_registry {
            handlers.build_complete()?
        } else {
            handlers.build()
        };
        let registry = Arc::new(registry);
        info!(registered = ?registry.registered_types(), "handler registry ready");

        let deferral = ScheduledDeferral::new(
            collaborators.tasks.clone(),
            config.domain_info(),
            root.child("deferral"),
        );
        let dispatcher = Arc::new(Dispatcher::new(
            registry,
            deferral,
            collaborators.responses.clone(),
            root.child("dispatcher"),
        ));
        let bundles = Arc::new(BundleOrchestrator::new(
            CorrelationIdProvider,
            collaborators.requests.clone(),
            collaborators.devices.clone(),
            collaborators.mapper.clone(),
            config.bundle_response_timeout(),
            root.child("bundles"),
        )
        .with_retention(config.bundle_retention()));
        let intake = Arc::new(ResponseIntake::new(
            bundles.clone(),
            collaborators.responses.clone(),
            root.child("intake"),
        ));
        let recovery = Arc::new(CommunicationRecovery::new(
            collaborators.devices.clone(),
            CorrelationIdProvider,
            intake.clone(),
            collaborators.requests.clone(),
            root.child("recovery"),
        ));
        let poller = DueTaskPoller::new(
            collaborators.tasks.clone(),
            dispatcher.clone(),
            config.poll_interval(),
            config.scheduler.batch_size,
            root.child("scheduler"),
        );

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let (inbound, receiver) = mpsc::channel(config.limits.inbound_capacity.max(1));
        let workers = InboundWorkers::new(
            dispatcher.clone(),
            config.limits.max_concurrent_dispatches,
            root.child("inbound"),
        );
        tracker.spawn(workers.run(receiver, cancel.clone()));

        if config.scheduler.enabled {
            tracker.spawn(poller.clone().run(cancel.clone()));
        } else {
            info!("scheduler disabled; scheduled tasks only run through poll_now");
        }
        spawn_bundle_sweeper(
            &tracker,
            bundles.clone(),
            config.poll_interval(),
            cancel.clone(),
            root.child("bundle-sweeper"),
        );

        trace!("gridlink initialization complete");
        Ok(GridlinkRuntime::new(RuntimeParts {
            config,
            dispatcher,
            bundles,
            intake,
            recovery,
            poller,
            inbound,
            cancel,
            tracker,
            diagnostics: root,
        }))
    }
}
