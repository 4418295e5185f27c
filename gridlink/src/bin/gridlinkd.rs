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

use gridlink::common::init_tracing;
use gridlink::infra::{request_channel, response_channel, FileScheduledTaskRepository};
use gridlink::prelude::*;
use tracing::{info, warn};

#[gridlink_main]
async fn main() -> anyhow::Result<()> {
    let config = GridlinkConfig::load();
    let _guard = init_tracing(&config)?;

    let (requests, mut outbound) = request_channel(config.limits.outbound_capacity);
    let (responses, mut replies) = response_channel(config.limits.outbound_capacity);

    let tasks_path = config.data_directory().join("scheduled_tasks.json");
    let tasks = FileScheduledTaskRepository::open(&tasks_path).await?;
    let collaborators = Collaborators::in_memory(Arc::new(requests), Arc::new(responses))
        .with_tasks(Arc::new(tasks));

    let runtime = GridlinkApp::launch_async(config, collaborators).await?;
    info!(tasks = %tasks_path.display(), "gridlinkd running; press Ctrl-C to stop");

    let drain = tokio::spawn(async move {
        loop {
            tokio::select! {
                request = outbound.recv() => match request {
                    Some(request) => info!(
                        correlation_id = %request.correlation_id(),
                        message_type = request.raw_message_type(),
                        device = request.device_identification(),
                        "outbound request"
                    ),
                    None => break,
                },
                response = replies.recv() => match response {
                    Some(response) => info!(
                        correlation_id = %response.correlation_id,
                        result = ?response.result,
                        "outbound response"
                    ),
                    None => break,
                },
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    runtime.shutdown().await?;
    if !drain.is_finished() {
        warn!("transport drain still running at exit");
        drain.abort();
    }
    Ok(())
}
