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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gridlink_core::prelude::{Envelope, RequestSender, ResponseEnvelope, ResponseSender, TransportError};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::{error, trace};

/// Creates a bounded request channel and its sending half.
pub fn request_channel(capacity: usize) -> (ChannelRequestSender, Receiver<Envelope>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (ChannelRequestSender { sender }, receiver)
}

/// Creates a bounded response channel and its sending half.
pub fn response_channel(capacity: usize) -> (ChannelResponseSender, Receiver<ResponseEnvelope>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (ChannelResponseSender { sender }, receiver)
}

/// Sends one value, reserving capacity without waiting when the channel has
/// room and falling back to an awaited reservation when it is full.
async fn reserve_and_send<T: Send>(sender: &Sender<T>, value: T) -> Result<(), TransportError> {
    match sender.try_reserve() {
        Ok(permit) => {
            permit.send(value);
            return Ok(());
        }
        Err(TrySendError::Closed(())) => {
            error!("transport channel is closed");
            return Err(TransportError::ChannelClosed);
        }
        Err(TrySendError::Full(())) => {
            trace!("transport channel full, waiting for capacity");
        }
    }

    match sender.reserve().await {
        Ok(permit) => {
            permit.send(value);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "failed to reserve transport capacity");
            Err(TransportError::ChannelClosed)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelRequestSender {
    sender: Sender<Envelope>,
}

#[async_trait]
impl RequestSender for ChannelRequestSender {
    async fn send(&self, request: Envelope) -> Result<(), TransportError> {
        reserve_and_send(&self.sender, request).await
    }
}

#[derive(Debug, Clone)]
pub struct ChannelResponseSender {
    sender: Sender<ResponseEnvelope>,
}

#[async_trait]
impl ResponseSender for ChannelResponseSender {
    async fn send_response(&self, response: ResponseEnvelope) -> Result<(), TransportError> {
        reserve_and_send(&self.sender, response).await
    }
}

/// Keeps everything sent through it in memory, in send order.
///
/// Used where no real transport is attached. A closed recorder refuses every
/// send with `ChannelClosed`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<Envelope>>,
    responses: Mutex<Vec<ResponseEnvelope>>,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<Envelope> {
        self.requests.lock().clone()
    }

    pub fn responses(&self) -> Vec<ResponseEnvelope> {
        self.responses.lock().clone()
    }

    pub fn set_closed(&self, closed: bool) {
        self.closed.store(closed, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
        self.responses.lock().clear();
    }
}

#[async_trait]
impl RequestSender for RecordingTransport {
    async fn send(&self, request: Envelope) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ChannelClosed);
        }
        self.requests.lock().push(request);
        Ok(())
    }
}

#[async_trait]
impl ResponseSender for RecordingTransport {
    async fn send_response(&self, response: ResponseEnvelope) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ChannelClosed);
        }
        self.responses.lock().push(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use gridlink_core::prelude::{CorrelationId, MessageType, Payload};

    use super::*;

    fn envelope() -> Envelope {
        Envelope::new(
            CorrelationId::from_inbound("C1").unwrap(),
            "O1",
            "D1",
            MessageType::SynchronizeTime,
            Payload::Empty,
        )
    }

    #[tokio::test]
    async fn channel_sender_waits_for_capacity() {
        let (sender, mut receiver) = request_channel(1);
        sender.send(envelope()).await.unwrap();

        let second = tokio::spawn({
            let sender = sender.clone();
            async move { sender.send(envelope()).await }
        });
        assert!(receiver.recv().await.is_some());
        second.await.unwrap().unwrap();
        assert!(receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn closed_channel_is_reported() {
        let (sender, receiver) = request_channel(4);
        drop(receiver);
        assert_eq!(
            sender.send(envelope()).await,
            Err(TransportError::ChannelClosed)
        );
    }
}
