// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single-shot connection listener.
//!
//! The listener accepts exactly one connection and then releases its bound
//! endpoint. It never accepts a second client.

use bluer::Address;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::transport::RfcommTransport;
use crate::error::TransportError;

/// A connection handed over by the listener.
#[derive(Debug)]
pub struct Accepted<S> {
    pub stream: S,
    pub peer: Address,
}

/// Handle to a pending listener.
pub struct ListenerHandle<S> {
    accepted_rx: Option<oneshot::Receiver<Result<Accepted<S>, TransportError>>>,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Binds the chat service endpoint and waits for one client.
pub struct ConnectionListener;

impl ConnectionListener {
    /// Bind a listening endpoint for `service_id` and start waiting for a client.
    ///
    /// Returns once the endpoint is bound; the accept runs in a background task.
    pub async fn bind_and_listen<T: RfcommTransport>(
        transport: Arc<T>,
        service_id: Uuid,
    ) -> Result<ListenerHandle<T::Stream>, TransportError> {
        let listener = transport.bind(service_id).await?;
        info!("Listening for incoming connections on {}", service_id);

        let (accepted_tx, accepted_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            Self::accept_once(transport, listener, accepted_tx, cancel_rx).await;
        });

        Ok(ListenerHandle {
            accepted_rx: Some(accepted_rx),
            cancel_tx: Some(cancel_tx),
            task,
        })
    }

    async fn accept_once<T: RfcommTransport>(
        transport: Arc<T>,
        listener: T::Listener,
        accepted_tx: oneshot::Sender<Result<Accepted<T::Stream>, TransportError>>,
        cancel_rx: oneshot::Receiver<()>,
    ) {
        let outcome = tokio::select! {
            biased;
            _ = cancel_rx => None,
            result = transport.accept(&listener) => Some(result),
        };

        // The endpoint is released before the connection is handed over, so
        // no second client can be accepted.
        transport.close_listener(listener).await;

        match outcome {
            Some(Ok((stream, peer))) => {
                info!("Accepted connection from {}", peer);
                if accepted_tx.send(Ok(Accepted { stream, peer })).is_err() {
                    debug!("Listener handle dropped, discarding connection from {}", peer);
                }
            }
            Some(Err(e)) => {
                warn!("Accept error: {}", e);
                let _ = accepted_tx.send(Err(e));
            }
            None => debug!("Listener cancelled"),
        }
    }
}

impl<S> ListenerHandle<S> {
    /// Wait for the accepted connection.
    ///
    /// Returns `None` once the outcome has been taken. Cancel safe.
    pub async fn accepted(&mut self) -> Option<Result<Accepted<S>, TransportError>> {
        let rx = self.accepted_rx.as_mut()?;
        let result = match rx.await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Accept("listener task ended".to_string())),
        };
        self.accepted_rx = None;
        Some(result)
    }

    /// Cancel a pending accept and wait for the endpoint to be released.
    pub async fn stop(mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
        // Dropping the receiver closes any connection accepted but not yet taken.
        self.accepted_rx = None;
        if let Err(e) = (&mut self.task).await {
            warn!("Listener task failed: {}", e);
        }
        debug!("Listener stopped");
    }
}

impl<S> std::fmt::Debug for ListenerHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("pending", &self.accepted_rx.is_some())
            .finish()
    }
}
