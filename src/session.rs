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

//! Chat session orchestration.
//!
//! A session advertises the chat service, hands the first inbound connection
//! to a [`MessageChannel`] and tears everything down again on disconnect.
//! Only one client is ever served: the listener and the advertisement are
//! released as soon as a connection is accepted.
//!
//! The session is driven by its owner:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         signal = session.next_signal() => session.handle_signal(signal).await,
//!         line = input.next_line() => session.send_message(&line).await,
//!     }
//! }
//! ```

use bluer::Address;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bluetooth::{
    Accepted, AdvertisementHandle, ChannelEvent, CloseReason, ConnectionListener, ListenerHandle,
    MessageChannel, RfcommTransport, ServiceAdvertiser,
};
use crate::error::{ChannelError, SessionError, TransportError};
use crate::events::{
    SessionEvent, CLIENT_DISCONNECTED, DISCONNECTED, LISTENING, NO_CLIENT_CONNECTED,
};
use crate::state::SessionState;

/// Something that happened on the transport and must be applied to the session.
#[derive(Debug)]
pub enum Signal<S> {
    /// The listener produced its one connection (or failed to).
    Accepted(Result<Accepted<S>, TransportError>),
    /// The message channel produced an event.
    Channel(ChannelEvent),
}

/// The single live connection.
struct ActiveConnection<S> {
    channel: MessageChannel<S>,
    peer_name: String,
}

/// A two-peer chat session over one RFCOMM connection.
pub struct ChatSession<T: RfcommTransport> {
    transport: Arc<T>,
    advertiser: ServiceAdvertiser<T>,
    service_id: Uuid,
    state: SessionState,
    advertisement: Option<AdvertisementHandle<T::Advertisement>>,
    listener: Option<ListenerHandle<T::Stream>>,
    connection: Option<ActiveConnection<T::Stream>>,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl<T: RfcommTransport> ChatSession<T> {
    /// Create an idle session.
    ///
    /// Fails when `service_name` cannot be encoded as an SDP attribute.
    pub fn new(
        transport: Arc<T>,
        service_id: Uuid,
        service_name: &str,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Result<Self, SessionError> {
        let advertiser = ServiceAdvertiser::new(transport.clone(), service_name)?;
        Ok(Self {
            transport,
            advertiser,
            service_id,
            state: SessionState::Idle,
            advertisement: None,
            listener: None,
            connection: None,
            event_tx,
        })
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Display name of the connected peer.
    pub fn peer_name(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.peer_name.as_str())
    }

    pub fn is_advertising(&self) -> bool {
        self.advertisement.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Advertise the service and wait for one client.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if !self.state.is_idle() {
            warn!("Start requested while {}", self.state);
            return Err(SessionError::AlreadyActive(self.state));
        }

        let advertisement = match self.advertiser.start(self.service_id).await {
            Ok(advertisement) => advertisement,
            Err(TransportError::RadioUnavailable(reason)) => {
                self.report(format!("Make sure your Bluetooth Radio is on : {}", reason)).await;
                return Err(TransportError::RadioUnavailable(reason).into());
            }
            Err(e) => {
                self.report(format!("Failed to start advertising : {}", e)).await;
                return Err(e.into());
            }
        };
        self.advertisement = Some(advertisement);

        match ConnectionListener::bind_and_listen(self.transport.clone(), self.service_id).await {
            Ok(listener) => self.listener = Some(listener),
            Err(e) => {
                self.advertiser.stop(&mut self.advertisement).await;
                self.report(format!("Failed to listen for connections : {}", e)).await;
                return Err(e.into());
            }
        }

        self.set_state(SessionState::Advertising).await;
        self.report(LISTENING).await;
        Ok(())
    }

    /// Connect to a serving peer instead of waiting for one.
    pub async fn connect(&mut self, peer: Address) -> Result<(), SessionError> {
        if !self.state.is_idle() {
            warn!("Connect requested while {}", self.state);
            return Err(SessionError::AlreadyActive(self.state));
        }

        info!("Connecting to {} for service {}", peer, self.service_id);
        let stream = match self.transport.connect(peer, self.service_id).await {
            Ok(stream) => stream,
            Err(e) => {
                if e.is_radio_unavailable() {
                    self.report(format!("Make sure your Bluetooth Radio is on : {}", e)).await;
                } else {
                    self.report(format!("Failed to connect to {} : {}", peer, e)).await;
                }
                return Err(e.into());
            }
        };

        let peer_name = self.transport.resolve_peer_name(peer).await;
        self.open_channel(stream, peer_name.clone()).await;
        self.report(format!("Connected to Server : {}", peer_name)).await;
        Ok(())
    }

    /// Wait for the next transport signal.
    ///
    /// Cancel safe. Never completes while nothing is live.
    pub async fn next_signal(&mut self) -> Signal<T::Stream> {
        let listener = self.listener.as_mut();
        let connection = self.connection.as_mut();

        tokio::select! {
            Some(accepted) = next_accepted(listener) => Signal::Accepted(accepted),
            Some(event) = next_channel_event(connection) => Signal::Channel(event),
            else => std::future::pending().await,
        }
    }

    /// Apply a transport signal.
    pub async fn handle_signal(&mut self, signal: Signal<T::Stream>) {
        match signal {
            Signal::Accepted(Ok(accepted)) => self.on_connection_accepted(accepted).await,
            Signal::Accepted(Err(e)) => {
                error!("Accepting connection failed: {}", e);
                self.report(format!("Accepting connection failed : {}", e)).await;
                self.teardown().await;
            }
            Signal::Channel(ChannelEvent::Message(text)) => {
                let peer = self.peer_name().unwrap_or_default().to_string();
                self.emit(SessionEvent::MessageReceived { peer, text }).await;
            }
            Signal::Channel(ChannelEvent::Closed(reason)) => self.on_channel_closed(reason).await,
        }
    }

    /// Wait for one signal and apply it.
    ///
    /// Not cancel safe; use [`next_signal`](Self::next_signal) inside `select!`.
    pub async fn step(&mut self) {
        let signal = self.next_signal().await;
        self.handle_signal(signal).await;
    }

    /// Send `text` to the connected peer.
    ///
    /// The text is written unchanged; include `\n` to end a message. Without a
    /// connection this only reports [`NO_CLIENT_CONNECTED`].
    pub async fn send_message(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        let Some(connection) = self.connection.as_mut() else {
            self.report(NO_CLIENT_CONNECTED).await;
            return;
        };

        match connection.channel.send(text).await {
            Ok(()) => {
                self.emit(SessionEvent::MessageSent {
                    text: text.to_string(),
                })
                .await;
            }
            Err(ChannelError::Closed) => self.report(NO_CLIENT_CONNECTED).await,
            Err(ChannelError::Io(e)) => {
                warn!("Write failed: {}", e);
                self.report(format!("Send failed : {}", e)).await;
                self.teardown().await;
            }
        }
    }

    /// Tear down whatever is live and return to idle.
    ///
    /// Idempotent; does nothing when already idle.
    pub async fn disconnect(&mut self) {
        let was_active = !self.state.is_idle();
        self.teardown().await;
        if was_active {
            self.report(DISCONNECTED).await;
        }
    }

    /// Release the advertiser, listener and channel, then go idle.
    async fn teardown(&mut self) {
        self.advertiser.stop(&mut self.advertisement).await;

        if let Some(listener) = self.listener.take() {
            listener.stop().await;
        }

        if let Some(mut connection) = self.connection.take() {
            let reason = connection.channel.close().await;
            debug!("Channel to {} closed: {:?}", connection.peer_name, reason);
        }

        self.set_state(SessionState::Idle).await;
    }

    async fn on_connection_accepted(&mut self, accepted: Accepted<T::Stream>) {
        // One client only: retire the listener and the advertisement before
        // any byte is read from the new connection.
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
        }
        self.advertiser.stop(&mut self.advertisement).await;

        let peer_name = self.transport.resolve_peer_name(accepted.peer).await;
        self.open_channel(accepted.stream, peer_name.clone()).await;
        self.report(format!("Connected to Client : {}", peer_name)).await;
    }

    async fn on_channel_closed(&mut self, reason: CloseReason) {
        self.teardown().await;
        match reason {
            CloseReason::RemoteDisconnected => {
                info!("Peer disconnected");
                self.report(CLIENT_DISCONNECTED).await;
            }
            CloseReason::Failed(e) => {
                warn!("Connection lost: {}", e);
                self.report(format!("Connection lost : {}", e)).await;
            }
            CloseReason::LocallyAborted => {}
        }
    }

    async fn open_channel(&mut self, stream: T::Stream, peer_name: String) {
        info!("Connected to {}", peer_name);
        self.connection = Some(ActiveConnection {
            channel: MessageChannel::open(stream),
            peer_name,
        });
        self.set_state(SessionState::Connected).await;
    }

    async fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("Session state {} -> {}", self.state, state);
            self.state = state;
            self.emit(SessionEvent::StateChanged(state)).await;
        }
    }

    async fn report(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.emit(SessionEvent::Status(message)).await;
    }

    /// Emit an event.
    async fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event).await;
    }
}

async fn next_accepted<S>(
    listener: Option<&mut ListenerHandle<S>>,
) -> Option<Result<Accepted<S>, TransportError>> {
    match listener {
        Some(listener) => listener.accepted().await,
        None => None,
    }
}

async fn next_channel_event<S>(connection: Option<&mut ActiveConnection<S>>) -> Option<ChannelEvent>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
{
    match connection {
        Some(connection) => connection.channel.next_event().await,
        None => None,
    }
}

impl<T: RfcommTransport> std::fmt::Debug for ChatSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("service_id", &self.service_id)
            .field("state", &self.state)
            .field("peer", &self.peer_name())
            .finish()
    }
}
