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

//! BlueZ RFCOMM transport.

use anyhow::Result;
use async_trait::async_trait;
use bluer::rfcomm::{Listener, Profile, ProfileHandle, Role, SocketAddr, Stream};
use bluer::{Adapter, Address, ErrorKind, Session};
use futures::StreamExt;
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::sdp::{service_record_xml, SdpAttribute};
use super::transport::RfcommTransport;
use crate::error::TransportError;

/// How long BlueZ may take to connect the chat profile on a peer.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// RFCOMM transport backed by the BlueZ daemon.
pub struct BluezTransport {
    session: Session,
    channel: u8,
}

/// Registered service record; dropping it unregisters the record.
pub struct BluezAdvertisement {
    _profile: ProfileHandle,
    adapter: Adapter,
}

/// Bound RFCOMM listening socket.
pub struct BluezListener {
    listener: Listener,
}

pin_project! {
    /// Connected RFCOMM stream.
    ///
    /// Outbound connections keep their client profile registered for as
    /// long as the stream lives.
    pub struct BluezStream {
        #[pin]
        stream: Stream,
        _profile: Option<ProfileHandle>,
    }
}

impl BluezTransport {
    /// Open a BlueZ session. Inbound connections are accepted on `channel`.
    pub async fn new(channel: u8) -> Result<Self> {
        info!("Initializing Bluetooth transport...");

        let session = Session::new().await?;
        info!("BlueZ session created");

        Ok(Self { session, channel })
    }

    /// Power on the default adapter if it is off.
    pub async fn power_on(&self) -> Result<()> {
        let adapter = self.session.default_adapter().await?;
        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter {}...", adapter.name());
            adapter.set_powered(true).await?;
        }
        Ok(())
    }

    /// Set the name the adapter is discovered under.
    pub async fn set_name(&self, name: &str) -> Result<()> {
        let adapter = self.session.default_adapter().await?;
        adapter.set_alias(name.to_string()).await?;
        info!("Bluetooth name set to: {}", name);
        Ok(())
    }

    /// Default adapter, provided it exists and is powered.
    async fn powered_adapter(&self) -> Result<Adapter, TransportError> {
        let adapter = self
            .session
            .default_adapter()
            .await
            .map_err(|e| classify(e, TransportError::Advertise))?;

        let powered = adapter
            .is_powered()
            .await
            .map_err(|e| classify(e, TransportError::Advertise))?;
        if !powered {
            return Err(TransportError::RadioUnavailable(format!(
                "adapter {} is powered off",
                adapter.name()
            )));
        }

        debug!("Using Bluetooth adapter: {}", adapter.name());
        Ok(adapter)
    }
}

#[async_trait]
impl RfcommTransport for BluezTransport {
    type Advertisement = BluezAdvertisement;
    type Listener = BluezListener;
    type Stream = BluezStream;

    async fn advertise(
        &self,
        service_id: Uuid,
        attributes: &[SdpAttribute],
    ) -> Result<BluezAdvertisement, TransportError> {
        let adapter = self.powered_adapter().await?;

        let profile = Profile {
            uuid: service_id,
            role: Some(Role::Server),
            service_record: Some(service_record_xml(service_id, self.channel, attributes)),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };

        let profile = self
            .session
            .register_profile(profile)
            .await
            .map_err(|e| classify(e, TransportError::Advertise))?;
        info!("SDP service record registered (UUID: {})", service_id);

        adapter
            .set_discoverable(true)
            .await
            .map_err(|e| classify(e, TransportError::Advertise))?;
        info!("Adapter {} is discoverable", adapter.name());

        Ok(BluezAdvertisement {
            _profile: profile,
            adapter,
        })
    }

    async fn stop_advertising(&self, advertisement: BluezAdvertisement) {
        if let Err(e) = advertisement.adapter.set_discoverable(false).await {
            warn!("Failed to clear discoverable flag: {}", e);
        }
        // Dropping the profile handle unregisters the service record.
        drop(advertisement);
    }

    async fn bind(&self, _service_id: Uuid) -> Result<BluezListener, TransportError> {
        let local_addr = SocketAddr::new(Address::any(), self.channel);
        let listener = Listener::bind(local_addr)
            .await
            .map_err(|e| TransportError::Bind(e.to_string()))?;
        info!("RFCOMM server listening on channel {}", self.channel);
        Ok(BluezListener { listener })
    }

    async fn accept(
        &self,
        listener: &BluezListener,
    ) -> Result<(BluezStream, Address), TransportError> {
        let (stream, remote_addr) = listener
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::Accept(e.to_string()))?;
        debug!("Connection from: {:?}", remote_addr);

        Ok((
            BluezStream {
                stream,
                _profile: None,
            },
            remote_addr.addr,
        ))
    }

    async fn close_listener(&self, listener: BluezListener) {
        drop(listener);
        debug!("RFCOMM listener on channel {} closed", self.channel);
    }

    async fn connect(
        &self,
        peer: Address,
        service_id: Uuid,
    ) -> Result<BluezStream, TransportError> {
        let adapter = self.powered_adapter().await?;
        let device = adapter
            .device(peer)
            .map_err(|e| classify(e, TransportError::Connect))?;

        let profile = Profile {
            uuid: service_id,
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };
        let mut handle = self
            .session
            .register_profile(profile)
            .await
            .map_err(|e| classify(e, TransportError::Connect))?;

        // BlueZ resolves the channel through SDP and hands the socket to the
        // registered profile, usually before ConnectProfile returns.
        let mut connecting =
            tokio::spawn(async move { device.connect_profile(&service_id).await });

        let (request, connect_done) = match wait_for_request(
            &mut handle,
            &mut connecting,
            CONNECT_TIMEOUT,
            |e| classify(e, TransportError::Connect),
        )
        .await
        {
            Ok(accepted) => accepted,
            Err(e) => {
                connecting.abort();
                warn!("Connecting to {} failed: {}", peer, e);
                return Err(e);
            }
        };
        debug!("Connection request from device: {}", request.device());

        let stream = match request.accept() {
            Ok(stream) => stream,
            Err(e) => {
                connecting.abort();
                return Err(TransportError::Connect(e.to_string()));
            }
        };

        if !connect_done {
            match connecting.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("ConnectProfile returned: {}", e),
                Err(e) => warn!("ConnectProfile task failed: {}", e),
            }
        }

        info!("Connected to {} (UUID: {})", peer, service_id);
        Ok(BluezStream {
            stream,
            _profile: Some(handle),
        })
    }

    async fn resolve_peer_name(&self, peer: Address) -> String {
        let Ok(adapter) = self.session.default_adapter().await else {
            return peer.to_string();
        };
        match adapter.device(peer) {
            Ok(device) => device.alias().await.unwrap_or_else(|_| peer.to_string()),
            Err(_) => peer.to_string(),
        }
    }
}

/// Wait for BlueZ to hand the outbound socket to the client profile.
///
/// Fails as soon as the ConnectProfile call does instead of waiting out
/// `limit`. Also returns whether that call has already completed, so the
/// caller does not poll it again.
async fn wait_for_request<S, E>(
    requests: &mut S,
    connecting: &mut JoinHandle<std::result::Result<(), E>>,
    limit: Duration,
    map_err: impl Fn(E) -> TransportError,
) -> std::result::Result<(S::Item, bool), TransportError>
where
    S: futures::Stream + Unpin,
{
    let wait = async {
        let mut connect_done = false;
        loop {
            tokio::select! {
                request = requests.next() => {
                    let unregistered = || TransportError::Connect("profile unregistered".into());
                    return request
                        .map(|request| (request, connect_done))
                        .ok_or_else(unregistered);
                }
                result = &mut *connecting, if !connect_done => {
                    connect_done = true;
                    match result {
                        Ok(Ok(())) => debug!("ConnectProfile returned, waiting for socket"),
                        Ok(Err(e)) => return Err(map_err(e)),
                        Err(e) => return Err(TransportError::Connect(e.to_string())),
                    }
                }
            }
        }
    };

    tokio::time::timeout(limit, wait)
        .await
        .map_err(|_| TransportError::Connect(format!("timed out after {}s", limit.as_secs())))?
}

/// Map a BlueZ error, singling out a missing or unready radio.
fn classify(err: bluer::Error, other: fn(String) -> TransportError) -> TransportError {
    match err.kind {
        ErrorKind::NotReady | ErrorKind::NotAvailable | ErrorKind::NotFound => {
            TransportError::RadioUnavailable(err.to_string())
        }
        _ => other(err.to_string()),
    }
}

impl AsyncRead for BluezStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().stream.poll_read(cx, buf)
    }
}

impl AsyncWrite for BluezStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.project().stream.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().stream.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().stream.poll_shutdown(cx)
    }
}

impl std::fmt::Debug for BluezStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BluezStream")
            .field("outbound", &self._profile.is_some())
            .finish()
    }
}

impl std::fmt::Debug for BluezTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BluezTransport")
            .field("channel", &self.channel)
            .finish()
    }
}
