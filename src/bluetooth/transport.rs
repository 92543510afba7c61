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

//! Platform transport abstraction.

use async_trait::async_trait;
use bluer::Address;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use super::sdp::SdpAttribute;
use crate::error::TransportError;

/// RFCOMM socket and service-record provider.
///
/// Handles are released by passing them back (`stop_advertising`,
/// `close_listener`) or by dropping them.
#[async_trait]
pub trait RfcommTransport: Send + Sync + 'static {
    /// A live service advertisement.
    type Advertisement: Send + 'static;

    /// A bound, listening endpoint.
    type Listener: Send + Sync + 'static;

    /// A connected byte stream.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Make the device discoverable under `service_id` with `attributes` attached.
    async fn advertise(
        &self,
        service_id: Uuid,
        attributes: &[SdpAttribute],
    ) -> Result<Self::Advertisement, TransportError>;

    /// Stop advertising.
    async fn stop_advertising(&self, advertisement: Self::Advertisement);

    /// Bind a listening endpoint for `service_id`.
    async fn bind(&self, service_id: Uuid) -> Result<Self::Listener, TransportError>;

    /// Wait for one inbound connection.
    async fn accept(
        &self,
        listener: &Self::Listener,
    ) -> Result<(Self::Stream, Address), TransportError>;

    /// Release a listening endpoint.
    async fn close_listener(&self, listener: Self::Listener);

    /// Connect to `service_id` on a remote device.
    async fn connect(&self, peer: Address, service_id: Uuid)
        -> Result<Self::Stream, TransportError>;

    /// Human-readable name of a remote device, for status reporting only.
    async fn resolve_peer_name(&self, peer: Address) -> String;
}
