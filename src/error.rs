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

//! Error types for the chat core.
//!
//! Expected transport conditions (radio off, bind refused, peer gone) are
//! distinct variants so callers can match on the kind instead of inspecting
//! platform error codes.

use thiserror::Error;

use crate::state::SessionState;

/// Failures reported by an [`RfcommTransport`](crate::bluetooth::RfcommTransport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The Bluetooth radio is absent or powered off.
    #[error("Bluetooth radio unavailable: {0}")]
    RadioUnavailable(String),

    /// The service could not be advertised.
    #[error("Advertise error: {0}")]
    Advertise(String),

    /// The listening endpoint could not be bound.
    #[error("Bind error: {0}")]
    Bind(String),

    /// Waiting for an inbound connection failed.
    #[error("Accept error: {0}")]
    Accept(String),

    /// An outbound connection could not be established.
    #[error("Connect error: {0}")]
    Connect(String),
}

/// Failures of the SDP attribute encoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdpError {
    /// The value does not fit in a single length byte.
    #[error("SDP text attribute is {0} bytes long, at most 255 fit in one length byte")]
    NameTooLong(usize),
}

/// Failures of the message write path.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No open connection to write to.
    #[error("Channel closed")]
    Closed,

    /// The underlying write or flush failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by [`ChatSession`](crate::session::ChatSession).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `start` or `connect` was called while the session was not idle.
    #[error("Session already active ({0})")]
    AlreadyActive(SessionState),

    /// A transport step failed; partial resources were rolled back.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured service name cannot be encoded.
    #[error(transparent)]
    Encoding(#[from] SdpError),
}

impl TransportError {
    /// Whether the user can fix this by turning the radio on.
    pub fn is_radio_unavailable(&self) -> bool {
        matches!(self, TransportError::RadioUnavailable(_))
    }
}
