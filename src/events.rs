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

//! Events reported by a chat session to its owner.

use std::fmt;

use crate::state::SessionState;

/// Status reported when a message is sent without a connected peer.
pub const NO_CLIENT_CONNECTED: &str =
    "No clients connected, please wait for a client to connect before attempting to send a message";

/// Status reported once the session is advertising.
pub const LISTENING: &str = "Listening for incoming connections";

/// Status reported after the peer closed the connection.
pub const CLIENT_DISCONNECTED: &str = "Client disconnected";

/// Status reported after the user disconnects.
pub const DISCONNECTED: &str = "Disconnected.";

/// Events emitted by a [`ChatSession`](crate::session::ChatSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A complete message arrived from the peer.
    MessageReceived { peer: String, text: String },
    /// A message was written to the peer.
    MessageSent { text: String },
    /// Free-form lifecycle or diagnostic report.
    Status(String),
    /// The session moved to a new state.
    StateChanged(SessionState),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::MessageReceived { peer, text } => {
                write!(f, "Received : {} : {}", peer, text)
            }
            SessionEvent::MessageSent { text } => {
                write!(f, "Sent : {}", text.trim_end_matches('\n'))
            }
            SessionEvent::Status(message) => f.write_str(message),
            SessionEvent::StateChanged(state) => write!(f, "State : {}", state),
        }
    }
}
