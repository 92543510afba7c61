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

//! Two-peer text chat over a Bluetooth RFCOMM channel.
//!
//! One peer advertises the chat service and accepts a single client; the
//! other connects to it. Both then exchange newline-terminated messages
//! until either side disconnects.

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod state;

pub use error::{ChannelError, SdpError, SessionError, TransportError};
pub use events::SessionEvent;
pub use session::{ChatSession, Signal};
pub use state::SessionState;
