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

//! Bluetooth communication module.
//!
//! Service advertisement, the single-client RFCOMM listener and the
//! newline-framed message channel, plus the BlueZ transport backend.

mod advertiser;
mod bluez;
mod channel;
pub mod constants;
mod framing;
mod listener;
pub mod sdp;
mod transport;

pub use advertiser::{AdvertisementHandle, ServiceAdvertiser};
pub use bluez::{BluezAdvertisement, BluezListener, BluezStream, BluezTransport};
pub use channel::{ChannelEvent, ChannelState, CloseReason, MessageChannel};
pub use constants::{CHAT_SERVICE_UUID, DEFAULT_RFCOMM_CHANNEL, DEFAULT_SERVICE_NAME};
pub use framing::MessageBuffer;
pub use listener::{Accepted, ConnectionListener, ListenerHandle};
pub use sdp::{build_service_name, SdpAttribute};
pub use transport::RfcommTransport;
