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

//! Service identity and wire constants for the RFCOMM chat service.

use uuid::Uuid;

/// RFCOMM chat service UUID.
pub const CHAT_SERVICE_UUID: Uuid = Uuid::from_u128(0x4e989e9f_f81a_4ee8_b9a7_bb74d5cd3c96);

/// Default value of the Service Name SDP attribute.
pub const DEFAULT_SERVICE_NAME: &str = "bluetooth rfcomm sample";

/// Default RFCOMM channel the listener binds to.
pub const DEFAULT_RFCOMM_CHANNEL: u8 = 4;

/// Highest valid RFCOMM server channel.
pub const MAX_RFCOMM_CHANNEL: u8 = 30;

/// Message delimiter on the chat byte stream.
pub const MESSAGE_TERMINATOR: u8 = b'\n';

/// Longest message accepted from a peer, in bytes.
pub const MAX_MESSAGE_LEN: usize = 64 * 1024;

/// SDP attribute ids and data element type descriptors.
pub mod sdp {
    /// Service Name attribute (language base 0x0100 + offset 0).
    pub const SERVICE_NAME_ATTRIBUTE_ID: u16 = 0x0100;

    /// Data element type "text string" (4) in the high five bits.
    pub const TYPE_TEXT: u8 = 4;

    /// Size index 5: the length follows in one byte.
    pub const SIZE_U8_LENGTH: u8 = 5;

    /// Type byte of the Service Name attribute: `(4 << 3) | 5`.
    pub const SERVICE_NAME_ATTRIBUTE_TYPE: u8 = (TYPE_TEXT << 3) | SIZE_U8_LENGTH;

    /// ServiceClassIDList attribute.
    pub const SERVICE_CLASS_ID_LIST: u16 = 0x0001;

    /// ProtocolDescriptorList attribute.
    pub const PROTOCOL_DESCRIPTOR_LIST: u16 = 0x0004;

    /// BrowseGroupList attribute.
    pub const BROWSE_GROUP_LIST: u16 = 0x0005;

    /// L2CAP protocol UUID (16-bit).
    pub const L2CAP_UUID16: u16 = 0x0100;

    /// RFCOMM protocol UUID (16-bit).
    pub const RFCOMM_UUID16: u16 = 0x0003;

    /// PublicBrowseRoot group UUID (16-bit).
    pub const PUBLIC_BROWSE_ROOT_UUID16: u16 = 0x1002;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            CHAT_SERVICE_UUID.to_string(),
            "4e989e9f-f81a-4ee8-b9a7-bb74d5cd3c96"
        );
    }

    #[test]
    fn test_service_name_type_byte() {
        assert_eq!(sdp::SERVICE_NAME_ATTRIBUTE_TYPE, 0x25);
    }

    #[test]
    fn test_default_channel_in_range() {
        assert!((1..=MAX_RFCOMM_CHANNEL).contains(&DEFAULT_RFCOMM_CHANNEL));
    }
}
