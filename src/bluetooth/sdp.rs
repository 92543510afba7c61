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

//! SDP attribute encoding for the chat service record.
//!
//! Only the one attribute the chat service publishes is supported: the
//! Service Name, a text data element with a one-byte length.
//!
//! ```text
//! +------+-----+------------------+
//! | 0x25 | len | UTF-8 name bytes |
//! +------+-----+------------------+
//! ```

use std::fmt::Write as _;
use uuid::Uuid;

use super::constants::sdp::*;
use crate::error::SdpError;

/// One raw SDP attribute: id plus an encoded data element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpAttribute {
    pub id: u16,
    pub value: Vec<u8>,
}

impl SdpAttribute {
    /// Service Name attribute for `name`.
    pub fn service_name(name: &str) -> Result<Self, SdpError> {
        Ok(Self {
            id: SERVICE_NAME_ATTRIBUTE_ID,
            value: build_service_name(name)?,
        })
    }

    /// Payload bytes if this is a one-byte-length text element.
    pub fn text_value(&self) -> Option<&[u8]> {
        match self.value.as_slice() {
            [SERVICE_NAME_ATTRIBUTE_TYPE, len, rest @ ..] if rest.len() == *len as usize => {
                Some(rest)
            }
            _ => None,
        }
    }
}

/// Encode the Service Name data element.
pub fn build_service_name(name: &str) -> Result<Vec<u8>, SdpError> {
    let bytes = name.as_bytes();
    let len = u8::try_from(bytes.len()).map_err(|_| SdpError::NameTooLong(bytes.len()))?;

    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(SERVICE_NAME_ATTRIBUTE_TYPE);
    out.push(len);
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Render a BlueZ service record for an RFCOMM service.
///
/// Text attributes are emitted hex encoded so the name bytes reach the
/// record unchanged; attributes of any other type are skipped.
pub fn service_record_xml(service_id: Uuid, channel: u8, attributes: &[SdpAttribute]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<record>\n");

    let _ = write!(
        xml,
        "  <attribute id=\"0x{SERVICE_CLASS_ID_LIST:04x}\">\n    <sequence>\n      <uuid value=\"{service_id}\" />\n    </sequence>\n  </attribute>\n"
    );
    let _ = write!(
        xml,
        "  <attribute id=\"0x{PROTOCOL_DESCRIPTOR_LIST:04x}\">\n    <sequence>\n      <sequence>\n        <uuid value=\"0x{L2CAP_UUID16:04x}\" />\n      </sequence>\n      <sequence>\n        <uuid value=\"0x{RFCOMM_UUID16:04x}\" />\n        <uint8 value=\"0x{channel:02x}\" />\n      </sequence>\n    </sequence>\n  </attribute>\n"
    );
    let _ = write!(
        xml,
        "  <attribute id=\"0x{BROWSE_GROUP_LIST:04x}\">\n    <sequence>\n      <uuid value=\"0x{PUBLIC_BROWSE_ROOT_UUID16:04x}\" />\n    </sequence>\n  </attribute>\n"
    );

    for attribute in attributes {
        match attribute.text_value() {
            Some(text) => {
                let _ = write!(
                    xml,
                    "  <attribute id=\"0x{:04x}\">\n    <text encoding=\"hex\" value=\"{}\" />\n  </attribute>\n",
                    attribute.id,
                    hex::encode(text)
                );
            }
            None => {
                tracing::warn!("Skipping non-text SDP attribute 0x{:04x}", attribute.id);
            }
        }
    }

    xml.push_str("</record>\n");
    xml
}
