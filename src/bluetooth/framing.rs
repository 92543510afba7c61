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

//! Newline framing of the inbound byte stream.
//!
//! A message is every byte up to (not including) `\n`. There is no escaping
//! and no length prefix, so a message can never contain a newline.

use tracing::warn;

use super::constants::{MAX_MESSAGE_LEN, MESSAGE_TERMINATOR};

/// Accumulates bytes of the message currently being received.
///
/// A message longer than the limit is dropped up to its terminator, so a
/// peer that never sends `\n` cannot grow the buffer without bound.
#[derive(Debug)]
pub struct MessageBuffer {
    buffer: Vec<u8>,
    limit: usize,
    discarding: bool,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_MESSAGE_LEN)
    }
}

impl MessageBuffer {
    /// Create an empty buffer with the default message limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer holding at most `limit` bytes per message.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
            discarding: false,
        }
    }

    /// Append one byte.
    ///
    /// Returns the completed message when `byte` is the terminator; the buffer
    /// is empty afterwards.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        if byte == MESSAGE_TERMINATOR {
            if self.discarding {
                self.discarding = false;
                return None;
            }
            let message = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            return Some(message);
        }

        if self.discarding {
            return None;
        }
        if self.buffer.len() >= self.limit {
            warn!(
                "Message exceeds {} bytes, discarding until next terminator",
                self.limit
            );
            self.buffer = Vec::new();
            self.discarding = true;
            return None;
        }
        self.buffer.push(byte);
        None
    }

    /// Feed a run of bytes, collecting every completed message in order.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<String> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Whether a message is partially assembled.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Bytes received since the last terminator.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }
}
