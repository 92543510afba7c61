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

//! Configuration module.
//!
//! Handles loading and saving application settings.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::bluetooth::constants::{
    CHAT_SERVICE_UUID, DEFAULT_RFCOMM_CHANNEL, DEFAULT_SERVICE_NAME, MAX_RFCOMM_CHANNEL,
};
use crate::bluetooth::sdp::build_service_name;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,

    /// Chat display settings.
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// UUID the chat service is advertised and looked up under.
    pub service_uuid: Uuid,

    /// Service Name SDP attribute. At most 255 bytes of UTF-8.
    pub service_name: String,

    /// RFCOMM channel the listener binds to.
    pub rfcomm_channel: u8,

    /// Name set on the local adapter, if any.
    pub adapter_alias: Option<String>,

    /// Power the adapter on at startup instead of reporting it unavailable.
    pub power_on: bool,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            service_uuid: CHAT_SERVICE_UUID,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            rfcomm_channel: DEFAULT_RFCOMM_CHANNEL,
            adapter_alias: None,
            power_on: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Prefix printed events with the local time.
    pub display_timestamps: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            display_timestamps: true,
        }
    }
}

impl Config {
    /// Default configuration file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rfcomm-chat")
            .join("config.toml")
    }

    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the transport cannot use.
    pub fn validate(&self) -> Result<()> {
        build_service_name(&self.bluetooth.service_name)?;

        let channel = self.bluetooth.rfcomm_channel;
        if !(1..=MAX_RFCOMM_CHANNEL).contains(&channel) {
            bail!(
                "rfcomm_channel must be between 1 and {}, got {}",
                MAX_RFCOMM_CHANNEL,
                channel
            );
        }
        Ok(())
    }
}
