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

//! Service advertisement lifecycle.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::sdp::SdpAttribute;
use super::transport::RfcommTransport;
use crate::error::{SdpError, TransportError};

/// A live advertisement. Exists only while the service is discoverable.
pub struct AdvertisementHandle<A> {
    service_id: Uuid,
    inner: A,
}

impl<A> std::fmt::Debug for AdvertisementHandle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvertisementHandle")
            .field("service_id", &self.service_id)
            .finish()
    }
}

/// Starts and stops discoverability of the chat service.
pub struct ServiceAdvertiser<T: RfcommTransport> {
    transport: Arc<T>,
    attributes: Vec<SdpAttribute>,
}

impl<T: RfcommTransport> ServiceAdvertiser<T> {
    /// Create an advertiser publishing `service_name` as the Service Name attribute.
    pub fn new(transport: Arc<T>, service_name: &str) -> Result<Self, SdpError> {
        Ok(Self {
            transport,
            attributes: vec![SdpAttribute::service_name(service_name)?],
        })
    }

    /// Start advertising `service_id`.
    pub async fn start(
        &self,
        service_id: Uuid,
    ) -> Result<AdvertisementHandle<T::Advertisement>, TransportError> {
        match self.transport.advertise(service_id, &self.attributes).await {
            Ok(inner) => {
                info!("Advertising service {}", service_id);
                Ok(AdvertisementHandle { service_id, inner })
            }
            Err(e) => {
                warn!("Failed to advertise service {}: {}", service_id, e);
                Err(e)
            }
        }
    }

    /// Stop advertising. Does nothing when `handle` is already `None`.
    pub async fn stop(&self, handle: &mut Option<AdvertisementHandle<T::Advertisement>>) {
        if let Some(handle) = handle.take() {
            self.transport.stop_advertising(handle.inner).await;
            info!("Stopped advertising service {}", handle.service_id);
        }
    }
}
