//! # Device Control
//!
//! Protocol adapters that switch and dim devices found by discovery. The
//! command executor only sees the [`ControllableDevice`] trait, so tests
//! can swap the network for a fake through [`ControlAdapters`].

mod kasa;
mod shelly;

use std::time::Duration;

use async_trait::async_trait;
use khaneh_common::device::{DiscoveredDevice, Protocol};
use reqwest::Client;
use serde::Serialize;
use tracing::{trace, warn};

use crate::error::ProbeError;

pub use kasa::{KasaDevice, KasaFlavor};
pub use shelly::ShellyDevice;

/// What a device reported about itself. Fields the protocol does not
/// expose stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub on: Option<bool>,
    pub brightness: Option<u8>,
}

#[async_trait]
pub trait ControllableDevice: Send + Sync {
    async fn turn_on(&self) -> Result<(), ProbeError>;

    async fn turn_off(&self) -> Result<(), ProbeError>;

    /// `level` is a percentage in `1..=100`.
    async fn set_brightness(&self, level: u8) -> Result<(), ProbeError>;

    async fn status(&self) -> Result<DeviceStatus, ProbeError>;
}

/// Picks the adapter that speaks a device's protocol.
pub trait ControlAdapters: Send + Sync {
    /// `None` when the device's protocol cannot be controlled.
    fn adapter_for(&self, device: &DiscoveredDevice) -> Option<Box<dyn ControllableDevice>>;
}

/// Adapters that talk to real devices over the LAN.
pub struct NetworkAdapters {
    request_timeout: Duration,
    client: Client,
}

impl NetworkAdapters {
    pub fn new(request_timeout: Duration) -> Self {
        let client: Client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("falling back to default HTTP client: {e}");
                Client::new()
            });
        Self {
            request_timeout,
            client,
        }
    }
}

impl ControlAdapters for NetworkAdapters {
    fn adapter_for(&self, device: &DiscoveredDevice) -> Option<Box<dyn ControllableDevice>> {
        trace!(device = %device.key(), protocol = %device.protocol, "selecting adapter");
        match device.protocol {
            Protocol::Kasa => Some(Box::new(KasaDevice::for_device(device, self.request_timeout))),
            Protocol::Shelly => Some(Box::new(ShellyDevice::for_device(
                device,
                self.client.clone(),
                self.request_timeout,
            ))),
            // Hue needs a paired API key; UPnP, mDNS and bare HTTP have no
            // common control surface.
            Protocol::Hue | Protocol::Upnp | Protocol::Mdns | Protocol::Http => None,
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
