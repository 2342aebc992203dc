use std::time::Duration;

use async_trait::async_trait;
use khaneh_common::device::{DeviceType, DiscoveredDevice};
use khaneh_protocols::shelly::{self, Channel};
use reqwest::Client;

use super::{ControllableDevice, DeviceStatus};
use crate::error::ProbeError;

pub struct ShellyDevice {
    base: String,
    channel: Channel,
    client: Client,
    timeout: Duration,
}

impl ShellyDevice {
    pub fn new(base: String, channel: Channel, client: Client, timeout: Duration) -> Self {
        Self {
            base,
            channel,
            client,
            timeout,
        }
    }

    pub fn for_device(device: &DiscoveredDevice, client: Client, timeout: Duration) -> Self {
        let port: u16 = device.port.unwrap_or(80);
        let channel: Channel = if device.device_type == DeviceType::Light {
            Channel::Light
        } else {
            Channel::Relay
        };
        Self::new(format!("http://{}:{port}", device.ip), channel, client, timeout)
    }

    async fn get(&self, path: &str) -> Result<String, ProbeError> {
        let url: String = format!("{}{path}", self.base);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProbeError::from_http(&url, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::decode("shelly", format!("{url} answered {status}")));
        }
        response
            .text()
            .await
            .map_err(|e| ProbeError::from_http(&url, self.timeout, e))
    }
}

#[async_trait]
impl ControllableDevice for ShellyDevice {
    async fn turn_on(&self) -> Result<(), ProbeError> {
        self.get(&shelly::power_path(self.channel, true)).await.map(drop)
    }

    async fn turn_off(&self) -> Result<(), ProbeError> {
        self.get(&shelly::power_path(self.channel, false)).await.map(drop)
    }

    async fn set_brightness(&self, level: u8) -> Result<(), ProbeError> {
        if self.channel != Channel::Light {
            return Err(ProbeError::decode("shelly", "relay has no brightness control"));
        }
        self.get(&shelly::brightness_path(level)).await.map(drop)
    }

    async fn status(&self) -> Result<DeviceStatus, ProbeError> {
        let body: String = self.get(shelly::STATUS_PATH).await?;
        let status = shelly::parse_status(&body).map_err(|e| ProbeError::decode("shelly", format!("{e:#}")))?;
        let primary = status.primary().cloned().unwrap_or_default();
        Ok(DeviceStatus {
            on: primary.ison,
            brightness: primary.brightness,
        })
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
