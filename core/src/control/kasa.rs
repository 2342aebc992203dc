use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use khaneh_common::config::DEFAULT_KASA_PORT;
use khaneh_common::device::{Capability, DeviceType, DiscoveredDevice};
use khaneh_protocols::kasa as wire;

use super::{ControllableDevice, DeviceStatus};
use crate::error::ProbeError;
use crate::network::kasa;

/// Kasa families use different command namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KasaFlavor {
    /// Relay only (`system.set_relay_state`).
    Plug,
    /// Relay plus `smartlife.iot.dimmer`.
    Dimmer,
    /// `smartlife.iot.smartbulb.lightingservice`.
    Bulb,
}

impl KasaFlavor {
    pub fn of(device: &DiscoveredDevice) -> Self {
        if device.device_type == DeviceType::Light {
            KasaFlavor::Bulb
        } else if device.supports(Capability::Brightness) {
            KasaFlavor::Dimmer
        } else {
            KasaFlavor::Plug
        }
    }
}

pub struct KasaDevice {
    addr: SocketAddr,
    flavor: KasaFlavor,
    timeout: Duration,
}

impl KasaDevice {
    pub fn new(addr: SocketAddr, flavor: KasaFlavor, timeout: Duration) -> Self {
        Self {
            addr,
            flavor,
            timeout,
        }
    }

    pub fn for_device(device: &DiscoveredDevice, timeout: Duration) -> Self {
        let port: u16 = device.port.unwrap_or(DEFAULT_KASA_PORT);
        Self::new(SocketAddr::new(device.ip, port), KasaFlavor::of(device), timeout)
    }

    async fn set_power(&self, on: bool) -> Result<(), ProbeError> {
        let payload: String = match self.flavor {
            KasaFlavor::Bulb => wire::bulb_power_command(on),
            KasaFlavor::Plug | KasaFlavor::Dimmer => wire::relay_command(on),
        };
        kasa::command(self.addr, &payload, self.timeout).await
    }
}

#[async_trait]
impl ControllableDevice for KasaDevice {
    async fn turn_on(&self) -> Result<(), ProbeError> {
        self.set_power(true).await
    }

    async fn turn_off(&self) -> Result<(), ProbeError> {
        self.set_power(false).await
    }

    async fn set_brightness(&self, level: u8) -> Result<(), ProbeError> {
        let level: u8 = level.clamp(1, 100);
        let payload: String = match self.flavor {
            KasaFlavor::Bulb => wire::bulb_brightness_command(level),
            KasaFlavor::Dimmer => wire::dimmer_brightness_command(level),
            KasaFlavor::Plug => {
                return Err(ProbeError::decode("kasa", "plug has no brightness control"));
            }
        };
        kasa::command(self.addr, &payload, self.timeout).await
    }

    async fn status(&self) -> Result<DeviceStatus, ProbeError> {
        let info = kasa::get_sysinfo(self.addr, self.timeout).await?;
        Ok(DeviceStatus {
            on: info.is_on(),
            brightness: info.current_brightness(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Answers one framed request per connection with `reply`, forwarding
    /// each decrypted request to the returned channel.
    async fn fake_device(reply: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut header = [0u8; wire::HEADER_LEN];
                    if stream.read_exact(&mut header).await.is_err() {
                        return;
                    }
                    let mut body = vec![0u8; wire::frame_len(header).unwrap()];
                    stream.read_exact(&mut body).await.unwrap();
                    let request = String::from_utf8(wire::decrypt(&body)).unwrap();
                    let _ = tx.send(request);
                    stream.write_all(&wire::frame(reply.as_bytes())).await.unwrap();
                });
            }
        });

        (addr, rx)
    }

    #[tokio::test]
    async fn plug_uses_relay_state() {
        let (addr, mut requests) =
            fake_device(r#"{"system":{"set_relay_state":{"err_code":0}}}"#).await;
        let plug = KasaDevice::new(addr, KasaFlavor::Plug, Duration::from_secs(1));

        plug.turn_on().await.unwrap();
        assert_eq!(requests.recv().await.unwrap(), wire::relay_command(true));
        assert!(plug.set_brightness(50).await.is_err());
    }

    #[tokio::test]
    async fn bulb_brightness_uses_lighting_service() {
        let (addr, mut requests) = fake_device(
            r#"{"smartlife.iot.smartbulb.lightingservice":{"transition_light_state":{"on_off":1,"brightness":60,"err_code":0}}}"#,
        )
        .await;
        let bulb = KasaDevice::new(addr, KasaFlavor::Bulb, Duration::from_secs(1));

        bulb.set_brightness(60).await.unwrap();
        assert_eq!(requests.recv().await.unwrap(), wire::bulb_brightness_command(60));
    }

    #[tokio::test]
    async fn rejected_command_is_an_error() {
        let (addr, _requests) =
            fake_device(r#"{"system":{"set_relay_state":{"err_code":-1,"err_msg":"module not support"}}}"#)
                .await;
        let plug = KasaDevice::new(addr, KasaFlavor::Plug, Duration::from_secs(1));

        assert!(matches!(plug.turn_off().await, Err(ProbeError::Decode { .. })));
    }

    #[tokio::test]
    async fn status_reads_dimmer_brightness() {
        let (addr, _requests) = fake_device(
            r#"{"system":{"get_sysinfo":{"alias":"Hall","model":"HS220(US)","relay_state":1,"brightness":35,"err_code":0}}}"#,
        )
        .await;
        let dimmer = KasaDevice::new(addr, KasaFlavor::Dimmer, Duration::from_secs(1));

        let status = dimmer.status().await.unwrap();
        assert_eq!(status.on, Some(true));
        assert_eq!(status.brightness, Some(35));
    }
}
