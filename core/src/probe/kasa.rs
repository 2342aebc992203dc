//! Kasa discovery over the ciphered UDP broadcast.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use khaneh_common::device::{Capability, DiscoveredDevice, DiscoveryMethod, Protocol};
use khaneh_common::network::mac::parse_mac;
use khaneh_protocols::kasa::{self, SysInfo};
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use super::{Probe, collect_datagrams};
use crate::classifier::Observation;
use crate::error::ProbeError;

/// Devices answer the broadcast within a second or two.
const RECEIVE_WINDOW: Duration = Duration::from_secs(2);

pub struct KasaBroadcastProbe {
    target: SocketAddr,
}

impl KasaBroadcastProbe {
    pub fn new(port: u16) -> Self {
        Self::with_target(SocketAddr::from((Ipv4Addr::BROADCAST, port)))
    }

    /// Sends the query to a single address instead of the broadcast address.
    pub fn with_target(target: SocketAddr) -> Self {
        Self { target }
    }
}

#[async_trait]
impl Probe for KasaBroadcastProbe {
    fn name(&self) -> &'static str {
        "kasa-broadcast"
    }

    async fn probe(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, ProbeError> {
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| ProbeError::connection(local, e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| ProbeError::connection(self.target, e))?;

        // Datagrams carry the ciphertext without the length header.
        let query: Vec<u8> = kasa::encrypt(kasa::SYSINFO_QUERY.as_bytes());
        socket
            .send_to(&query, self.target)
            .await
            .map_err(|e| ProbeError::connection(self.target, e))?;

        let mut found: BTreeMap<IpAddr, DiscoveredDevice> = BTreeMap::new();
        collect_datagrams(&socket, timeout.min(RECEIVE_WINDOW), |datagram, source| {
            let plaintext: Vec<u8> = kasa::decrypt(datagram);
            match kasa::parse_sysinfo(&plaintext) {
                Ok(info) => {
                    trace!(%source, model = %info.model, "kasa reply");
                    found.entry(source.ip()).or_insert_with(|| {
                        device_from_sysinfo(
                            source.ip(),
                            Some(source.port()),
                            &info,
                            DiscoveryMethod::KasaBroadcast,
                        )
                    });
                }
                Err(e) => debug!(%source, "ignoring kasa reply: {e:#}"),
            }
        })
        .await;

        Ok(found.into_values().collect())
    }
}

/// Turns a `get_sysinfo` reply into a classified device.
pub fn device_from_sysinfo(
    ip: IpAddr,
    port: Option<u16>,
    info: &SysInfo,
    method: DiscoveryMethod,
) -> DiscoveredDevice {
    let mut observation = Observation::new(ip, Protocol::Kasa, method);
    observation.port = port;
    observation.mac = info.mac_str().and_then(parse_mac);
    observation.name = Some(info.alias.clone());

    let evidence = &mut observation.evidence;
    evidence.model = Some(info.model.trim().to_string()).filter(|model| !model.is_empty());
    evidence.child_count = info.children.len();
    if info.is_dimmable == Some(1) || info.brightness.is_some() {
        evidence.hints.insert(Capability::Brightness);
    }
    if info.is_color == Some(1) {
        evidence.hints.insert(Capability::Color);
    }
    if info.is_variable_color_temp == Some(1) {
        evidence.hints.insert(Capability::ColorTemperature);
    }
    if info.has_energy_meter() {
        evidence.hints.insert(Capability::EnergyMonitoring);
    }

    observation.into_device()
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
    use khaneh_common::device::DeviceType;

    const HS100: &str = r#"{"system":{"get_sysinfo":{"alias":"Living Room Plug","model":"HS100(US)","mac":"50:C7:BF:01:02:03","relay_state":1,"feature":"TIM","err_code":0}}}"#;
    const KL130: &str = r#"{"system":{"get_sysinfo":{"alias":"چراغ نشیمن","model":"KL130(EU)","mic_mac":"1C3BF3AABBCC","mic_type":"IOT.SMARTBULB","is_dimmable":1,"is_color":1,"is_variable_color_temp":1,"light_state":{"on_off":0},"err_code":0}}}"#;
    const HS300: &str = r#"{"system":{"get_sysinfo":{"alias":"Strip","model":"HS300(US)","mac":"B0:BE:76:00:00:01","feature":"TIM:ENE","children":[{"id":"0"},{"id":"1"},{"id":"2"}],"err_code":0}}}"#;

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))
    }

    fn sysinfo(json: &str) -> SysInfo {
        kasa::parse_sysinfo(json.as_bytes()).unwrap()
    }

    #[test]
    fn hs100_is_a_tp_link_outlet() {
        let device = device_from_sysinfo(ip(), None, &sysinfo(HS100), DiscoveryMethod::KasaQuery);

        assert_eq!(device.device_type, DeviceType::Outlet);
        assert_eq!(device.manufacturer.as_deref(), Some("TP-Link"));
        assert!(device.supports(Capability::OnOff));
        assert_eq!(device.key(), "50:c7:bf:01:02:03");
        assert!((device.confidence - 0.85).abs() < 1e-9);
        assert_eq!(device.display_name, "پریز Living Room Plug");
    }

    #[test]
    fn color_bulb_advertises_light_capabilities() {
        let device =
            device_from_sysinfo(ip(), None, &sysinfo(KL130), DiscoveryMethod::KasaBroadcast);

        assert_eq!(device.device_type, DeviceType::Light);
        assert!(device.supports(Capability::Brightness));
        assert!(device.supports(Capability::Color));
        assert!(device.supports(Capability::ColorTemperature));
        assert_eq!(device.display_name, "چراغ نشیمن");
        assert!((device.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn multi_socket_outlet_is_a_metered_power_strip() {
        let device = device_from_sysinfo(ip(), None, &sysinfo(HS300), DiscoveryMethod::KasaQuery);

        assert_eq!(device.device_type, DeviceType::PowerStrip);
        assert!(device.supports(Capability::EnergyMonitoring));
    }

    #[tokio::test]
    async fn broadcast_probe_collects_replies() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = responder.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (len, from) = responder.recv_from(&mut buf).await.unwrap();
            assert_eq!(kasa::decrypt(&buf[..len]), kasa::SYSINFO_QUERY.as_bytes());
            let reply = kasa::encrypt(HS100.as_bytes());
            // Same device answering twice must still yield one entry.
            responder.send_to(&reply, from).await.unwrap();
            responder.send_to(&reply, from).await.unwrap();
        });

        let probe = KasaBroadcastProbe::with_target(target);
        let devices = probe.probe(Duration::from_millis(500)).await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(devices[0].port, Some(target.port()));
        assert_eq!(devices[0].discovery_method, DiscoveryMethod::KasaBroadcast);
    }
}
