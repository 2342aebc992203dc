//! UPnP discovery with a single `M-SEARCH` for root devices.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use khaneh_common::device::{DiscoveredDevice, DiscoveryMethod, Protocol};
use khaneh_common::network::mac::parse_mac;
use khaneh_protocols::ssdp::{self, SsdpResponse};
use pnet::util::MacAddr;
use tokio::net::UdpSocket;
use tracing::trace;
use url::Url;

use super::{Probe, collect_datagrams};
use crate::classifier::{self, Observation};
use crate::error::ProbeError;

pub struct SsdpProbe {
    mx: u8,
    target: SocketAddr,
}

impl SsdpProbe {
    pub fn new(mx: u8) -> Self {
        Self::with_target(mx, ssdp::multicast_socket())
    }

    pub fn with_target(mx: u8, target: SocketAddr) -> Self {
        Self {
            mx: mx.clamp(1, 5),
            target,
        }
    }

    /// Devices spread their replies over `MX` seconds; one extra second
    /// covers the network round trip.
    fn window(&self, timeout: Duration) -> Duration {
        timeout.min(Duration::from_secs(u64::from(self.mx) + 1))
    }
}

#[async_trait]
impl Probe for SsdpProbe {
    fn name(&self) -> &'static str {
        "ssdp"
    }

    async fn probe(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, ProbeError> {
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| ProbeError::connection(local, e))?;

        let request: String = ssdp::search_request(ssdp::ROOT_DEVICE, self.mx);
        socket
            .send_to(request.as_bytes(), self.target)
            .await
            .map_err(|e| ProbeError::connection(self.target, e))?;

        let mut found: BTreeMap<IpAddr, DiscoveredDevice> = BTreeMap::new();
        collect_datagrams(&socket, self.window(timeout), |datagram, source| {
            let text = String::from_utf8_lossy(datagram);
            let Some(response) = ssdp::parse_response(&text) else {
                trace!(%source, "ignoring non-response SSDP datagram");
                return;
            };
            found
                .entry(source.ip())
                .or_insert_with(|| device_from_response(source.ip(), &response));
        })
        .await;

        Ok(found.into_values().collect())
    }
}

pub fn device_from_response(ip: IpAddr, response: &SsdpResponse) -> DiscoveredDevice {
    let mut observation = Observation::new(ip, Protocol::Upnp, DiscoveryMethod::Ssdp);
    observation.evidence.ssdp_server = response.server.clone();
    observation.port = response.location.as_deref().and_then(location_port);
    observation.mac = response.hue_bridge_id.as_deref().and_then(bridge_id_mac);

    let is_hue: bool = response.hue_bridge_id.is_some()
        || classifier::manufacturer_for(&observation.evidence) == Some("Philips");
    if is_hue {
        observation.protocol = Protocol::Hue;
    }

    observation.into_device()
}

fn location_port(location: &str) -> Option<u16> {
    Url::parse(location).ok()?.port_or_known_default()
}

/// Hue bridge ids are the MAC with `FFFE` spliced into the middle.
pub(crate) fn bridge_id_mac(bridge_id: &str) -> Option<MacAddr> {
    let id: &str = bridge_id.trim();
    if id.len() != 16 || !id.is_ascii() {
        return None;
    }
    parse_mac(&format!("{}{}", &id[..6], &id[10..]))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
