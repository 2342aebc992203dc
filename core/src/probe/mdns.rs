//! mDNS browsing for smart-home service types.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use khaneh_common::device::{DiscoveredDevice, DiscoveryMethod, Protocol};
use khaneh_common::network::mac::parse_mac;
use khaneh_protocols::mdns::{self, MdnsRecord};
use pnet::util::MacAddr;
use tokio::net::UdpSocket;
use tracing::trace;

use super::ssdp::bridge_id_mac;
use super::{Probe, collect_datagrams};
use crate::classifier::Observation;
use crate::error::ProbeError;

/// Responders answer within a second; the rest of the budget belongs to
/// the slower probes.
const RECEIVE_WINDOW: Duration = Duration::from_secs(3);

pub struct MdnsProbe {
    target: SocketAddr,
}

impl MdnsProbe {
    pub fn new() -> Self {
        Self {
            target: mdns::multicast_socket(),
        }
    }
}

impl Default for MdnsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for MdnsProbe {
    fn name(&self) -> &'static str {
        "mdns"
    }

    async fn probe(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, ProbeError> {
        let query: Vec<u8> = mdns::create_query(rand::random::<u16>(), mdns::SMART_HOME_SERVICES)
            .map_err(|e| ProbeError::decode("mdns", e))?;

        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| ProbeError::connection(local, e))?;
        socket
            .send_to(&query, self.target)
            .await
            .map_err(|e| ProbeError::connection(self.target, e))?;

        let mut found: BTreeMap<IpAddr, DiscoveredDevice> = BTreeMap::new();
        collect_datagrams(&socket, timeout.min(RECEIVE_WINDOW), |datagram, source| {
            match mdns::extract_resource(datagram) {
                Ok(record) => {
                    if let Some(device) = device_from_record(source.ip(), &record) {
                        found.entry(source.ip()).or_insert(device);
                    }
                }
                Err(e) => trace!(%source, "ignoring mDNS packet: {e:#}"),
            }
        })
        .await;

        Ok(found.into_values().collect())
    }
}

/// Builds a device from the first smart-home service the record announces.
pub fn device_from_record(ip: IpAddr, record: &MdnsRecord) -> Option<DiscoveredDevice> {
    let (service, instance) = mdns::SMART_HOME_SERVICES
        .iter()
        .find_map(|service| record.instance_of(service).map(|instance| (*service, instance)))?;

    let protocol: Protocol = if service.starts_with("_hue.") {
        Protocol::Hue
    } else if service.starts_with("_shelly.") {
        Protocol::Shelly
    } else {
        Protocol::Mdns
    };

    let label: &str = instance.split('.').next().unwrap_or(instance);

    let mut observation = Observation::new(ip, protocol, DiscoveryMethod::Mdns);
    observation.port = record.port;
    observation.name = Some(record.txt_value("name").unwrap_or(label).to_string());
    observation.mac = record
        .txt_value("bridgeid")
        .and_then(bridge_id_mac)
        .or_else(|| trailing_mac(label));
    observation.evidence.mdns_service = Some(service.to_string());
    observation.evidence.model = record.txt_value("md").map(str::to_string);

    Some(observation.into_device())
}

/// Shelly instances end with the MAC, e.g. `shelly1-A4CF12F45A3B`.
fn trailing_mac(label: &str) -> Option<MacAddr> {
    let (_, suffix) = label.rsplit_once('-')?;
    (suffix.len() == 12).then(|| parse_mac(suffix)).flatten()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
