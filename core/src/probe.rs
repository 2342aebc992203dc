//! # Discovery Probes
//!
//! A probe is one independent way of finding devices. The orchestrator runs
//! every enabled probe concurrently and merges what they report.

pub mod http;
pub mod kasa;
pub mod mdns;
pub mod port_scan;
pub mod ssdp;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use khaneh_common::config::Config;
use khaneh_common::device::DiscoveredDevice;
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout};
use tracing::trace;

use crate::error::ProbeError;

#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs one discovery pass, spending at most roughly `timeout`.
    async fn probe(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, ProbeError>;
}

/// The probe set used by a default discovery session.
pub fn default_probes(config: &Config) -> Vec<Arc<dyn Probe>> {
    let mut probes: Vec<Arc<dyn Probe>> = vec![
        Arc::new(kasa::KasaBroadcastProbe::new(config.kasa_port)),
        Arc::new(ssdp::SsdpProbe::new(config.ssdp_mx)),
        Arc::new(port_scan::PortScanProbe::from_config(config)),
    ];
    if !config.known_hosts.is_empty() {
        probes.push(Arc::new(http::HttpProbe::from_config(config)));
    }
    if config.enable_mdns {
        probes.push(Arc::new(mdns::MdnsProbe::new()));
    }
    probes
}

/// Feeds every datagram received within `window` to `on_datagram`.
pub(crate) async fn collect_datagrams<F>(socket: &UdpSocket, window: Duration, mut on_datagram: F)
where
    F: FnMut(&[u8], SocketAddr),
{
    let deadline: Instant = Instant::now() + window;
    let mut buf = [0u8; 4096];

    loop {
        let remaining: Duration = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match timeout(remaining, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, source))) => on_datagram(&buf[..len], source),
            Ok(Err(e)) => {
                trace!("receive loop stopped: {e}");
                break;
            }
            Err(_elapsed) => break,
        }
    }
}
