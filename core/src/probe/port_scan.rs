//! Bounded TCP scan of the local subnet.
//!
//! Every host in the range is checked on the Kasa port and the HTTP ports.
//! Open ports are handed to the matching identifier; a host whose open
//! ports identify as nothing produces no device.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use khaneh_common::config::Config;
use khaneh_common::device::{DiscoveredDevice, DiscoveryMethod};
use khaneh_common::network::interface::get_lan_range;
use khaneh_common::network::range::Ipv4Range;
use rand::seq::SliceRandom;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

use super::Probe;
use super::http::HttpIdentifier;
use super::kasa::device_from_sysinfo;
use crate::error::ProbeError;
use crate::network::{kasa, tcp::ConnectGate};

pub struct PortScanProbe {
    range: Option<Ipv4Range>,
    kasa_port: u16,
    http_ports: Vec<u16>,
    connect_timeout: Duration,
    query_timeout: Duration,
    gate: Arc<ConnectGate>,
    http: HttpIdentifier,
}

impl PortScanProbe {
    pub fn from_config(config: &Config) -> Self {
        Self {
            range: config.network_range,
            kasa_port: config.kasa_port,
            http_ports: config.http_ports.clone(),
            connect_timeout: config.connect_timeout,
            query_timeout: config.http_timeout,
            gate: Arc::new(ConnectGate::new(config.scan_concurrency)),
            http: HttpIdentifier::new(config.http_timeout),
        }
    }

    /// Highest number of simultaneous connections to scanned hosts seen so
    /// far, identification included.
    pub fn peak_in_flight(&self) -> usize {
        self.gate.peak()
    }

    pub fn concurrency_limit(&self) -> usize {
        self.gate.limit()
    }

    /// The Kasa port first, then each distinct HTTP port.
    fn candidate_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = vec![self.kasa_port];
        for port in &self.http_ports {
            if !ports.contains(port) {
                ports.push(*port);
            }
        }
        ports
    }

    async fn scan_host(&self, ip: IpAddr, ports: &[u16]) -> Option<DiscoveredDevice> {
        let checks = ports.iter().map(|&port| async move {
            self.gate
                .is_open(SocketAddr::new(ip, port), self.connect_timeout)
                .await
                .then_some(port)
        });
        let open: Vec<u16> = join_all(checks).await.into_iter().flatten().collect();
        if !open.is_empty() {
            trace!(%ip, ?open, "open ports");
        }

        for port in open {
            let identified = if port == self.kasa_port {
                self.identify_kasa(ip, port).await
            } else {
                self.identify_http(ip, port).await
            };
            if identified.is_some() {
                return identified;
            }
        }
        None
    }

    async fn identify_kasa(&self, ip: IpAddr, port: u16) -> Option<DiscoveredDevice> {
        let _slot = self.gate.slot().await?;
        match kasa::get_sysinfo(SocketAddr::new(ip, port), self.query_timeout).await {
            Ok(info) => Some(device_from_sysinfo(ip, Some(port), &info, DiscoveryMethod::KasaQuery)),
            Err(e) => {
                debug!(%ip, port, "kasa query failed: {e}");
                None
            }
        }
    }

    async fn identify_http(&self, ip: IpAddr, port: u16) -> Option<DiscoveredDevice> {
        // Requests to one port run one after another under a single slot.
        let _slot = self.gate.slot().await?;
        match self.http.identify(ip, port).await {
            Ok(found) => found,
            Err(e) => {
                debug!(%ip, port, "http identification failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl Probe for PortScanProbe {
    fn name(&self) -> &'static str {
        "port-scan"
    }

    async fn probe(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, ProbeError> {
        let deadline: Instant = Instant::now() + timeout;
        let range: Ipv4Range = match self.range {
            Some(range) => range,
            None => get_lan_range()
                .map_err(|e| ProbeError::connection("local network", std::io::Error::other(e)))?,
        };

        let mut hosts: Vec<IpAddr> = range.hosts().collect();
        hosts.shuffle(&mut rand::rng());
        let ports: Vec<u16> = self.candidate_ports();
        debug!(
            hosts = hosts.len(),
            ?ports,
            limit = self.gate.limit(),
            "starting port scan"
        );

        let mut pending: FuturesUnordered<_> = hosts
            .into_iter()
            .map(|ip| self.scan_host(ip, &ports))
            .collect();

        let mut devices: Vec<DiscoveredDevice> = Vec::new();
        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some(Some(device))) => devices.push(device),
                Ok(Some(None)) => {}
                Ok(None) => break,
                Err(_elapsed) => {
                    debug!(unfinished = pending.len(), "port scan ran out of time");
                    break;
                }
            }
        }

        Ok(devices)
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
