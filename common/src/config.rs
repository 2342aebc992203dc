use std::net::IpAddr;
use std::time::Duration;

use crate::network::range::Ipv4Range;

pub const DEFAULT_SCAN_CONCURRENCY: usize = 20;
pub const DEFAULT_KASA_PORT: u16 = 9999;

#[derive(Debug, Clone)]
pub struct Config {
    /// CIDR scanned by the port scanner. `None` means "detect the LAN".
    pub network_range: Option<Ipv4Range>,
    /// Wall-clock budget for one whole discovery session.
    pub discovery_timeout: Duration,
    /// Maximum simultaneous TCP connect attempts of the port scanner.
    pub scan_concurrency: usize,
    pub connect_timeout: Duration,
    pub http_timeout: Duration,
    /// `MX` header of the SSDP search. Devices spread replies over this window.
    pub ssdp_mx: u8,
    pub kasa_port: u16,
    pub http_ports: Vec<u16>,
    /// Hosts handed straight to the HTTP-signature probe.
    pub known_hosts: Vec<IpAddr>,
    pub enable_mdns: bool,
    /// Percent applied by a single dim/brighten command.
    pub brightness_step: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_range: None,
            discovery_timeout: Duration::from_secs(10),
            scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
            connect_timeout: Duration::from_millis(400),
            http_timeout: Duration::from_secs(2),
            ssdp_mx: 3,
            kasa_port: DEFAULT_KASA_PORT,
            http_ports: vec![80, 443, 8080, 8443],
            known_hosts: Vec::new(),
            enable_mdns: true,
            brightness_step: 25,
        }
    }
}
