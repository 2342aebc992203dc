use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use anyhow::Context;

/// An inclusive span of IPv4 addresses, usually built from a CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    /// Addresses that can belong to a host.
    ///
    /// Strips the network and broadcast address unless the range is too
    /// small to have them (a /31 or /32).
    pub fn hosts(&self) -> impl Iterator<Item = IpAddr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        let (first, last) = if end.saturating_sub(start) >= 2 {
            (start + 1, end - 1)
        } else {
            (start, end)
        };
        (first..=last).map(|ip| IpAddr::V4(Ipv4Addr::from(ip)))
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        end.saturating_sub(start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.start_addr > self.end_addr
    }
}

impl FromStr for Ipv4Range {
    type Err = anyhow::Error;

    /// Parses CIDR notation like "192.168.1.0/24".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip_str, prefix_str) = s
            .trim()
            .split_once('/')
            .with_context(|| format!("'{s}' is not in CIDR notation"))?;

        let ip = ip_str
            .parse::<Ipv4Addr>()
            .with_context(|| format!("Invalid IP in CIDR '{ip_str}'"))?;
        let prefix = prefix_str
            .parse::<u8>()
            .with_context(|| format!("Invalid prefix in CIDR '{prefix_str}'"))?;

        cidr_range(ip, prefix)
    }
}

pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> anyhow::Result<Ipv4Range> {
    let network = pnet::ipnetwork::Ipv4Network::new(ip, prefix)?;
    let start = network.network();
    let end = network.broadcast();

    Ok(Ipv4Range::new(start, end))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
