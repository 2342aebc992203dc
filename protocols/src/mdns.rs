use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

use anyhow::{Context, Result};
use dns_parser::{Builder, Packet, QueryClass, QueryType, RData};

pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
pub const PORT: u16 = 5353;

/// Service types smart-home hubs and relays advertise.
pub const SMART_HOME_SERVICES: &[&str] = &[
    "_hue._tcp.local",
    "_shelly._tcp.local",
    "_hap._tcp.local",
];

pub fn multicast_socket() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(MULTICAST_ADDR, PORT))
}

/// Builds one PTR query per service, asking for unicast replies so an
/// ephemeral socket receives them.
pub fn create_query(id: u16, services: &[&str]) -> Result<Vec<u8>> {
    let mut builder = Builder::new_query(id, false);
    for service in services {
        builder.add_question(service, true, QueryType::PTR, QueryClass::IN);
    }
    builder
        .build()
        .map_err(|_truncated| anyhow::anyhow!("mDNS query does not fit in one packet"))
}

#[derive(Debug, Default)]
pub struct MdnsRecord {
    /// Service instances announced (e.g. `shelly1-A4CF12._shelly._tcp.local`).
    pub instances: Vec<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub ips: HashSet<IpAddr>,
    /// Raw `key=value` TXT entries.
    pub txt: Vec<String>,
}

impl MdnsRecord {
    /// Returns the first announced instance that belongs to `service`.
    pub fn instance_of(&self, service: &str) -> Option<&str> {
        let service = service.trim_end_matches('.');
        self.instances
            .iter()
            .map(String::as_str)
            .find(|instance| instance.ends_with(service))
    }

    pub fn txt_value(&self, key: &str) -> Option<&str> {
        self.txt.iter().find_map(|entry| {
            let (k, v) = entry.split_once('=')?;
            k.eq_ignore_ascii_case(key).then_some(v)
        })
    }
}

pub fn extract_resource(data: &[u8]) -> Result<MdnsRecord> {
    let packet = Packet::parse(data).context("failed to parse mDNS packet")?;
    let mut metadata: MdnsRecord = MdnsRecord::default();

    for record in packet.answers.iter().chain(packet.additional.iter()) {
        match &record.data {
            RData::PTR(ptr) => {
                let name: String = ptr.0.to_string();
                if !name.ends_with(".arpa") {
                    metadata.instances.push(name);
                }
            }

            RData::SRV(srv) => {
                metadata.hostname = Some(srv.target.to_string());
                metadata.port = Some(srv.port);
            }

            RData::A(a) => {
                metadata.ips.insert(IpAddr::V4(a.0));
            }

            RData::AAAA(aaaa) => {
                metadata.ips.insert(IpAddr::V6(aaaa.0));
            }

            RData::TXT(txt) => {
                metadata.txt.extend(
                    txt.iter()
                        .map(|entry| String::from_utf8_lossy(entry).into_owned()),
                );
            }

            _ => {}
        }
    }

    Ok(metadata)
}
