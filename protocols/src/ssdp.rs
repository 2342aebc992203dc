//! SSDP (UPnP discovery) text codec.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const PORT: u16 = 1900;
pub const ROOT_DEVICE: &str = "upnp:rootdevice";

pub fn multicast_socket() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(MULTICAST_ADDR, PORT))
}

/// Builds an `M-SEARCH` datagram. `mx` is clamped to the 1..=5 seconds UPnP allows.
pub fn search_request(search_target: &str, mx: u8) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {MULTICAST_ADDR}:{PORT}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {search_target}\r\n\r\n",
        mx.clamp(1, 5)
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsdpResponse {
    pub server: Option<String>,
    pub location: Option<String>,
    pub search_target: Option<String>,
    pub usn: Option<String>,
    /// Philips bridges add their bridge id as a vendor header.
    pub hue_bridge_id: Option<String>,
}

/// Parses a unicast `HTTP/1.1 200 OK` search reply.
///
/// Header names are matched case-insensitively; returns `None` for anything
/// that is not a successful SSDP response (including `NOTIFY` chatter).
pub fn parse_response(datagram: &str) -> Option<SsdpResponse> {
    let mut lines = datagram.lines();
    let status_line: &str = lines.next()?.trim();
    if !status_line.starts_with("HTTP/1.1 200") && !status_line.starts_with("HTTP/1.0 200") {
        return None;
    }

    let mut response = SsdpResponse::default();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value: String = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match name.trim().to_ascii_uppercase().as_str() {
            "SERVER" => response.server = Some(value),
            "LOCATION" => response.location = Some(value),
            "ST" => response.search_target = Some(value),
            "USN" => response.usn = Some(value),
            "HUE-BRIDGEID" => response.hue_bridge_id = Some(value),
            _ => {}
        }
    }

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_is_well_formed() {
        let request = search_request(ROOT_DEVICE, 3);
        assert!(request.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(request.contains("HOST: 239.255.255.250:1900\r\n"));
        assert!(request.contains("MAN: \"ssdp:discover\"\r\n"));
        assert!(request.contains("MX: 3\r\n"));
        assert!(request.contains("ST: upnp:rootdevice\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn search_request_clamps_mx() {
        assert!(search_request(ROOT_DEVICE, 0).contains("MX: 1\r\n"));
        assert!(search_request(ROOT_DEVICE, 120).contains("MX: 5\r\n"));
    }

    #[test]
    fn parse_response_reads_headers_case_insensitively() {
        let datagram = "HTTP/1.1 200 OK\r\n\
                        CACHE-CONTROL: max-age=100\r\n\
                        location: http://192.168.1.2:80/description.xml\r\n\
                        Server: Linux/3.14.0 UPnP/1.0 IpBridge/1.17.0\r\n\
                        hue-bridgeid: 001788FFFE100491\r\n\
                        ST: upnp:rootdevice\r\n\
                        USN: uuid:2f402f80-da50-11e1-9b23-001788255acc::upnp:rootdevice\r\n\r\n";
        let response = parse_response(datagram).unwrap();
        assert_eq!(
            response.location.as_deref(),
            Some("http://192.168.1.2:80/description.xml")
        );
        assert_eq!(
            response.server.as_deref(),
            Some("Linux/3.14.0 UPnP/1.0 IpBridge/1.17.0")
        );
        assert_eq!(response.hue_bridge_id.as_deref(), Some("001788FFFE100491"));
        assert_eq!(response.search_target.as_deref(), Some(ROOT_DEVICE));
    }

    #[test]
    fn parse_response_ignores_requests() {
        assert!(parse_response(&search_request(ROOT_DEVICE, 2)).is_none());
        assert!(parse_response("NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\n\r\n").is_none());
        assert!(parse_response("").is_none());
    }
}
