//! # Device Model
//!
//! What a protocol probe reports about one physical device, and the
//! flattened record handed to controllers and UIs.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use pnet::util::MacAddr;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Light,
    Outlet,
    Switch,
    PowerStrip,
    Hub,
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Light => "light",
            DeviceType::Outlet => "outlet",
            DeviceType::Switch => "switch",
            DeviceType::PowerStrip => "power_strip",
            DeviceType::Hub => "hub",
            DeviceType::Unknown => "unknown",
        }
    }

    /// Persian label used when building display names.
    pub fn persian_label(&self) -> &'static str {
        match self {
            DeviceType::Light => "چراغ",
            DeviceType::Outlet => "پریز",
            DeviceType::Switch => "کلید",
            DeviceType::PowerStrip => "چندراهی",
            DeviceType::Hub => "هاب",
            DeviceType::Unknown => "دستگاه",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    OnOff,
    Brightness,
    Color,
    ColorTemperature,
    EnergyMonitoring,
    DeviceManagement,
}

/// The protocol family a device was found through, which is also the
/// family used to control it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Kasa,
    Hue,
    Shelly,
    Upnp,
    Http,
    Mdns,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Kasa => "kasa",
            Protocol::Hue => "hue",
            Protocol::Shelly => "shelly",
            Protocol::Upnp => "upnp",
            Protocol::Http => "http",
            Protocol::Mdns => "mdns",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a device was found. Each method carries a fixed confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Reply to the ciphered UDP broadcast of the vendor protocol.
    KasaBroadcast,
    /// Direct TCP query of the vendor protocol.
    KasaQuery,
    Ssdp,
    /// Vendor-specific HTTP endpoint answered (e.g. `/shelly`, `/api/config`).
    HttpEndpoint,
    /// A vendor signature was found somewhere in an HTTP body.
    HttpBody,
    Mdns,
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiscoveryMethod::KasaBroadcast => "kasa_broadcast",
            DiscoveryMethod::KasaQuery => "kasa_query",
            DiscoveryMethod::Ssdp => "ssdp",
            DiscoveryMethod::HttpEndpoint => "http_endpoint",
            DiscoveryMethod::HttpBody => "http_body",
            DiscoveryMethod::Mdns => "mdns",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDevice {
    /// Absent for protocols that do not expose it.
    pub mac: Option<MacAddr>,
    pub ip: IpAddr,
    /// Control port, when it differs from the protocol default.
    pub port: Option<u16>,
    pub protocol: Protocol,
    pub device_type: DeviceType,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub capabilities: BTreeSet<Capability>,
    /// Always within `0.0..=1.0`.
    pub confidence: f64,
    pub discovery_method: DiscoveryMethod,
    /// Name as reported by the device (Kasa alias, Hue bridge name, ...).
    pub name: String,
    pub display_name: String,
}

impl DiscoveredDevice {
    /// Catalog key: the MAC when known, else `protocol:ip`.
    pub fn key(&self) -> String {
        match self.mac {
            Some(mac) => mac.to_string(),
            None => format!("{}:{}", self.protocol, self.ip),
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn to_record(&self) -> DeviceRecord {
        DeviceRecord {
            id: self.key(),
            name: self.name.clone(),
            localized_name: self.display_name.clone(),
            ip: self.ip,
            device_type: self.device_type,
            protocol: self.protocol,
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            capabilities: self.capabilities.iter().copied().collect(),
            confidence: self.confidence,
        }
    }
}

/// Builds the Persian display name for a device.
///
/// Names that already contain Persian script are kept as they are.
pub fn localized_display_name(device_type: DeviceType, name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return device_type.persian_label().to_string();
    }
    if contains_persian(name) {
        return name.to_string();
    }
    format!("{} {}", device_type.persian_label(), name)
}

fn contains_persian(text: &str) -> bool {
    text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

/// Flattened device view for controllers and UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    pub localized_name: String,
    pub ip: IpAddr,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub protocol: Protocol,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub capabilities: Vec<Capability>,
    pub confidence: f64,
}
