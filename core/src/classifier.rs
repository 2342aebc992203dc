//! # Device Classifier
//!
//! Maps raw protocol evidence to a device type, a manufacturer and a
//! capability set. The rules are plain tables: prefix matches on model
//! strings, substring matches on SSDP `SERVER` headers, HTTP bodies and mDNS
//! service names. First matching rule wins, and anything unmatched is
//! [`DeviceType::Unknown`] with no capabilities.

use std::collections::BTreeSet;
use std::net::IpAddr;

use khaneh_common::device::{
    Capability, DeviceType, DiscoveredDevice, DiscoveryMethod, Protocol, localized_display_name,
};
use pnet::util::MacAddr;

use crate::scoring;

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub pattern: &'static str,
    pub device_type: DeviceType,
    pub manufacturer: &'static str,
}

const fn rule(pattern: &'static str, device_type: DeviceType, manufacturer: &'static str) -> Rule {
    Rule {
        pattern,
        device_type,
        manufacturer,
    }
}

/// Kasa model prefixes (`HS100(US)`, `KL130(EU)`, ...).
pub const MODEL_PREFIXES: &[Rule] = &[
    rule("KL", DeviceType::Light, "TP-Link"),
    rule("LB", DeviceType::Light, "TP-Link"),
    rule("HS", DeviceType::Outlet, "TP-Link"),
    rule("KP", DeviceType::Outlet, "TP-Link"),
    rule("EP", DeviceType::Outlet, "TP-Link"),
    rule("KS", DeviceType::Switch, "TP-Link"),
];

/// Lower-cased tokens searched in the SSDP `SERVER` header.
pub const SSDP_TOKENS: &[Rule] = &[
    rule("ipbridge", DeviceType::Hub, "Philips"),
    rule("hue", DeviceType::Hub, "Philips"),
    rule("philips", DeviceType::Hub, "Philips"),
    rule("tplink", DeviceType::Outlet, "TP-Link"),
    rule("tp-link", DeviceType::Outlet, "TP-Link"),
    rule("kasa", DeviceType::Outlet, "TP-Link"),
    rule("wemo", DeviceType::Outlet, "Belkin"),
    rule("shelly", DeviceType::Switch, "Shelly"),
    rule("tasmota", DeviceType::Outlet, "Tasmota"),
];

/// Lower-cased signatures searched in HTTP response bodies, most specific first.
pub const HTTP_SIGNATURES: &[Rule] = &[
    rule("\"bridgeid\"", DeviceType::Hub, "Philips"),
    rule("philips hue", DeviceType::Hub, "Philips"),
    rule("shblb", DeviceType::Light, "Shelly"),
    rule("shdm", DeviceType::Light, "Shelly"),
    rule("shrgbw", DeviceType::Light, "Shelly"),
    rule("shellybulb", DeviceType::Light, "Shelly"),
    rule("shellydimmer", DeviceType::Light, "Shelly"),
    rule("shplg", DeviceType::Outlet, "Shelly"),
    rule("snpl", DeviceType::Outlet, "Shelly"),
    rule("shellyplug", DeviceType::Outlet, "Shelly"),
    rule("shsw", DeviceType::Switch, "Shelly"),
    rule("snsw", DeviceType::Switch, "Shelly"),
    rule("shelly", DeviceType::Switch, "Shelly"),
    rule("tasmota", DeviceType::Outlet, "Tasmota"),
    rule("tp-link", DeviceType::Outlet, "TP-Link"),
    rule("kasa", DeviceType::Outlet, "TP-Link"),
];

pub const MDNS_SERVICES: &[Rule] = &[
    rule("_hue._tcp", DeviceType::Hub, "Philips"),
    rule("_shelly._tcp", DeviceType::Switch, "Shelly"),
];

/// Everything a probe learned about one device.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub model: Option<String>,
    pub ssdp_server: Option<String>,
    pub http_body: Option<String>,
    pub mdns_service: Option<String>,
    /// Sockets reported by a multi-outlet device.
    pub child_count: usize,
    /// Capabilities the device itself advertised (dimmable, color, metering).
    pub hints: BTreeSet<Capability>,
}

/// Finds the first rule that matches the evidence.
///
/// Model strings are the strongest evidence, then HTTP bodies, SSDP
/// headers and mDNS services.
pub fn identify(evidence: &Evidence) -> Option<&'static Rule> {
    let by_model = evidence.model.as_deref().and_then(|model| {
        let model = model.trim().to_ascii_uppercase();
        MODEL_PREFIXES
            .iter()
            .find(|rule| model.starts_with(rule.pattern))
    });

    by_model
        .or_else(|| find_substring(HTTP_SIGNATURES, evidence.http_body.as_deref()))
        .or_else(|| find_substring(SSDP_TOKENS, evidence.ssdp_server.as_deref()))
        .or_else(|| find_substring(MDNS_SERVICES, evidence.mdns_service.as_deref()))
}

fn find_substring(rules: &'static [Rule], haystack: Option<&str>) -> Option<&'static Rule> {
    let haystack: String = haystack?.to_lowercase();
    rules.iter().find(|rule| haystack.contains(rule.pattern))
}

pub fn classify(evidence: &Evidence) -> DeviceType {
    let device_type = identify(evidence).map_or(DeviceType::Unknown, |rule| rule.device_type);
    match device_type {
        DeviceType::Outlet if evidence.child_count > 1 => DeviceType::PowerStrip,
        other => other,
    }
}

pub fn manufacturer_for(evidence: &Evidence) -> Option<&'static str> {
    identify(evidence).map(|rule| rule.manufacturer)
}

pub fn capabilities_for(device_type: DeviceType, evidence: &Evidence) -> BTreeSet<Capability> {
    let base: &[Capability] = match device_type {
        DeviceType::Light => &[Capability::OnOff, Capability::Brightness],
        DeviceType::Outlet | DeviceType::Switch | DeviceType::PowerStrip => &[Capability::OnOff],
        DeviceType::Hub => &[Capability::DeviceManagement],
        DeviceType::Unknown => return BTreeSet::new(),
    };

    base.iter()
        .copied()
        .chain(evidence.hints.iter().copied())
        .collect()
}

/// One probe result before it becomes a [`DiscoveredDevice`].
#[derive(Debug, Clone)]
pub struct Observation {
    pub ip: IpAddr,
    pub port: Option<u16>,
    pub mac: Option<MacAddr>,
    pub protocol: Protocol,
    pub method: DiscoveryMethod,
    pub name: Option<String>,
    pub evidence: Evidence,
}

impl Observation {
    pub fn new(ip: IpAddr, protocol: Protocol, method: DiscoveryMethod) -> Self {
        Self {
            ip,
            port: None,
            mac: None,
            protocol,
            method,
            name: None,
            evidence: Evidence::default(),
        }
    }

    pub fn into_device(self) -> DiscoveredDevice {
        let device_type: DeviceType = classify(&self.evidence);
        let manufacturer: Option<String> = manufacturer_for(&self.evidence).map(str::to_string);
        let capabilities = capabilities_for(device_type, &self.evidence);
        let name: String = self
            .name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.evidence.model.clone())
            .or_else(|| manufacturer.clone())
            .unwrap_or_else(|| self.ip.to_string());

        DiscoveredDevice {
            mac: self.mac,
            ip: self.ip,
            port: self.port,
            protocol: self.protocol,
            device_type,
            manufacturer,
            model: self.evidence.model,
            capabilities,
            confidence: scoring::confidence_for(self.method),
            discovery_method: self.method,
            display_name: localized_display_name(device_type, &name),
            name,
        }
    }
}

/// Re-establishes the device invariants after enrichment or merging.
pub fn enforce_invariants(device: &mut DiscoveredDevice) {
    device.confidence = scoring::clamp(device.confidence);
    if device.device_type == DeviceType::Unknown {
        device.capabilities.clear();
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
