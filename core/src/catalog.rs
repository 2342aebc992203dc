//! # Device Catalog
//!
//! Deduplicates observations of the same physical device. Keys are the MAC
//! when a protocol exposes it, otherwise `protocol:ip`. The catalog itself is
//! not synchronised; the discovery orchestrator is its single writer and
//! wraps it in a lock.

use std::collections::BTreeMap;

use khaneh_common::device::{DeviceType, DiscoveredDevice};
use tracing::trace;

use crate::classifier;
use crate::scoring;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceCatalog {
    devices: BTreeMap<String, DiscoveredDevice>,
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new device or merges it into the entry with the same key.
    ///
    /// Merging unions the capability sets and keeps the higher confidence.
    /// Descriptive fields (type, manufacturer, model, names) are replaced
    /// only when the new observation is strictly more confident; gaps in
    /// the existing entry are always filled. Returns `true` for new keys.
    pub fn upsert(&mut self, mut device: DiscoveredDevice) -> bool {
        classifier::enforce_invariants(&mut device);
        let key: String = device.key();

        let Some(existing) = self.devices.get_mut(&key) else {
            trace!(%key, "catalog insert");
            self.devices.insert(key, device);
            return true;
        };

        trace!(%key, "catalog merge");
        let more_confident: bool = device.confidence > existing.confidence;

        existing.capabilities.extend(device.capabilities.iter().copied());
        existing.confidence = scoring::merge(existing.confidence, device.confidence);
        existing.ip = device.ip;
        if device.port.is_some() {
            existing.port = device.port;
        }

        if more_confident {
            if device.device_type != DeviceType::Unknown {
                existing.device_type = device.device_type;
            }
            existing.protocol = device.protocol;
            existing.discovery_method = device.discovery_method;
            existing.manufacturer = device.manufacturer.or(existing.manufacturer.take());
            existing.model = device.model.or(existing.model.take());
            existing.name = device.name;
            existing.display_name = device.display_name;
        } else {
            if existing.device_type == DeviceType::Unknown {
                existing.device_type = device.device_type;
            }
            if existing.manufacturer.is_none() {
                existing.manufacturer = device.manufacturer;
            }
            if existing.model.is_none() {
                existing.model = device.model;
            }
        }

        classifier::enforce_invariants(existing);
        false
    }

    pub fn get(&self, key: &str) -> Option<&DiscoveredDevice> {
        self.devices.get(key)
    }

    /// Current snapshot, ordered by key.
    pub fn all(&self) -> Vec<DiscoveredDevice> {
        self.devices.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredDevice> {
        self.devices.values()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
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
