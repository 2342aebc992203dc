//! Confidence policy.
//!
//! One constant per discovery method, never updated online. The values are
//! heuristic defaults and have not been calibrated against measured
//! false-positive rates.

use khaneh_common::device::DiscoveryMethod;

pub const KASA_BROADCAST: f64 = 0.95;
pub const KASA_QUERY: f64 = 0.85;
pub const HTTP_ENDPOINT: f64 = 0.80;
pub const HTTP_BODY: f64 = 0.75;
pub const MDNS: f64 = 0.70;
pub const SSDP: f64 = 0.60;

pub fn confidence_for(method: DiscoveryMethod) -> f64 {
    match method {
        DiscoveryMethod::KasaBroadcast => KASA_BROADCAST,
        DiscoveryMethod::KasaQuery => KASA_QUERY,
        DiscoveryMethod::HttpEndpoint => HTTP_ENDPOINT,
        DiscoveryMethod::HttpBody => HTTP_BODY,
        DiscoveryMethod::Mdns => MDNS,
        DiscoveryMethod::Ssdp => SSDP,
    }
}

/// Merge rule for two observations of the same device.
pub fn merge(a: f64, b: f64) -> f64 {
    clamp(a.max(b))
}

/// Forces a score into `0.0..=1.0`; NaN counts as no confidence at all.
pub fn clamp(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METHODS: [DiscoveryMethod; 6] = [
        DiscoveryMethod::KasaBroadcast,
        DiscoveryMethod::KasaQuery,
        DiscoveryMethod::Ssdp,
        DiscoveryMethod::HttpEndpoint,
        DiscoveryMethod::HttpBody,
        DiscoveryMethod::Mdns,
    ];

    #[test]
    fn every_method_scores_within_unit_interval() {
        for method in ALL_METHODS {
            let confidence = confidence_for(method);
            assert!((0.0..=1.0).contains(&confidence), "{method}: {confidence}");
        }
    }

    #[test]
    fn vendor_protocol_outranks_heuristics() {
        assert!(confidence_for(DiscoveryMethod::KasaBroadcast) > confidence_for(DiscoveryMethod::KasaQuery));
        assert!(confidence_for(DiscoveryMethod::KasaQuery) > confidence_for(DiscoveryMethod::HttpEndpoint));
        assert!(confidence_for(DiscoveryMethod::HttpBody) > confidence_for(DiscoveryMethod::Ssdp));
    }

    #[test]
    fn merge_keeps_max_and_clamps() {
        assert_eq!(merge(0.6, 0.85), 0.85);
        assert_eq!(merge(0.85, 0.6), 0.85);
        assert_eq!(merge(1.7, 0.2), 1.0);
        assert_eq!(clamp(-0.3), 0.0);
        assert_eq!(clamp(f64::NAN), 0.0);
    }
}
