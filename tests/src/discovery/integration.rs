use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use khaneh_common::device::{Capability, DeviceType, DiscoveryMethod};
use khaneh_core::discovery::DiscoveryService;
use khaneh_core::probe::Probe;
use khaneh_core::probe::kasa::KasaBroadcastProbe;
use khaneh_core::probe::port_scan::PortScanProbe;
use khaneh_core::vendors::NoVendors;

use crate::support::{
    FakeKasaDevice, HS100_SYSINFO, closed_port, kasa_udp_responder, loopback_config, tarpit,
};

/// 127.0.0.0/30 holds two usable hosts: .1 runs the fake device, .2 has
/// nothing listening.
#[tokio::test]
async fn port_scan_finds_exactly_the_fake_device() {
    let device = FakeKasaDevice::start(HS100_SYSINFO).await;
    let probe = PortScanProbe::from_config(&loopback_config("127.0.0.0/30", device.port()));

    let found = probe.probe(Duration::from_secs(5)).await.unwrap();

    assert_eq!(found.len(), 1, "unexpected devices: {found:?}");
    let plug = &found[0];
    assert_eq!(plug.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(plug.device_type, DeviceType::Outlet);
    assert_eq!(plug.manufacturer.as_deref(), Some("TP-Link"));
    assert!(plug.capabilities.contains(&Capability::OnOff));
    assert_eq!(plug.discovery_method, DiscoveryMethod::KasaQuery);
    assert_eq!(plug.key(), "aa:bb:cc:dd:ee:ff");
    assert!((0.0..=1.0).contains(&plug.confidence));
}

#[tokio::test]
async fn closed_port_never_reaches_the_catalog() {
    let config = loopback_config("127.0.0.1/32", closed_port());
    let service = DiscoveryService::new(
        vec![Arc::new(PortScanProbe::from_config(&config)) as Arc<dyn Probe>],
        Box::new(NoVendors),
    );

    let catalog = service.discover_all(true, Duration::from_secs(3)).await;
    assert!(catalog.is_empty());
}

#[tokio::test]
async fn second_discovery_is_served_from_cache() {
    let device = FakeKasaDevice::start(HS100_SYSINFO).await;
    let config = loopback_config("127.0.0.1/32", device.port());
    let service = DiscoveryService::new(
        vec![Arc::new(PortScanProbe::from_config(&config)) as Arc<dyn Probe>],
        Box::new(NoVendors),
    );

    let first = service.discover_all(false, Duration::from_secs(3)).await;
    let started = Instant::now();
    let second = service.discover_all(false, Duration::from_secs(3)).await;

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn scanner_respects_concurrency_limit() {
    // Every address in 127.0.0.0/27 reaches the same device, so all 30 hosts
    // are identified and the device sees every identification request.
    let device = FakeKasaDevice::start_on(
        IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        HS100_SYSINFO,
        Duration::from_millis(20),
    )
    .await;
    let mut config = loopback_config("127.0.0.0/27", device.port());
    config.http_ports = vec![closed_port(), closed_port()];
    config.scan_concurrency = 4;

    let probe = PortScanProbe::from_config(&config);
    let found = probe.probe(Duration::from_secs(10)).await.unwrap();

    assert_eq!(found.len(), 30);
    assert!(probe.peak_in_flight() >= 1);
    assert!(
        probe.peak_in_flight() <= 4,
        "peak {} exceeded the limit",
        probe.peak_in_flight()
    );
    assert!(device.peak_serving() >= 1);
    assert!(
        device.peak_serving() <= 4,
        "device served {} requests at once",
        device.peak_serving()
    );
}

#[tokio::test]
async fn broadcast_replies_reach_the_catalog() {
    let responder = kasa_udp_responder(HS100_SYSINFO).await;
    let service = DiscoveryService::new(
        vec![Arc::new(KasaBroadcastProbe::with_target(responder)) as Arc<dyn Probe>],
        Box::new(NoVendors),
    );

    let started = Instant::now();
    let catalog = service.discover_all(false, Duration::from_millis(500)).await;

    assert!(started.elapsed() < Duration::from_millis(750));
    assert_eq!(catalog.len(), 1);
    let plug = catalog.get("aa:bb:cc:dd:ee:ff").unwrap();
    assert_eq!(plug.discovery_method, DiscoveryMethod::KasaBroadcast);
    assert_eq!(plug.confidence, 0.95);
}

/// 127.0.0.2 completes the handshake but never answers the query, so the
/// scan cannot finish inside the session.
#[tokio::test]
async fn unfinished_scan_keeps_identified_devices() {
    let device = FakeKasaDevice::start(HS100_SYSINFO).await;
    let _stalled = tarpit(Ipv4Addr::new(127, 0, 0, 2), device.port()).await;
    let mut config = loopback_config("127.0.0.0/30", device.port());
    config.http_timeout = Duration::from_secs(30);
    let service = DiscoveryService::new(
        vec![Arc::new(PortScanProbe::from_config(&config)) as Arc<dyn Probe>],
        Box::new(NoVendors),
    );

    let started = Instant::now();
    let catalog = service.discover_all(false, Duration::from_millis(800)).await;

    assert!(started.elapsed() < Duration::from_millis(1_050));
    assert_eq!(catalog.len(), 1);
    assert_eq!(
        catalog.all()[0].ip,
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        "only the answering host is catalogued"
    );
}
