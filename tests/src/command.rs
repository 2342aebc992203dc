use std::sync::Arc;
use std::time::Duration;

use khaneh_common::device::DeviceType;
use khaneh_core::HomeController;
use khaneh_core::command::{CommandExecutor, responses};
use khaneh_core::control::NetworkAdapters;
use khaneh_core::discovery::DiscoveryService;
use khaneh_core::probe::Probe;
use khaneh_core::probe::port_scan::PortScanProbe;
use khaneh_core::vendors::NoVendors;

use crate::support::{FakeKasaDevice, KL130_SYSINFO, closed_port, loopback_config};

fn controller(kasa_port: u16) -> HomeController {
    let config = loopback_config("127.0.0.1/32", kasa_port);
    let discovery = DiscoveryService::new(
        vec![Arc::new(PortScanProbe::from_config(&config)) as Arc<dyn Probe>],
        Box::new(NoVendors),
    );
    let executor = CommandExecutor::new(Arc::new(NetworkAdapters::new(Duration::from_secs(1))), 25);
    HomeController::with_parts(discovery, executor, Duration::from_secs(3))
}

#[tokio::test]
async fn phrase_turns_on_discovered_bulb() {
    let bulb = FakeKasaDevice::start(KL130_SYSINFO).await;
    let controller = controller(bulb.port());
    controller.discover_all(false, controller.discovery_timeout()).await;

    let records = controller.get_devices_for_controller().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].device_type, DeviceType::Light);
    assert_eq!(records[0].localized_name, "چراغ نشیمن");

    let outcome = controller.execute_command("چراغ نشیمن را روشن کن").await;
    assert!(outcome.success, "{}", outcome.response);
    assert_eq!(outcome.response, "چراغ نشیمن روشن شد");

    let commands = bulb.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].contains("transition_light_state"));
}

#[tokio::test]
async fn brighten_reads_status_then_steps_up() {
    let bulb = FakeKasaDevice::start(KL130_SYSINFO).await;
    let controller = controller(bulb.port());
    controller.discover_all(false, controller.discovery_timeout()).await;

    let outcome = controller.execute_command("نور چراغ نشیمن را زیاد کن").await;
    assert!(outcome.success, "{}", outcome.response);
    assert!(bulb.commands()[0].contains(r#""brightness":65"#));
}

#[tokio::test]
async fn phrase_against_empty_catalog_reports_not_found() {
    let controller = controller(closed_port());
    controller.discover_all(true, Duration::from_secs(1)).await;

    let outcome = controller.execute_command("چراغ نشیمن را روشن کن").await;
    assert!(!outcome.success);
    assert_eq!(outcome.response, responses::DEVICE_NOT_FOUND);
}
