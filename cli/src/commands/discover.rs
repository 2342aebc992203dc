use std::time::{Duration, Instant};

use khaneh_common::device::DeviceRecord;
use khaneh_core::HomeController;
use tracing::{Instrument, info_span};

use crate::terminal::print;

/// Runs a discovery session under a spinner.
pub async fn run_discovery(controller: &HomeController, force: bool) -> Duration {
    let span = info_span!("discovering", indicatif.pb_show = true);

    let start_time: Instant = Instant::now();
    controller
        .discover_all(force, controller.discovery_timeout())
        .instrument(span)
        .await;
    start_time.elapsed()
}

pub async fn discover(controller: &HomeController, force: bool, json: bool) -> anyhow::Result<()> {
    let elapsed: Duration = run_discovery(controller, force).await;
    let records: Vec<DeviceRecord> = controller.get_devices_for_controller().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        print::no_results();
        return Ok(());
    }

    print::header("smart-home devices");
    print::devices(&records);
    print::summary(records.len(), elapsed);
    Ok(())
}
