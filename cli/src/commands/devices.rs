use khaneh_common::device::DeviceRecord;
use khaneh_core::HomeController;

use super::discover::run_discovery;
use crate::terminal::print;

pub async fn devices(controller: &HomeController, json: bool) -> anyhow::Result<()> {
    run_discovery(controller, false).await;
    let mut records: Vec<DeviceRecord> = controller.get_devices_for_controller().await;
    records.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then(a.ip.cmp(&b.ip)));

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        print::no_results();
    } else {
        print::devices(&records);
    }
    Ok(())
}
