use std::time::Duration;

use colored::*;
use khaneh_common::device::DeviceRecord;

pub const TOTAL_WIDTH: usize = 64;

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    println!("{line}");
}

pub fn fat_separator() {
    println!("{}", "═".repeat(TOTAL_WIDTH).bright_black());
}

pub fn tree_head(idx: usize, name: &str) {
    let idx_str: String = format!("[{}]", idx.to_string().cyan());
    println!("{} {}", idx_str.bright_black(), name.bright_white().bold());
}

pub fn as_tree_one_level(key_value_pair: &[(&str, ColoredString)]) {
    let key_width: usize = key_value_pair
        .iter()
        .map(|(key, _)| key.len())
        .max()
        .unwrap_or(0);

    for (i, (key, value)) in key_value_pair.iter().enumerate() {
        let last: bool = i + 1 == key_value_pair.len();
        let branch: ColoredString = if !last {
            "├─".bright_black()
        } else {
            "└─".bright_black()
        };
        println!(
            " {} {}{}{} {}",
            branch,
            key.white(),
            ".".repeat(key_width + 1 - key.len()).bright_black(),
            ":".bright_black(),
            value
        );
    }
}

fn confidence(value: f64) -> ColoredString {
    let text: String = format!("{:.0}%", value * 100.0);
    match value {
        v if v >= 0.85 => text.green().bold(),
        v if v >= 0.7 => text.yellow(),
        _ => text.red(),
    }
}

pub fn device_tree(idx: usize, record: &DeviceRecord) {
    tree_head(idx, &record.localized_name);

    let mut details: Vec<(&str, ColoredString)> = vec![
        ("Name", record.name.normal()),
        ("IP", record.ip.to_string().cyan()),
        ("Type", record.device_type.to_string().normal()),
        ("Proto", record.protocol.to_string().normal()),
    ];
    if let Some(manufacturer) = &record.manufacturer {
        details.push(("Vendor", manufacturer.as_str().normal()));
    }
    if let Some(model) = &record.model {
        details.push(("Model", model.as_str().normal()));
    }
    if !record.capabilities.is_empty() {
        let capabilities: String = record
            .capabilities
            .iter()
            .map(|capability| format!("{capability:?}"))
            .collect::<Vec<String>>()
            .join(", ");
        details.push(("Caps", capabilities.normal()));
    }
    details.push(("Score", confidence(record.confidence)));

    as_tree_one_level(&details);
}

pub fn devices(records: &[DeviceRecord]) {
    for (idx, record) in records.iter().enumerate() {
        device_tree(idx, record);
        if idx + 1 != records.len() {
            println!();
        }
    }
}

pub fn no_results() {
    header("no devices found");
    println!("{}", "Nothing answered. Try --force, a longer --timeout or --range.".red().bold());
}

pub fn summary(count: usize, elapsed: Duration) {
    let found: ColoredString = format!("{count} devices").bold().green();
    let total_time: ColoredString = format!("{:.2}s", elapsed.as_secs_f64()).bold().yellow();
    fat_separator();
    println!("Discovery complete: {found} catalogued in {total_time}");
}

pub fn command_outcome(success: bool, response: &str) {
    if success {
        println!("{} {}", "[+]".green().bold(), response);
    } else {
        println!("{} {}", "[-]".red().bold(), response);
    }
}
