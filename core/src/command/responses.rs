//! Persian replies spoken back to the user.

use crate::error::CommandError;

use super::parser::Action;

pub const NOT_UNDERSTOOD: &str = "متوجه دستور نشدم";
pub const DEVICE_NOT_FOUND: &str = "دستگاه مورد نظر پیدا نشد";
pub const UNSUPPORTED: &str = "این دستگاه از این عملیات پشتیبانی نمی‌کند";

pub fn success(action: Action, name: &str) -> String {
    match action {
        Action::TurnOn => format!("{name} روشن شد"),
        Action::TurnOff => format!("{name} خاموش شد"),
        Action::Dim => format!("نور {name} کم شد"),
        Action::Brighten => format!("نور {name} زیاد شد"),
        Action::Unknown => NOT_UNDERSTOOD.to_string(),
    }
}

pub fn localize(error: &CommandError) -> String {
    match error {
        CommandError::CommandNotUnderstood { .. } => NOT_UNDERSTOOD.to_string(),
        CommandError::DeviceNotFound { .. } => DEVICE_NOT_FOUND.to_string(),
        CommandError::UnsupportedAction { .. } => UNSUPPORTED.to_string(),
        CommandError::Control { device, .. } => format!("خطا در ارتباط با {device}"),
    }
}
