use std::sync::Arc;

use khaneh_common::device::{Capability, DiscoveredDevice};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::keywords::location_aliases;
use super::normalize::normalize;
use super::parser::{Action, ParsedIntent};
use super::responses;
use crate::catalog::DeviceCatalog;
use crate::control::{ControlAdapters, ControllableDevice};
use crate::error::CommandError;

/// Brightness assumed when a device does not report its current level.
const FALLBACK_BRIGHTNESS: u8 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub response: String,
}

pub struct CommandExecutor {
    adapters: Arc<dyn ControlAdapters>,
    brightness_step: u8,
}

impl CommandExecutor {
    pub fn new(adapters: Arc<dyn ControlAdapters>, brightness_step: u8) -> Self {
        Self {
            adapters,
            brightness_step: brightness_step.clamp(1, 100),
        }
    }

    /// Runs one intent to completion. Failures become a localized reply.
    pub async fn execute(&self, catalog: &DeviceCatalog, intent: &ParsedIntent) -> CommandOutcome {
        let result = match resolve(catalog, intent) {
            Ok(device) => self.dispatch(device, intent.action).await,
            Err(e) => Err(e),
        };
        result.into()
    }

    /// Performs `action` on an already resolved device and returns the
    /// success reply.
    pub async fn dispatch(&self, device: &DiscoveredDevice, action: Action) -> Result<String, CommandError> {
        let unsupported = || CommandError::UnsupportedAction {
            device: device.display_name.clone(),
            action,
        };

        let required: Capability = match action {
            Action::TurnOn | Action::TurnOff => Capability::OnOff,
            Action::Dim | Action::Brighten => Capability::Brightness,
            Action::Unknown => {
                return Err(CommandError::CommandNotUnderstood {
                    phrase: String::new(),
                });
            }
        };
        if !device.supports(required) {
            return Err(unsupported());
        }
        let adapter: Box<dyn ControllableDevice> =
            self.adapters.adapter_for(device).ok_or_else(unsupported)?;

        let control_error = |source| CommandError::Control {
            device: device.display_name.clone(),
            source,
        };
        match action {
            Action::TurnOn => adapter.turn_on().await.map_err(control_error)?,
            Action::TurnOff => adapter.turn_off().await.map_err(control_error)?,
            Action::Dim | Action::Brighten => {
                let current: Option<u8> = adapter.status().await.map_err(control_error)?.brightness;
                let target: u8 = step_brightness(current, self.brightness_step, action);
                debug!(device = %device.key(), ?current, target, "adjusting brightness");
                adapter.set_brightness(target).await.map_err(control_error)?;
            }
            Action::Unknown => {}
        }

        info!(device = %device.key(), ?action, "command executed");
        Ok(responses::success(action, &device.display_name))
    }
}

impl From<Result<String, CommandError>> for CommandOutcome {
    fn from(result: Result<String, CommandError>) -> Self {
        match result {
            Ok(response) => CommandOutcome {
                success: true,
                response,
            },
            Err(e) => {
                match &e {
                    CommandError::Control { .. } => warn!("{e}"),
                    _ => debug!("{e}"),
                }
                CommandOutcome {
                    success: false,
                    response: responses::localize(&e),
                }
            }
        }
    }
}

/// Moves brightness one step up or down, staying within `1..=100`.
pub fn step_brightness(current: Option<u8>, step: u8, action: Action) -> u8 {
    let current: i16 = i16::from(current.unwrap_or(FALLBACK_BRIGHTNESS));
    let step: i16 = i16::from(step);
    let target: i16 = match action {
        Action::Dim => current - step,
        Action::Brighten => current + step,
        _ => current,
    };
    target.clamp(1, 100) as u8
}

/// Finds the device an intent refers to.
///
/// 1. A device whose display name appears in the phrase (longest wins).
/// 2. The device type named in the phrase, preferring the named room.
/// 3. The leftover hint as a substring of a raw device name.
pub fn resolve<'c>(catalog: &'c DeviceCatalog, intent: &ParsedIntent) -> Result<&'c DiscoveredDevice, CommandError> {
    if intent.action == Action::Unknown {
        return Err(CommandError::CommandNotUnderstood {
            phrase: intent.phrase.clone(),
        });
    }

    let mut by_display_name: Option<(usize, &DiscoveredDevice)> = None;
    for device in catalog.iter() {
        let name: String = normalize(&device.display_name);
        let len: usize = name.chars().count();
        let longer: bool = by_display_name.is_none_or(|(best, _)| len > best);
        if !name.is_empty() && intent.phrase.contains(&name) && longer {
            by_display_name = Some((len, device));
        }
    }
    if let Some((_, device)) = by_display_name {
        return Ok(device);
    }

    if let Some(device_type) = intent.device_type {
        let mut of_type = catalog.iter().filter(|d| d.device_type == device_type).peekable();
        let first: Option<&DiscoveredDevice> = of_type.peek().copied();
        let in_room: Option<&DiscoveredDevice> = intent.location_hint.as_deref().and_then(|room| {
            let aliases: &[&str] = location_aliases(room);
            of_type.find(|device| {
                let names: [String; 2] = [normalize(&device.display_name), normalize(&device.name)];
                names
                    .iter()
                    .any(|name| aliases.iter().any(|alias| name.contains(alias)))
            })
        });
        if let Some(device) = in_room.or(first) {
            return Ok(device);
        }
    }

    if let Some(hint) = intent.device_hint.as_deref() {
        let by_name = catalog.iter().find(|device| {
            let name: String = normalize(&device.name);
            !name.is_empty() && (name.contains(hint) || hint.contains(&name))
        });
        if let Some(device) = by_name {
            return Ok(device);
        }
    }

    Err(CommandError::DeviceNotFound {
        hint: intent.device_hint.clone().unwrap_or_else(|| intent.phrase.clone()),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
