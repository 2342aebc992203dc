use khaneh_common::device::DeviceType;
use serde::Serialize;

use super::keywords::{self, ACTION_VERBS, DEVICE_NOUNS, FILLER, LOCATIONS};
use super::normalize::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    TurnOn,
    TurnOff,
    Dim,
    Brighten,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedIntent {
    /// The normalized phrase.
    pub phrase: String,
    /// What remains of the phrase once action words and filler are removed.
    pub device_hint: Option<String>,
    pub device_type: Option<DeviceType>,
    pub action: Action,
    /// Canonical room name.
    pub location_hint: Option<String>,
}

/// Maps a short phrase to an intent. First match per table wins.
pub fn parse(phrase: &str) -> ParsedIntent {
    let phrase: String = normalize(phrase);

    let device_type: Option<DeviceType> = DEVICE_NOUNS
        .iter()
        .find(|(keyword, _)| keywords::contains_keyword(&phrase, keyword))
        .map(|(_, device_type)| *device_type);

    let action_match = ACTION_VERBS
        .iter()
        .find(|(keyword, _)| keywords::contains_keyword(&phrase, keyword));
    let action: Action = action_match.map_or(Action::Unknown, |(_, action)| *action);

    let location_hint: Option<String> = LOCATIONS
        .iter()
        .find(|aliases| {
            aliases
                .iter()
                .any(|alias| keywords::contains_keyword(&phrase, alias))
        })
        .and_then(|aliases| aliases.first())
        .map(|canonical| canonical.to_string());

    let device_hint: Option<String> = device_hint(&phrase, action_match.map(|(keyword, _)| *keyword));

    ParsedIntent {
        phrase,
        device_hint,
        device_type,
        action,
        location_hint,
    }
}

fn device_hint(phrase: &str, action_keyword: Option<&str>) -> Option<String> {
    let stripped: String = match action_keyword {
        Some(keyword) if keyword.is_ascii() => {
            format!(" {phrase} ").replacen(&format!(" {keyword} "), " ", 1)
        }
        Some(keyword) => phrase.replacen(keyword, " ", 1),
        None => phrase.to_string(),
    };

    let hint: String = stripped
        .split_whitespace()
        .filter(|word| !FILLER.contains(word))
        .collect::<Vec<_>>()
        .join(" ");
    (!hint.is_empty()).then_some(hint)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
