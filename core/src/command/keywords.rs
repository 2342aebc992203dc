//! Keyword tables for the phrase parser.
//!
//! Tables are ordered: the first matching entry wins, so longer phrases
//! that contain shorter ones (e.g. "روشن تر" ⊃ "روشن") come first.
//! Entries are written pre-normalized (ZWNJ as a space).

use khaneh_common::device::DeviceType;

use super::parser::Action;

pub const DEVICE_NOUNS: &[(&str, DeviceType)] = &[
    ("چندراهی", DeviceType::PowerStrip),
    ("چند راهی", DeviceType::PowerStrip),
    ("سه راهی", DeviceType::PowerStrip),
    ("power strip", DeviceType::PowerStrip),
    ("چراغ", DeviceType::Light),
    ("لامپ", DeviceType::Light),
    ("light", DeviceType::Light),
    ("lamp", DeviceType::Light),
    ("bulb", DeviceType::Light),
    ("پریز", DeviceType::Outlet),
    ("plug", DeviceType::Outlet),
    ("outlet", DeviceType::Outlet),
    ("socket", DeviceType::Outlet),
    ("کلید", DeviceType::Switch),
    ("switch", DeviceType::Switch),
    ("هاب", DeviceType::Hub),
    ("hub", DeviceType::Hub),
    ("bridge", DeviceType::Hub),
];

pub const ACTION_VERBS: &[(&str, Action)] = &[
    ("روشن تر", Action::Brighten),
    ("روشنتر", Action::Brighten),
    ("نور بیشتر", Action::Brighten),
    ("بیشتر", Action::Brighten),
    ("زیاد", Action::Brighten),
    ("brighter", Action::Brighten),
    ("brighten", Action::Brighten),
    ("کم نور", Action::Dim),
    ("کم کن", Action::Dim),
    ("کمتر", Action::Dim),
    ("تاریک", Action::Dim),
    ("dimmer", Action::Dim),
    ("dim", Action::Dim),
    ("darker", Action::Dim),
    ("خاموش", Action::TurnOff),
    ("turn off", Action::TurnOff),
    ("switch off", Action::TurnOff),
    ("off", Action::TurnOff),
    ("روشن", Action::TurnOn),
    ("turn on", Action::TurnOn),
    ("switch on", Action::TurnOn),
    ("on", Action::TurnOn),
];

/// Rooms, each with its aliases. The first alias is the canonical hint.
pub const LOCATIONS: &[&[&str]] = &[
    &["نشیمن", "living room", "living"],
    &["آشپزخانه", "آشپزخونه", "kitchen"],
    &["اتاق خواب", "خواب", "bedroom"],
    &["حمام", "حموم", "bathroom"],
    &["پذیرایی", "سالن", "hall"],
    &["راهرو", "hallway", "corridor"],
    &["حیاط", "yard", "garden"],
    &["اتاق کار", "دفتر", "office", "study"],
];

/// Words that carry no device information.
pub const FILLER: &[&str] = &[
    "را", "رو", "کن", "بکن", "کنید", "لطفا", "لطفن", "هم", "و", "the", "please", "a", "of",
];

/// Aliases of a canonical location hint.
pub fn location_aliases(canonical: &str) -> &'static [&'static str] {
    LOCATIONS
        .iter()
        .find(|aliases| aliases.first() == Some(&canonical))
        .copied()
        .unwrap_or(&[])
}

/// Keyword match on a normalized phrase.
///
/// ASCII keywords must match whole words; Persian keywords match anywhere
/// since nouns and verbs take attached suffixes ("چراغو", "خاموشش").
pub fn contains_keyword(phrase: &str, keyword: &str) -> bool {
    if keyword.is_ascii() {
        format!(" {phrase} ").contains(&format!(" {keyword} "))
    } else {
        phrase.contains(keyword)
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
