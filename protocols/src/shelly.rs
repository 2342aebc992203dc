//! Shelly Gen1 HTTP control API.
//!
//! Relays live under `/relay/<n>`, dimmable lights under `/light/<n>`, and
//! `/status` reports the state of every channel.

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Relay,
    Light,
}

impl Channel {
    fn segment(self) -> &'static str {
        match self {
            Channel::Relay => "relay",
            Channel::Light => "light",
        }
    }
}

pub const STATUS_PATH: &str = "/status";

pub fn power_path(channel: Channel, on: bool) -> String {
    let turn: &str = if on { "on" } else { "off" };
    format!("/{}/0?turn={turn}", channel.segment())
}

/// Brightness only exists on light channels.
pub fn brightness_path(brightness: u8) -> String {
    format!("/light/0?turn=on&brightness={}", brightness.clamp(1, 100))
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChannelState {
    pub ison: Option<bool>,
    pub brightness: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Status {
    pub relays: Vec<ChannelState>,
    pub lights: Vec<ChannelState>,
}

impl Status {
    /// State of the first channel, lights taking precedence over relays.
    pub fn primary(&self) -> Option<&ChannelState> {
        self.lights.first().or_else(|| self.relays.first())
    }
}

pub fn parse_status(body: &str) -> Result<Status> {
    serde_json::from_str(body).context("malformed Shelly /status reply")
}
