//! Shared models for the smart-home discovery and command layer.
//!
//! * [`device`]: what a probe reports and what the catalog stores.
//! * [`network`]: CIDR ranges, MAC parsing and LAN interface detection.
//! * [`config`]: knobs handed in by the settings store or the CLI.

pub mod config;
pub mod device;
pub mod network;
