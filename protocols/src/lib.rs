//! Wire codecs for the protocols smart-home devices speak on a LAN.
//!
//! Everything here is pure byte/text manipulation; sockets live in the
//! core crate.

pub mod kasa;
pub mod mdns;
pub mod shelly;
pub mod ssdp;
