//! TP-Link Kasa local protocol.
//!
//! JSON commands are obfuscated with an autokey XOR stream: every
//! ciphertext byte becomes the key for the next byte, seeded with 171.
//! Over TCP the ciphertext is prefixed with a plain 4-byte big-endian
//! length; UDP broadcast datagrams carry the bare ciphertext.

use anyhow::{Context, ensure};
use serde::Deserialize;
use serde_json::Value;

pub const INITIAL_KEY: u8 = 171;
pub const HEADER_LEN: usize = 4;
pub const SYSINFO_QUERY: &str = r#"{"system":{"get_sysinfo":{}}}"#;

/// Upper bound for a framed reply. Real devices answer with a few KiB.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

pub fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    let mut key: u8 = INITIAL_KEY;
    plaintext
        .iter()
        .map(|&p| {
            let c = key ^ p;
            key = c;
            c
        })
        .collect()
}

pub fn decrypt(ciphertext: &[u8]) -> Vec<u8> {
    let mut key: u8 = INITIAL_KEY;
    ciphertext
        .iter()
        .map(|&c| {
            let p = key ^ c;
            key = c;
            p
        })
        .collect()
}

/// Encrypts `payload` and prepends the (unencrypted) length header.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut buffer: Vec<u8> = Vec::with_capacity(HEADER_LEN + payload.len());
    buffer.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buffer.extend_from_slice(&encrypt(payload));
    buffer
}

/// Reads the payload length out of a frame header.
pub fn frame_len(header: [u8; HEADER_LEN]) -> anyhow::Result<usize> {
    let len: usize = u32::from_be_bytes(header) as usize;
    ensure!(len <= MAX_FRAME_LEN, "frame of {len} bytes exceeds {MAX_FRAME_LEN}");
    Ok(len)
}

/// Inverse of [`frame`] for a fully buffered message.
pub fn unframe(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    ensure!(bytes.len() >= HEADER_LEN, "truncated frame header");
    let (header, body) = bytes.split_at(HEADER_LEN);
    let header: [u8; HEADER_LEN] = header.try_into().context("frame header")?;
    let len: usize = frame_len(header)?;
    ensure!(
        body.len() == len,
        "frame announces {len} bytes but carries {}",
        body.len()
    );
    Ok(decrypt(body))
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LightState {
    #[serde(default)]
    pub on_off: u8,
    pub brightness: Option<u8>,
}

/// The subset of `system.get_sysinfo` used for classification and control.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SysInfo {
    pub alias: String,
    pub model: String,
    pub mac: Option<String>,
    /// Bulbs report their MAC under this name.
    pub mic_mac: Option<String>,
    pub mic_type: Option<String>,
    pub dev_name: Option<String>,
    pub feature: Option<String>,
    pub relay_state: Option<u8>,
    /// Dimmer switches expose brightness at the top level.
    pub brightness: Option<u8>,
    pub light_state: Option<LightState>,
    pub is_dimmable: Option<u8>,
    pub is_color: Option<u8>,
    pub is_variable_color_temp: Option<u8>,
    pub children: Vec<Value>,
    pub err_code: i64,
}

impl SysInfo {
    pub fn mac_str(&self) -> Option<&str> {
        self.mac.as_deref().or(self.mic_mac.as_deref())
    }

    pub fn is_bulb(&self) -> bool {
        self.light_state.is_some()
            || self
                .mic_type
                .as_deref()
                .is_some_and(|t| t.contains("BULB"))
    }

    pub fn has_energy_meter(&self) -> bool {
        self.feature.as_deref().is_some_and(|f| f.contains("ENE"))
    }

    pub fn is_on(&self) -> Option<bool> {
        self.relay_state
            .map(|state| state == 1)
            .or_else(|| self.light_state.as_ref().map(|l| l.on_off == 1))
    }

    pub fn current_brightness(&self) -> Option<u8> {
        self.light_state
            .as_ref()
            .and_then(|l| l.brightness)
            .or(self.brightness)
    }
}

/// Parses a decrypted `{"system":{"get_sysinfo":{...}}}` reply.
pub fn parse_sysinfo(plaintext: &[u8]) -> anyhow::Result<SysInfo> {
    let envelope: Value = serde_json::from_slice(plaintext).context("sysinfo reply is not JSON")?;
    let inner: &Value = envelope
        .get("system")
        .and_then(|system| system.get("get_sysinfo"))
        .context("reply has no system.get_sysinfo")?;
    let sysinfo: SysInfo =
        serde_json::from_value(inner.clone()).context("malformed get_sysinfo object")?;
    ensure!(sysinfo.err_code == 0, "device returned err_code {}", sysinfo.err_code);
    Ok(sysinfo)
}

/// Extracts `err_code` from the reply to a control command.
///
/// Replies look like `{"system":{"set_relay_state":{"err_code":0}}}`.
pub fn command_err_code(plaintext: &[u8]) -> anyhow::Result<i64> {
    let envelope: Value = serde_json::from_slice(plaintext).context("reply is not JSON")?;
    envelope
        .as_object()
        .and_then(|modules| modules.values().next())
        .and_then(Value::as_object)
        .and_then(|methods| methods.values().next())
        .and_then(|result| result.get("err_code"))
        .and_then(Value::as_i64)
        .context("reply carries no err_code")
}

pub fn relay_command(on: bool) -> String {
    format!(r#"{{"system":{{"set_relay_state":{{"state":{}}}}}}}"#, u8::from(on))
}

pub fn bulb_power_command(on: bool) -> String {
    format!(
        r#"{{"smartlife.iot.smartbulb.lightingservice":{{"transition_light_state":{{"on_off":{},"transition_period":0}}}}}}"#,
        u8::from(on)
    )
}

pub fn bulb_brightness_command(brightness: u8) -> String {
    format!(
        r#"{{"smartlife.iot.smartbulb.lightingservice":{{"transition_light_state":{{"on_off":1,"brightness":{brightness},"transition_period":0}}}}}}"#
    )
}

pub fn dimmer_brightness_command(brightness: u8) -> String {
    format!(r#"{{"smartlife.iot.dimmer":{{"set_brightness":{{"brightness":{brightness}}}}}}}"#)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_inverts_on_edge_inputs() {
        let inputs: [Vec<u8>; 5] = [
            Vec::new(),
            vec![0x00; 64],
            vec![0xFF; 64],
            [0x00, 0xFF].repeat(32),
            SYSINFO_QUERY.as_bytes().to_vec(),
        ];
        for input in inputs {
            assert_eq!(decrypt(&encrypt(&input)), input);
        }
    }

    #[test]
    fn encrypt_matches_known_vector() {
        // '{' = 0x7b, 171 ^ 0x7b = 0xd0; '"' = 0x22, 0xd0 ^ 0x22 = 0xf2
        assert_eq!(encrypt(b"{\""), vec![0xd0, 0xf2]);
    }

    #[test]
    fn frame_header_is_plain_big_endian() {
        let framed = frame(SYSINFO_QUERY.as_bytes());
        assert_eq!(&framed[..4], &(SYSINFO_QUERY.len() as u32).to_be_bytes());
        assert_eq!(unframe(&framed).unwrap(), SYSINFO_QUERY.as_bytes());
    }

    #[test]
    fn unframe_rejects_length_mismatch() {
        let mut framed = frame(b"{}");
        framed.push(0);
        assert!(unframe(&framed).is_err());
        assert!(unframe(&[0, 0]).is_err());
    }

    #[test]
    fn frame_len_rejects_oversized() {
        assert!(frame_len(u32::MAX.to_be_bytes()).is_err());
        assert_eq!(frame_len(42u32.to_be_bytes()).unwrap(), 42);
    }

    #[test]
    fn parse_sysinfo_plug() {
        let reply = br#"{"system":{"get_sysinfo":{"alias":"Living Room Plug","model":"HS100","mac":"AA:BB:CC:DD:EE:FF","relay_state":1,"feature":"TIM"}}}"#;
        let sysinfo = parse_sysinfo(reply).unwrap();
        assert_eq!(sysinfo.alias, "Living Room Plug");
        assert_eq!(sysinfo.model, "HS100");
        assert_eq!(sysinfo.mac_str(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(sysinfo.is_on(), Some(true));
        assert!(!sysinfo.is_bulb());
        assert!(!sysinfo.has_energy_meter());
    }

    #[test]
    fn parse_sysinfo_bulb() {
        let reply = br#"{"system":{"get_sysinfo":{"alias":"Lamp","model":"KL130(EU)","mic_mac":"50C7BF000001","mic_type":"IOT.SMARTBULB","is_dimmable":1,"is_color":1,"light_state":{"on_off":0,"brightness":40}}}}"#;
        let sysinfo = parse_sysinfo(reply).unwrap();
        assert!(sysinfo.is_bulb());
        assert_eq!(sysinfo.mac_str(), Some("50C7BF000001"));
        assert_eq!(sysinfo.is_on(), Some(false));
        assert_eq!(sysinfo.current_brightness(), Some(40));
    }

    #[test]
    fn parse_sysinfo_rejects_errors_and_garbage() {
        assert!(parse_sysinfo(b"not json").is_err());
        assert!(parse_sysinfo(br#"{"system":{}}"#).is_err());
        assert!(parse_sysinfo(br#"{"system":{"get_sysinfo":{"err_code":-1}}}"#).is_err());
    }

    #[test]
    fn command_err_code_reads_nested_result() {
        let reply = br#"{"system":{"set_relay_state":{"err_code":0}}}"#;
        assert_eq!(command_err_code(reply).unwrap(), 0);
        assert!(command_err_code(br#"{"system":{}}"#).is_err());
    }

    #[test]
    fn commands_are_valid_json() {
        for command in [
            relay_command(true),
            bulb_power_command(false),
            bulb_brightness_command(55),
            dimmer_brightness_command(10),
        ] {
            assert!(serde_json::from_str::<Value>(&command).is_ok(), "{command}");
        }
        assert_eq!(relay_command(true), r#"{"system":{"set_relay_state":{"state":1}}}"#);
    }
}
