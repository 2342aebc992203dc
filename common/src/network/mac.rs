use pnet::util::MacAddr;

/// Parses the MAC spellings smart-home devices report.
///
/// Accepts `AA:BB:CC:DD:EE:FF`, `aa-bb-cc-dd-ee-ff` and bare `A4CF12F45A3B`.
/// Returns `None` for anything that is not exactly six octets, and for the
/// all-zero address some firmwares send before they are provisioned.
pub fn parse_mac(raw: &str) -> Option<MacAddr> {
    let hex: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.' | ' '))
        .collect();
    if hex.len() != 12 || !hex.is_ascii() {
        return None;
    }

    let mut octets = [0u8; 6];
    for (idx, octet) in octets.iter_mut().enumerate() {
        *octet = u8::from_str_radix(&hex[idx * 2..idx * 2 + 2], 16).ok()?;
    }

    let mac = MacAddr::new(octets[0], octets[1], octets[2], octets[3], octets[4], octets[5]);
    (!mac.is_zero()).then_some(mac)
}
