//! Client identity derivation from network address text.

use std::sync::LazyLock;

use regex::Regex;

use super::limiter::{ClientId, UNIDENTIFIED_CLIENT};

/// First word-bounded dotted quad in the input, one to three digits per
/// octet. Values above 255 pass the pattern and are masked during
/// packing rather than rejected.
static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})\b")
        .expect("IPv4 pattern must compile")
});

/// Derive a [`ClientId`] from the textual form of a client address.
///
/// Scans `address` for the first IPv4 dotted quad and packs its four
/// octets big-endian, so `"127.0.0.1"` becomes `0x7F00_0001`. Socket
/// address text such as `"192.168.0.7:51123"` works as-is. Returns
/// [`UNIDENTIFIED_CLIENT`] when no dotted quad is present — IPv6
/// literals are not supported and map to the sentinel.
///
/// Pure and stateless; safe to call from any number of threads.
pub fn client_id(address: &str) -> ClientId {
    let Some(caps) = IPV4_PATTERN.captures(address) else {
        return UNIDENTIFIED_CLIENT;
    };

    let mut id: ClientId = 0;
    for octet in 1..=4 {
        let value: u32 = caps[octet].parse().unwrap_or(0);
        id = (id << 8) | (value & 0xFF);
    }
    id
}
