//! Primitives shared by the ledger, the decoder and the command-line front end.

pub use bytes::Bytes;
pub use ethereum_types::{Address, H256, U256};

pub mod address;
pub mod serde_utils;

pub use address::{AddressError, parse_address};

/// Length of a function, event-prefix or error selector.
pub const SELECTOR_LEN: usize = 4;

/// Encode bytes as a `0x`-prefixed lowercase hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a hex string with or without the `0x` prefix.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .unwrap_or(hex_str);
    if s.len() % 2 == 1 {
        // Node responses occasionally drop the leading nibble.
        return hex::decode(format!("0{s}"));
    }
    hex::decode(s)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_keeps_prefix() {
        assert_eq!(to_hex(&[0xde, 0xad]), "0xdead");
        assert_eq!(to_hex(&[]), "0x");
    }

    #[test]
    fn decode_hex_accepts_missing_prefix_and_odd_length() {
        assert_eq!(decode_hex("0xdead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(decode_hex("dead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(decode_hex("0x1").unwrap(), vec![0x01]);
        assert!(decode_hex("0x").unwrap().is_empty());
        assert!(decode_hex("0xzz").is_err());
    }
}
