//! Address normalization.
//!
//! Every address that reaches the ledger is a 20-byte [`Address`], so two
//! spellings of the same account (lowercase, uppercase, EIP-55 checksummed)
//! always resolve to the same map key.

use ethereum_types::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid hex in address {input:?}: {cause}")]
    InvalidHex { input: String, cause: String },
    #[error("address {input:?} has {len} bytes, expected 20")]
    InvalidLength { input: String, len: usize },
}

/// Parse an address in any letter case, with or without the `0x` prefix.
///
/// Checksums are not enforced: a mixed-case input with a wrong checksum still
/// maps to the same account as its lowercase form.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits.to_ascii_lowercase()).map_err(|e| AddressError::InvalidHex {
        input: input.to_string(),
        cause: e.to_string(),
    })?;
    if bytes.len() != Address::len_bytes() {
        return Err(AddressError::InvalidLength {
            input: input.to_string(),
            len: bytes.len(),
        });
    }
    Ok(Address::from_slice(&bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn case_variants_resolve_to_one_address() {
        let lower = parse_address(&CHECKSUMMED.to_lowercase()).unwrap();
        let upper = parse_address(&format!("0x{}", &CHECKSUMMED[2..].to_uppercase())).unwrap();
        let mixed = parse_address(CHECKSUMMED).unwrap();
        let bare = parse_address(&CHECKSUMMED[2..]).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
        assert_eq!(lower, bare);
    }

    #[test]
    fn rejects_wrong_length_and_bad_hex() {
        assert!(matches!(
            parse_address("0x1234"),
            Err(AddressError::InvalidLength { len: 2, .. })
        ));
        assert!(matches!(
            parse_address("0xzz6916095ca1df60bb79ce92ce3ea74c37c5d359"),
            Err(AddressError::InvalidHex { .. })
        ));
    }
}
