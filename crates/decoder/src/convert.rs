//! Conversions between the ledger's primitive types and alloy's.

use ethereum_types::{Address, H256};

pub fn to_alloy_address(address: Address) -> alloy_primitives::Address {
    alloy_primitives::Address::from(address.0)
}

/// EIP-55 checksummed, `0x`-prefixed form of an address.
pub fn to_checksum(address: &Address) -> String {
    to_alloy_address(*address).to_checksum(None)
}

pub fn to_b256(hash: H256) -> alloy_primitives::B256 {
    alloy_primitives::B256::from(hash.0)
}

pub fn from_b256(hash: alloy_primitives::B256) -> H256 {
    H256::from(hash.0)
}
