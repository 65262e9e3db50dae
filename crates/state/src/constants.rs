use ethereum_types::Address;

/// Highest precompile address active as of Prague (BLS12-381 MAP_FP2_TO_G2).
pub const LAST_PRECOMPILE: u64 = 0x11;

/// Precompile addresses `0x01..=0x11`, warm from the start of every transaction.
pub fn precompile_addresses() -> impl Iterator<Item = Address> {
    (1..=LAST_PRECOMPILE).map(Address::from_low_u64_be)
}

pub fn is_precompile(address: &Address) -> bool {
    precompile_addresses().any(|p| p == *address)
}
