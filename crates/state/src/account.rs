//! Per-address ledger entries.
//!
//! An [`AccountLedgerEntry`] is pure data: it never fetches anything itself.
//! Lazy population from the node is the job of
//! [`ExecutionStateService`](crate::service::ExecutionStateService).

use bytes::Bytes;
use ethereum_types::{Address, U256};
use num_bigint::{BigInt, Sign};
use rustc_hash::{FxHashMap, FxHashSet};

/// Balance split into the chain value observed once and the signed sum of
/// every adjustment made during execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountBalance {
    /// `None` until fetched from the node.
    initial_chain_balance: Option<U256>,
    execution_delta: BigInt,
}

impl AccountBalance {
    pub fn initial_chain_balance(&self) -> Option<U256> {
        self.initial_chain_balance
    }

    pub fn execution_delta(&self) -> &BigInt {
        &self.execution_delta
    }

    /// Whether the chain balance has been fetched.
    pub fn is_loaded(&self) -> bool {
        self.initial_chain_balance.is_some()
    }

    /// Record the chain balance. Calling it again refreshes the value.
    pub fn set_initial_chain_balance(&mut self, value: U256) {
        self.initial_chain_balance = Some(value);
    }

    pub fn apply_delta(&mut self, delta: &BigInt) {
        self.execution_delta += delta;
    }

    pub(crate) fn set_execution_delta(&mut self, delta: BigInt) {
        self.execution_delta = delta;
    }

    /// Initial chain balance plus execution delta, both defaulting to zero.
    pub fn total(&self) -> BigInt {
        let initial = self
            .initial_chain_balance
            .map(u256_to_bigint)
            .unwrap_or_default();
        initial + &self.execution_delta
    }
}

pub fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_big_endian())
}

/// Converts back to a word; `None` for negative values or values wider than 256 bits.
pub fn bigint_to_u256(value: &BigInt) -> Option<U256> {
    let (sign, bytes) = value.to_bytes_be();
    match sign {
        Sign::Minus => None,
        Sign::NoSign => Some(U256::zero()),
        Sign::Plus if bytes.len() > 32 => None,
        Sign::Plus => Some(U256::from_big_endian(&bytes)),
    }
}

/// Everything the ledger knows about one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLedgerEntry {
    address: Address,
    balance: AccountBalance,
    nonce: Option<u64>,
    code: Option<Bytes>,
    storage: FxHashMap<U256, Bytes>,
    /// First value observed per key. Write-once: a key is never overwritten or removed.
    /// `None` records that the slot had no cached value when first written.
    original_storage_values: FxHashMap<U256, Option<Bytes>>,
    warm_storage_keys: FxHashSet<U256>,
}

impl AccountLedgerEntry {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: AccountBalance::default(),
            nonce: None,
            code: None,
            storage: FxHashMap::default(),
            original_storage_values: FxHashMap::default(),
            warm_storage_keys: FxHashSet::default(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn balance(&self) -> &AccountBalance {
        &self.balance
    }

    pub fn total_balance(&self) -> BigInt {
        self.balance.total()
    }

    pub fn apply_balance_delta(&mut self, delta: &BigInt) {
        self.balance.apply_delta(delta);
    }

    pub fn set_initial_chain_balance(&mut self, value: U256) {
        self.balance.set_initial_chain_balance(value);
    }

    pub fn nonce(&self) -> Option<u64> {
        self.nonce
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = Some(nonce);
    }

    pub fn code(&self) -> Option<&Bytes> {
        self.code.as_ref()
    }

    pub fn set_code(&mut self, code: Bytes) {
        self.code = Some(code);
    }

    /// Cached value for `key`. `None` means the slot was never cached, which
    /// is distinct from a cached zero value.
    pub fn read_storage(&self, key: &U256) -> Option<&Bytes> {
        self.storage.get(key)
    }

    pub fn storage(&self) -> &FxHashMap<U256, Bytes> {
        &self.storage
    }

    pub fn original_storage_values(&self) -> &FxHashMap<U256, Option<Bytes>> {
        &self.original_storage_values
    }

    /// The first value observed for `key`, if the key was ever tracked.
    pub fn original_storage_value(&self, key: &U256) -> Option<Option<&Bytes>> {
        self.original_storage_values.get(key).map(Option::as_ref)
    }

    /// Write that records the slot's current value as its original on first touch.
    pub fn write_storage_tracked(&mut self, key: U256, value: Bytes) {
        if !self.original_storage_values.contains_key(&key) {
            let current = self.storage.get(&key).cloned();
            self.original_storage_values.insert(key, current);
        }
        self.storage.insert(key, value);
    }

    /// Unconditional overwrite; the original-value map is left alone.
    pub fn write_storage_upsert(&mut self, key: U256, value: Bytes) {
        self.storage.insert(key, value);
    }

    /// Cache a value read from the node, tracking it as the original if this is
    /// the first value observed for the key. An original recorded as absent
    /// (a write before any read) takes the fetched value.
    pub fn track_fetched_storage(&mut self, key: U256, value: Bytes) {
        let original = self.original_storage_values.entry(key).or_default();
        if original.is_none() {
            *original = Some(value.clone());
        }
        self.storage.insert(key, value);
    }

    pub fn is_storage_warm(&self, key: &U256) -> bool {
        self.warm_storage_keys.contains(key)
    }

    /// Monotone: keys are only ever added here. Reverts restore the set wholesale.
    pub fn mark_storage_warm(&mut self, key: U256) {
        self.warm_storage_keys.insert(key);
    }

    pub fn warm_storage_keys(&self) -> &FxHashSet<U256> {
        &self.warm_storage_keys
    }

    /// Re-seed chain-derived caches on an entry recreated by a revert.
    pub(crate) fn seed_chain_cache(
        &mut self,
        initial_chain_balance: Option<U256>,
        original_storage_values: FxHashMap<U256, Option<Bytes>>,
    ) {
        if let Some(balance) = initial_chain_balance {
            self.balance.set_initial_chain_balance(balance);
        }
        for (key, value) in original_storage_values {
            let original = self.original_storage_values.entry(key).or_default();
            if original.is_none() {
                *original = value;
            }
        }
    }

    pub(crate) fn restore(
        &mut self,
        storage: FxHashMap<U256, Bytes>,
        execution_delta: BigInt,
        nonce: Option<u64>,
        code: Option<Bytes>,
        warm_storage_keys: FxHashSet<U256>,
    ) {
        self.storage = storage;
        self.balance.set_execution_delta(execution_delta);
        self.nonce = nonce;
        self.code = code;
        self.warm_storage_keys = warm_storage_keys;
    }
}
