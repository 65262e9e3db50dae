//! Point-in-time copies of the whole ledger.
//!
//! Capture is a full structural clone: nothing in a [`StateSnapshot`] aliases
//! the live ledger, so later writes can never leak into a taken snapshot.

use bytes::Bytes;
use ethereum_types::{Address, U256};
use num_bigint::BigInt;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::account::AccountLedgerEntry;

/// EIP-1153 transient storage, per address.
pub type TransientStorage = FxHashMap<Address, FxHashMap<U256, U256>>;

/// Observable state of one account at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub address: Address,
    pub storage: FxHashMap<U256, Bytes>,
    pub execution_delta: BigInt,
    pub nonce: Option<u64>,
    pub code: Option<Bytes>,
    pub warm_storage_keys: FxHashSet<U256>,
    // Chain-derived caches, only used when a revert recreates a dropped entry.
    initial_chain_balance: Option<U256>,
    original_storage_values: FxHashMap<U256, Option<Bytes>>,
}

impl AccountSnapshot {
    pub fn capture(entry: &AccountLedgerEntry) -> Self {
        Self {
            address: entry.address(),
            storage: entry.storage().clone(),
            execution_delta: entry.balance().execution_delta().clone(),
            nonce: entry.nonce(),
            code: entry.code().cloned(),
            warm_storage_keys: entry.warm_storage_keys().clone(),
            initial_chain_balance: entry.balance().initial_chain_balance(),
            original_storage_values: entry.original_storage_values().clone(),
        }
    }

    fn restore_into(self, entry: &mut AccountLedgerEntry) {
        entry.seed_chain_cache(self.initial_chain_balance, self.original_storage_values);
        entry.restore(
            self.storage,
            self.execution_delta,
            self.nonce,
            self.code,
            self.warm_storage_keys,
        );
    }
}

#[derive(Debug, Clone)]
pub struct StateSnapshot {
    id: u64,
    accounts: FxHashMap<Address, AccountSnapshot>,
    warm_addresses: FxHashSet<Address>,
    transient_storage: TransientStorage,
}

impl StateSnapshot {
    pub fn capture(
        id: u64,
        accounts: &FxHashMap<Address, AccountLedgerEntry>,
        warm_addresses: &FxHashSet<Address>,
        transient_storage: &TransientStorage,
    ) -> Self {
        Self {
            id,
            accounts: accounts
                .iter()
                .map(|(address, entry)| (*address, AccountSnapshot::capture(entry)))
                .collect(),
            warm_addresses: warm_addresses.clone(),
            transient_storage: transient_storage.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn account(&self, address: &Address) -> Option<&AccountSnapshot> {
        self.accounts.get(address)
    }

    pub fn warm_addresses(&self) -> &FxHashSet<Address> {
        &self.warm_addresses
    }

    pub fn transient_storage(&self) -> &TransientStorage {
        &self.transient_storage
    }

    /// Replace the live state with this snapshot, consuming it.
    ///
    /// Addresses absent from the snapshot are dropped; every captured address
    /// has its storage, delta, nonce, code and warm keys replaced wholesale.
    pub fn restore(
        self,
        accounts: &mut FxHashMap<Address, AccountLedgerEntry>,
        warm_addresses: &mut FxHashSet<Address>,
        transient_storage: &mut TransientStorage,
    ) {
        accounts.retain(|address, _| self.accounts.contains_key(address));
        for (address, captured) in self.accounts {
            let entry = accounts
                .entry(address)
                .or_insert_with(|| AccountLedgerEntry::new(address));
            captured.restore_into(entry);
        }
        *warm_addresses = self.warm_addresses;
        *transient_storage = self.transient_storage;
    }
}
