//! The execution-state ledger driven by the interpreter.
//!
//! Reads fall through to a [`NodeDataSource`] exactly once per item and are
//! cached for the lifetime of the service. Writes act only on the in-memory
//! ledger. Nested call frames map onto [`take_snapshot`] and
//! [`revert_to_snapshot`] / [`commit_snapshot`] / [`discard_snapshot`].
//!
//! [`take_snapshot`]: ExecutionStateService::take_snapshot
//! [`revert_to_snapshot`]: ExecutionStateService::revert_to_snapshot
//! [`commit_snapshot`]: ExecutionStateService::commit_snapshot
//! [`discard_snapshot`]: ExecutionStateService::discard_snapshot

use std::sync::Arc;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use num_bigint::BigInt;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::{
    account::{AccountLedgerEntry, u256_to_bigint},
    constants::precompile_addresses,
    db::NodeDataSource,
    errors::LedgerError,
    snapshot::{StateSnapshot, TransientStorage},
    types::{AccessListEntry, BalanceChange, StorageChange},
};

pub struct ExecutionStateService {
    source: Arc<dyn NodeDataSource>,
    accounts: FxHashMap<Address, AccountLedgerEntry>,
    /// Every address that ever got a ledger entry, plus explicitly warmed ones.
    warm_addresses: FxHashSet<Address>,
    transient_storage: TransientStorage,
    snapshots: Vec<StateSnapshot>,
    /// Never reused, not even after a revert.
    next_snapshot_id: u64,
    block_hashes: FxHashMap<u64, H256>,
}

impl ExecutionStateService {
    pub fn new(source: Arc<dyn NodeDataSource>) -> Self {
        Self {
            source,
            accounts: FxHashMap::default(),
            warm_addresses: FxHashSet::default(),
            transient_storage: TransientStorage::default(),
            snapshots: Vec::new(),
            next_snapshot_id: 1,
            block_hashes: FxHashMap::default(),
        }
    }

    pub fn account(&self, address: &Address) -> Option<&AccountLedgerEntry> {
        self.accounts.get(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountLedgerEntry> {
        self.accounts.values()
    }

    /// Ledger entry for `address`, created empty (and warmed) if missing.
    fn entry_mut(&mut self, address: Address) -> &mut AccountLedgerEntry {
        self.warm_addresses.insert(address);
        self.accounts
            .entry(address)
            .or_insert_with(|| AccountLedgerEntry::new(address))
    }

    // ---- Lazy reads ----

    pub async fn get_storage(&mut self, address: Address, key: U256) -> Result<Bytes, LedgerError> {
        if let Some(value) = self.accounts.get(&address).and_then(|e| e.read_storage(&key)) {
            trace!(%address, %key, "Storage cache hit");
            return Ok(value.clone());
        }
        debug!(%address, %key, "Fetching storage slot");
        let value = self.source.get_storage_at(address, key).await?;
        self.entry_mut(address)
            .track_fetched_storage(key, value.clone());
        Ok(value)
    }

    pub async fn get_code(&mut self, address: Address) -> Result<Bytes, LedgerError> {
        if let Some(code) = self.accounts.get(&address).and_then(|e| e.code()) {
            trace!(%address, "Code cache hit");
            return Ok(code.clone());
        }
        debug!(%address, "Fetching code");
        let code = self.source.get_code(address).await?;
        self.entry_mut(address).set_code(code.clone());
        Ok(code)
    }

    pub async fn get_nonce(&mut self, address: Address) -> Result<u64, LedgerError> {
        if let Some(nonce) = self.accounts.get(&address).and_then(|e| e.nonce()) {
            trace!(%address, "Nonce cache hit");
            return Ok(nonce);
        }
        debug!(%address, "Fetching nonce");
        let nonce = self.source.get_transaction_count(address).await?;
        self.entry_mut(address).set_nonce(nonce);
        Ok(nonce)
    }

    /// Chain balance (fetched once) plus everything applied during execution.
    pub async fn get_total_balance(&mut self, address: Address) -> Result<BigInt, LedgerError> {
        if let Some(entry) = self
            .accounts
            .get(&address)
            .filter(|e| e.balance().is_loaded())
        {
            trace!(%address, "Balance cache hit");
            return Ok(entry.total_balance());
        }
        debug!(%address, "Fetching balance");
        let balance = self.source.get_balance(address).await?;
        let entry = self.entry_mut(address);
        entry.set_initial_chain_balance(balance);
        Ok(entry.total_balance())
    }

    /// Force balance, nonce and code into the ledger.
    pub async fn load_balance_nonce_code(&mut self, address: Address) -> Result<(), LedgerError> {
        self.get_total_balance(address).await?;
        self.get_nonce(address).await?;
        self.get_code(address).await?;
        Ok(())
    }

    pub async fn get_block_hash(&mut self, block_number: u64) -> Result<H256, LedgerError> {
        if let Some(hash) = self.block_hashes.get(&block_number) {
            return Ok(*hash);
        }
        debug!(block_number, "Fetching block hash");
        let hash = self.source.get_block_hash(block_number).await?;
        self.block_hashes.insert(block_number, hash);
        Ok(hash)
    }

    // ---- Writes (never fetch) ----

    /// Tracked write: the slot's current cached value becomes its original on first touch.
    pub fn set_storage(&mut self, address: Address, key: U256, value: Bytes) {
        self.entry_mut(address).write_storage_tracked(key, value);
    }

    pub fn upsert_storage(&mut self, address: Address, key: U256, value: Bytes) {
        self.entry_mut(address).write_storage_upsert(key, value);
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.entry_mut(address).set_nonce(nonce);
    }

    pub fn apply_balance_delta(&mut self, address: Address, delta: impl Into<BigInt>) {
        self.entry_mut(address).apply_balance_delta(&delta.into());
    }

    pub fn save_code(&mut self, address: Address, code: Bytes) {
        self.entry_mut(address).set_code(code);
    }

    /// Move `value` from one account to another. No sufficiency check.
    pub fn transfer_value(&mut self, from: Address, to: Address, value: U256) {
        if value.is_zero() {
            return;
        }
        let amount = u256_to_bigint(value);
        self.entry_mut(from).apply_balance_delta(&-&amount);
        self.entry_mut(to).apply_balance_delta(&amount);
    }

    /// EIP-161: a freshly created contract starts with nonce 1 and no code.
    pub fn prepare_new_contract_account(&mut self, address: Address) {
        let entry = self.entry_mut(address);
        entry.set_nonce(1);
        entry.set_code(Bytes::new());
    }

    /// Drop an account from the ledger. The address stays warm.
    pub fn delete_account(&mut self, address: Address) {
        debug!(%address, "Deleting account");
        self.accounts.remove(&address);
    }

    /// First value observed for a slot: `None` if the key was never tracked,
    /// `Some(None)` if it had no cached value when first written.
    pub fn original_storage_value(&self, address: &Address, key: &U256) -> Option<Option<Bytes>> {
        self.accounts
            .get(address)?
            .original_storage_value(key)
            .map(|v| v.cloned())
    }

    // ---- Warm/cold tracking ----

    pub fn address_is_warm(&self, address: &Address) -> bool {
        self.warm_addresses.contains(address)
    }

    pub fn mark_address_warm(&mut self, address: Address) {
        self.entry_mut(address);
    }

    pub fn is_storage_warm(&self, address: &Address, key: &U256) -> bool {
        self.accounts
            .get(address)
            .is_some_and(|e| e.is_storage_warm(key))
    }

    pub fn mark_storage_warm(&mut self, address: Address, key: U256) {
        self.entry_mut(address).mark_storage_warm(key);
    }

    pub fn mark_precompiles_warm(&mut self) {
        for address in precompile_addresses() {
            self.mark_address_warm(address);
        }
    }

    /// EIP-2930 pre-warming.
    pub fn apply_access_list(&mut self, access_list: &[AccessListEntry]) {
        for item in access_list {
            let entry = self.entry_mut(item.address);
            for key in &item.storage_keys {
                entry.mark_storage_warm(U256::from_big_endian(key.as_bytes()));
            }
        }
    }

    // ---- Transient storage (EIP-1153) ----

    pub fn get_transient(&self, address: &Address, key: &U256) -> U256 {
        self.transient_storage
            .get(address)
            .and_then(|slots| slots.get(key))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_transient(&mut self, address: Address, key: U256, value: U256) {
        self.transient_storage
            .entry(address)
            .or_default()
            .insert(key, value);
    }

    /// Transaction boundary hook.
    pub fn clear_transient_storage(&mut self) {
        self.transient_storage.clear();
    }

    // ---- Snapshots ----

    pub fn take_snapshot(&mut self) -> u64 {
        let id = self.next_snapshot_id;
        self.next_snapshot_id += 1;
        self.snapshots.push(StateSnapshot::capture(
            id,
            &self.accounts,
            &self.warm_addresses,
            &self.transient_storage,
        ));
        debug!(id, depth = self.snapshots.len(), "Took snapshot");
        id
    }

    /// Restore the state captured by snapshot `id`, discarding it and every newer snapshot.
    pub fn revert_to_snapshot(&mut self, id: u64) -> Result<(), LedgerError> {
        let position = self
            .snapshot_position(id)
            .ok_or(LedgerError::SnapshotNotFound { id })?;
        let discarded = self.snapshots.len() - position - 1;
        self.snapshots.truncate(position + 1);
        let snapshot = self
            .snapshots
            .pop()
            .ok_or(LedgerError::SnapshotNotFound { id })?;
        snapshot.restore(
            &mut self.accounts,
            &mut self.warm_addresses,
            &mut self.transient_storage,
        );
        debug!(id, discarded, "Reverted to snapshot");
        Ok(())
    }

    /// Keep the current state and drop snapshot `id` with every newer one.
    /// Unknown ids are ignored.
    pub fn commit_snapshot(&mut self, id: u64) {
        if self.pop_through(id) {
            debug!(id, "Committed snapshot");
        }
    }

    /// Same effect as [`commit_snapshot`](Self::commit_snapshot), for checkpoints
    /// that are no longer needed.
    pub fn discard_snapshot(&mut self, id: u64) {
        if self.pop_through(id) {
            debug!(id, "Discarded snapshot");
        }
    }

    pub fn snapshot_depth(&self) -> usize {
        self.snapshots.len()
    }

    pub fn snapshot_ids(&self) -> Vec<u64> {
        self.snapshots.iter().map(StateSnapshot::id).collect()
    }

    fn snapshot_position(&self, id: u64) -> Option<usize> {
        self.snapshots.iter().rposition(|s| s.id() == id)
    }

    fn pop_through(&mut self, id: u64) -> bool {
        match self.snapshot_position(id) {
            Some(position) => {
                self.snapshots.truncate(position);
                true
            }
            None => false,
        }
    }

    // ---- State changes ----

    /// Slots whose current value differs from the first value observed,
    /// sorted by address then key.
    pub fn storage_changes(&self) -> Vec<StorageChange> {
        let mut changes: Vec<StorageChange> = self
            .accounts
            .values()
            .flat_map(|entry| {
                entry
                    .original_storage_values()
                    .iter()
                    .filter_map(move |(key, original)| {
                        let current = entry.read_storage(key)?;
                        (original.as_ref() != Some(current)).then(|| StorageChange {
                            address: entry.address(),
                            key: *key,
                            original: original.clone(),
                            current: current.clone(),
                        })
                    })
            })
            .collect();
        changes.sort_by(|a, b| a.address.cmp(&b.address).then(a.key.cmp(&b.key)));
        changes
    }

    /// Accounts with a non-zero execution delta, sorted by address.
    pub fn balance_changes(&self) -> Vec<BalanceChange> {
        let zero = BigInt::from(0);
        let mut changes: Vec<BalanceChange> = self
            .accounts
            .values()
            .filter(|entry| *entry.balance().execution_delta() != zero)
            .map(|entry| BalanceChange {
                address: entry.address(),
                initial_chain_balance: entry.balance().initial_chain_balance(),
                delta: entry.balance().execution_delta().clone(),
            })
            .collect();
        changes.sort_by(|a, b| a.address.cmp(&b.address));
        changes
    }
}
