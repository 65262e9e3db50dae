//! Base-layer chain state the ledger falls back to on a cache miss.

use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;

use crate::errors::DataSourceError;

pub mod remote;

pub use remote::RpcNodeDataSource;

/// Read-only view of the chain at one caller-chosen block.
///
/// Every answer is treated as authoritative and cached by the ledger for the
/// lifetime of the service, so implementations need no cache of their own.
#[async_trait]
pub trait NodeDataSource: Send + Sync {
    async fn get_balance(&self, address: Address) -> Result<U256, DataSourceError>;
    async fn get_code(&self, address: Address) -> Result<Bytes, DataSourceError>;
    async fn get_storage_at(&self, address: Address, position: U256)
    -> Result<Bytes, DataSourceError>;
    async fn get_transaction_count(&self, address: Address) -> Result<u64, DataSourceError>;
    async fn get_block_hash(&self, block_number: u64) -> Result<H256, DataSourceError>;
}

/// Seeded account state for a fully offline run.
#[derive(Debug, Clone, Default)]
pub struct GenesisAccount {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    pub storage: FxHashMap<U256, U256>,
}

/// In-memory chain state. Unknown accounts read as empty and unknown slots
/// read as a zero word.
#[derive(Debug, Default)]
pub struct InMemoryNodeDataSource {
    accounts: RwLock<FxHashMap<Address, GenesisAccount>>,
    block_hashes: RwLock<FxHashMap<u64, H256>>,
}

impl InMemoryNodeDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = (Address, GenesisAccount)>) -> Self {
        Self {
            accounts: RwLock::new(accounts.into_iter().collect()),
            block_hashes: RwLock::default(),
        }
    }

    pub fn insert_account(&self, address: Address, account: GenesisAccount) -> Result<(), DataSourceError> {
        self.accounts
            .write()
            .map_err(lock_error)?
            .insert(address, account);
        Ok(())
    }

    pub fn insert_block_hash(&self, block_number: u64, hash: H256) -> Result<(), DataSourceError> {
        self.block_hashes
            .write()
            .map_err(lock_error)?
            .insert(block_number, hash);
        Ok(())
    }

    fn with_account<T>(
        &self,
        address: Address,
        f: impl FnOnce(Option<&GenesisAccount>) -> T,
    ) -> Result<T, DataSourceError> {
        let accounts = self.accounts.read().map_err(lock_error)?;
        Ok(f(accounts.get(&address)))
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> DataSourceError {
    DataSourceError::Custom(format!("lock: {e}"))
}

#[async_trait]
impl NodeDataSource for InMemoryNodeDataSource {
    async fn get_balance(&self, address: Address) -> Result<U256, DataSourceError> {
        self.with_account(address, |a| a.map(|a| a.balance).unwrap_or_default())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, DataSourceError> {
        self.with_account(address, |a| a.map(|a| a.code.clone()).unwrap_or_default())
    }

    async fn get_storage_at(
        &self,
        address: Address,
        position: U256,
    ) -> Result<Bytes, DataSourceError> {
        let value = self.with_account(address, |a| {
            a.and_then(|a| a.storage.get(&position).copied())
                .unwrap_or_default()
        })?;
        Ok(Bytes::copy_from_slice(&value.to_big_endian()))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, DataSourceError> {
        self.with_account(address, |a| a.map(|a| a.nonce).unwrap_or_default())
    }

    async fn get_block_hash(&self, block_number: u64) -> Result<H256, DataSourceError> {
        Ok(self
            .block_hashes
            .read()
            .map_err(lock_error)?
            .get(&block_number)
            .copied()
            .unwrap_or_default())
    }
}
