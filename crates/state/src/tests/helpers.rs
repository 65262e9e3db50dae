//! Shared test helpers for the ledger tests.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;

use crate::{
    db::{GenesisAccount, InMemoryNodeDataSource, NodeDataSource},
    errors::DataSourceError,
    service::ExecutionStateService,
};

pub const ALICE: u64 = 0xa11ce;
pub const BOB: u64 = 0xb0b;
pub const CONTRACT: u64 = 0x42;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

/// A 32-byte big-endian word ending in `byte`.
pub fn word(byte: u8) -> Bytes {
    let mut w = [0u8; 32];
    w[31] = byte;
    Bytes::copy_from_slice(&w)
}

/// Wraps an in-memory source and counts every call that reaches it.
#[derive(Default)]
pub struct CountingDataSource {
    inner: InMemoryNodeDataSource,
    pub balance_calls: AtomicUsize,
    pub code_calls: AtomicUsize,
    pub storage_calls: AtomicUsize,
    pub nonce_calls: AtomicUsize,
    pub block_hash_calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingDataSource {
    pub fn new(inner: InMemoryNodeDataSource) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        [
            &self.balance_calls,
            &self.code_calls,
            &self.storage_calls,
            &self.nonce_calls,
            &self.block_hash_calls,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }

    fn hit(&self, counter: &AtomicUsize) -> Result<(), DataSourceError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DataSourceError::Custom("node unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeDataSource for CountingDataSource {
    async fn get_balance(&self, address: Address) -> Result<U256, DataSourceError> {
        self.hit(&self.balance_calls)?;
        self.inner.get_balance(address).await
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, DataSourceError> {
        self.hit(&self.code_calls)?;
        self.inner.get_code(address).await
    }

    async fn get_storage_at(
        &self,
        address: Address,
        position: U256,
    ) -> Result<Bytes, DataSourceError> {
        self.hit(&self.storage_calls)?;
        self.inner.get_storage_at(address, position).await
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, DataSourceError> {
        self.hit(&self.nonce_calls)?;
        self.inner.get_transaction_count(address).await
    }

    async fn get_block_hash(&self, block_number: u64) -> Result<H256, DataSourceError> {
        self.hit(&self.block_hash_calls)?;
        self.inner.get_block_hash(block_number).await
    }
}

/// Node state with ALICE holding 100 wei and CONTRACT holding code and two slots.
pub fn seeded_source() -> Arc<CountingDataSource> {
    let mut storage = FxHashMap::default();
    storage.insert(U256::from(1), U256::from(0x11));
    storage.insert(U256::from(2), U256::from(0x22));
    let inner = InMemoryNodeDataSource::with_accounts([
        (
            addr(ALICE),
            GenesisAccount {
                balance: U256::from(100),
                nonce: 7,
                ..Default::default()
            },
        ),
        (
            addr(CONTRACT),
            GenesisAccount {
                balance: U256::zero(),
                nonce: 1,
                code: Bytes::from_static(&[0x60, 0x00, 0x60, 0x00, 0xfd]),
                storage,
            },
        ),
    ]);
    Arc::new(CountingDataSource::new(inner))
}

pub fn service(source: &Arc<CountingDataSource>) -> ExecutionStateService {
    ExecutionStateService::new(source.clone())
}
