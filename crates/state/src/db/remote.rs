//! Node data source backed by JSON-RPC.
//!
//! Looks state up on demand. No local cache: the ledger above it already
//! caches every answer for the lifetime of a simulation.

use async_trait::async_trait;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tracing::debug;

use super::NodeDataSource;
use crate::{
    errors::{DataSourceError, RpcError},
    rpc_client::{EthRpcClient, RpcConfig},
};

pub struct RpcNodeDataSource {
    client: EthRpcClient,
}

impl RpcNodeDataSource {
    pub fn new(client: EthRpcClient) -> Self {
        Self { client }
    }

    /// Create a source pinned to `block_number` on the node at `url`.
    pub fn from_url(url: &str, block_number: u64, config: RpcConfig) -> Self {
        Self::new(EthRpcClient::with_config(url, block_number, config))
    }

    /// Access the underlying RPC client.
    pub fn client(&self) -> &EthRpcClient {
        &self.client
    }

    /// Chain id reported by the node.
    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        self.client.eth_chain_id().await
    }
}

#[async_trait]
impl NodeDataSource for RpcNodeDataSource {
    async fn get_balance(&self, address: Address) -> Result<U256, DataSourceError> {
        debug!(%address, block = self.client.block_number(), "eth_getBalance");
        Ok(self.client.eth_get_balance(address).await?)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, DataSourceError> {
        debug!(%address, block = self.client.block_number(), "eth_getCode");
        Ok(self.client.eth_get_code(address).await?)
    }

    async fn get_storage_at(
        &self,
        address: Address,
        position: U256,
    ) -> Result<Bytes, DataSourceError> {
        debug!(%address, %position, block = self.client.block_number(), "eth_getStorageAt");
        Ok(self.client.eth_get_storage_at(address, position).await?)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, DataSourceError> {
        debug!(%address, block = self.client.block_number(), "eth_getTransactionCount");
        Ok(self.client.eth_get_transaction_count(address).await?)
    }

    async fn get_block_hash(&self, block_number: u64) -> Result<H256, DataSourceError> {
        debug!(block_number, "eth_getBlockByNumber");
        Ok(self.client.eth_get_block_hash(block_number).await?)
    }
}
