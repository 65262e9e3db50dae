//! Execution-state ledger for offline EVM simulation.
//!
//! Holds balances, nonces, code and storage for every touched account on top of
//! a lazily queried node, and rolls nested call frames back or forward through
//! a LIFO stack of snapshots.

pub mod account;
pub mod constants;
pub mod db;
pub mod errors;
pub mod rpc_client;
pub mod service;
pub mod snapshot;
pub mod types;

pub use account::{AccountBalance, AccountLedgerEntry, bigint_to_u256, u256_to_bigint};
pub use db::{GenesisAccount, InMemoryNodeDataSource, NodeDataSource, RpcNodeDataSource};
pub use errors::{DataSourceError, LedgerError, RpcError};
pub use rpc_client::{EthRpcClient, RpcConfig};
pub use service::ExecutionStateService;
pub use snapshot::{AccountSnapshot, StateSnapshot, TransientStorage};
pub use types::{AccessListEntry, BalanceChange, StorageChange};

#[cfg(test)]
mod tests;
