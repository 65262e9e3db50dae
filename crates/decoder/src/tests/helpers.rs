//! Fixtures shared by the decoder tests.

use std::sync::Arc;

use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_json_abi::JsonAbi;
use bytes::Bytes;
use ethereum_types::{Address, H256};

use crate::{
    convert::{from_b256, to_alloy_address},
    decoder::ProgramResultDecoder,
    registry::InMemoryAbiRegistry,
    revert::{ERROR_SELECTOR, PANIC_SELECTOR},
    types::{CallInput, RawLog},
};

pub const CHAIN_ID: u64 = 1;
pub const TOKEN: u64 = 0x70;
pub const ALICE: u64 = 0xa11ce;
pub const BOB: u64 = 0xb0b;

pub const TOKEN_ABI: &str = r#"[
  {
    "type": "function",
    "name": "transfer",
    "inputs": [
      { "name": "to", "type": "address" },
      { "name": "amount", "type": "uint256" }
    ],
    "outputs": [{ "name": "", "type": "bool" }],
    "stateMutability": "nonpayable"
  },
  {
    "type": "function",
    "name": "balanceOf",
    "inputs": [{ "name": "account", "type": "address" }],
    "outputs": [{ "name": "", "type": "uint256" }],
    "stateMutability": "view"
  },
  {
    "type": "event",
    "name": "Transfer",
    "inputs": [
      { "name": "from", "type": "address", "indexed": true },
      { "name": "to", "type": "address", "indexed": true },
      { "name": "value", "type": "uint256", "indexed": false }
    ],
    "anonymous": false
  },
  {
    "type": "error",
    "name": "InsufficientBalance",
    "inputs": [
      { "name": "available", "type": "uint256" },
      { "name": "required", "type": "uint256" }
    ]
  }
]"#;

pub fn token_abi() -> JsonAbi {
    serde_json::from_str(TOKEN_ABI).unwrap()
}

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn registry() -> InMemoryAbiRegistry {
    let mut registry = InMemoryAbiRegistry::new();
    registry.register_contract(CHAIN_ID, addr(TOKEN), Some("Token".into()), &token_abi());
    registry
}

pub fn decoder() -> ProgramResultDecoder {
    ProgramResultDecoder::new(Arc::new(registry()))
}

pub fn uint(n: u64) -> DynSolValue {
    DynSolValue::Uint(alloy_primitives::U256::from(n), 256)
}

/// A 32-byte big-endian word holding `n`.
pub fn word(n: u64) -> Vec<u8> {
    let mut w = vec![0u8; 24];
    w.extend_from_slice(&n.to_be_bytes());
    w
}

pub fn transfer_data(to: Address, amount: u64) -> Bytes {
    let abi = token_abi();
    let function = abi.function("transfer").unwrap().first().unwrap();
    let args = [DynSolValue::Address(to_alloy_address(to)), uint(amount)];
    function.abi_encode_input(&args).unwrap().into()
}

pub fn transfer_call(from: Address, to: Address, amount: u64) -> CallInput {
    CallInput {
        from,
        to: Some(addr(TOKEN)),
        data: transfer_data(to, amount),
        ..Default::default()
    }
}

pub fn transfer_log(from: Address, to: Address, amount: u64) -> RawLog {
    let topic0 = from_b256(token_abi().events().next().unwrap().selector());
    RawLog {
        address: addr(TOKEN),
        topics: vec![topic0, H256::from(from), H256::from(to)],
        data: word(amount).into(),
        ..Default::default()
    }
}

/// Revert data for `InsufficientBalance(available, required)`.
pub fn insufficient_balance(available: u64, required: u64) -> Vec<u8> {
    let abi = token_abi();
    let error = abi.errors().next().unwrap();
    error
        .abi_encode_input(&[uint(available), uint(required)])
        .unwrap()
}

/// Revert data for `Error(string)`.
pub fn error_string_revert(message: &str) -> Vec<u8> {
    let mut data = ERROR_SELECTOR.to_vec();
    data.extend(word(0x20));
    data.extend(word(message.len() as u64));
    let mut body = message.as_bytes().to_vec();
    body.resize(message.len().div_ceil(32) * 32, 0);
    data.extend(body);
    data
}

/// Revert data for `Panic(uint256)`.
pub fn panic_revert(code: u64) -> Vec<u8> {
    let mut data = PANIC_SELECTOR.to_vec();
    data.extend(word(code));
    data
}
