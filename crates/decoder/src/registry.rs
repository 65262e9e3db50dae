//! ABI metadata lookup.
//!
//! The decoder only ever talks to an [`AbiRegistry`]. [`InMemoryAbiRegistry`]
//! keeps per-contract ABIs keyed by `(chain id, address)` plus a global
//! selector index for functions and events, used when the contract itself is
//! unknown or its ABI lacks the selector.

use std::path::Path;

use alloy_json_abi::{Error as AbiError, Event, Function, JsonAbi};
use ethereum_types::{Address, H256};
use ethsim_common::SELECTOR_LEN;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{convert::from_b256, error::RegistryError};

pub type Selector = [u8; SELECTOR_LEN];

pub trait AbiRegistry: Send + Sync {
    /// Function for the selector at the start of `call_data`.
    fn resolve_function(&self, chain_id: u64, address: Address, call_data: &[u8])
    -> Option<Function>;
    fn resolve_event(&self, chain_id: u64, address: Address, topic0: H256) -> Option<Event>;
    fn resolve_error(&self, chain_id: u64, address: Address, selector: Selector)
    -> Option<AbiError>;
    fn contract_name(&self, chain_id: u64, address: Address) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
struct ContractAbi {
    name: Option<String>,
    functions: FxHashMap<Selector, Function>,
    events: FxHashMap<H256, Event>,
    errors: FxHashMap<Selector, AbiError>,
}

impl ContractAbi {
    fn new(name: Option<String>, abi: &JsonAbi) -> Self {
        Self {
            name,
            functions: abi
                .functions()
                .map(|f| (f.selector().0, f.clone()))
                .collect(),
            events: abi
                .events()
                .map(|e| (from_b256(e.selector()), e.clone()))
                .collect(),
            errors: abi.errors().map(|e| (e.selector().0, e.clone())).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAbiRegistry {
    contracts: FxHashMap<(u64, Address), ContractAbi>,
    global_functions: FxHashMap<Selector, Function>,
    global_events: FxHashMap<H256, Event>,
}

impl InMemoryAbiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract ABI. Its functions and events also join the global
    /// selector index; the first registration of a selector wins there.
    pub fn register_contract(
        &mut self,
        chain_id: u64,
        address: Address,
        name: Option<String>,
        abi: &JsonAbi,
    ) {
        let contract = ContractAbi::new(name, abi);
        for (selector, function) in &contract.functions {
            self.global_functions
                .entry(*selector)
                .or_insert_with(|| function.clone());
        }
        for (topic, event) in &contract.events {
            self.global_events
                .entry(*topic)
                .or_insert_with(|| event.clone());
        }
        debug!(
            chain_id,
            %address,
            functions = contract.functions.len(),
            events = contract.events.len(),
            errors = contract.errors.len(),
            "Registered contract ABI"
        );
        self.contracts.insert((chain_id, address), contract);
    }

    pub fn register_json(
        &mut self,
        chain_id: u64,
        address: Address,
        name: Option<String>,
        json: &str,
    ) -> Result<(), RegistryError> {
        let abi: JsonAbi = serde_json::from_str(json)?;
        self.register_contract(chain_id, address, name, &abi);
        Ok(())
    }

    /// Load a JSON ABI file. Both a bare ABI array and a compiler artifact
    /// with an `abi` field are accepted.
    pub fn register_file(
        &mut self,
        chain_id: u64,
        address: Address,
        name: Option<String>,
        path: &Path,
    ) -> Result<(), RegistryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: serde_json::Value = serde_json::from_str(&contents)?;
        let abi: JsonAbi = match value.get("abi") {
            Some(abi) => serde_json::from_value(abi.clone())?,
            None => serde_json::from_value(value)?,
        };
        self.register_contract(chain_id, address, name, &abi);
        Ok(())
    }

    /// Add a function to the global selector index only.
    pub fn register_global_function(&mut self, function: Function) {
        self.global_functions
            .entry(function.selector().0)
            .or_insert(function);
    }

    /// Add an event to the global selector index only.
    pub fn register_global_event(&mut self, event: Event) {
        self.global_events
            .entry(from_b256(event.selector()))
            .or_insert(event);
    }

    fn contract(&self, chain_id: u64, address: Address) -> Option<&ContractAbi> {
        self.contracts.get(&(chain_id, address))
    }
}

impl AbiRegistry for InMemoryAbiRegistry {
    fn resolve_function(
        &self,
        chain_id: u64,
        address: Address,
        call_data: &[u8],
    ) -> Option<Function> {
        let selector: Selector = call_data.get(..SELECTOR_LEN)?.try_into().ok()?;
        self.contract(chain_id, address)
            .and_then(|c| c.functions.get(&selector))
            .or_else(|| self.global_functions.get(&selector))
            .cloned()
    }

    fn resolve_event(&self, chain_id: u64, address: Address, topic0: H256) -> Option<Event> {
        self.contract(chain_id, address)
            .and_then(|c| c.events.get(&topic0))
            .or_else(|| self.global_events.get(&topic0))
            .cloned()
    }

    fn resolve_error(
        &self,
        chain_id: u64,
        address: Address,
        selector: Selector,
    ) -> Option<AbiError> {
        self.contract(chain_id, address)?
            .errors
            .get(&selector)
            .cloned()
    }

    fn contract_name(&self, chain_id: u64, address: Address) -> Option<String> {
        self.contract(chain_id, address)?.name.clone()
    }
}
