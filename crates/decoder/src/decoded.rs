//! Decoded view of an execution result.

use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::{Error as AbiError, Event, Function};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use ethsim_common::serde_utils;
use serde::{Serialize, Serializer};

use crate::{
    config::DecoderConfig,
    formatter,
    types::{CallInput, CallKind, ProgramResult},
};

/// One named, typed ABI value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(serialize_with = "serialize_value")]
    pub value: DynSolValue,
}

impl DecodedParameter {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, value: DynSolValue) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            value,
        }
    }
}

fn serialize_value<S: Serializer>(value: &DynSolValue, s: S) -> Result<S::Ok, S::Error> {
    formatter::value_to_json(value).serialize(s)
}

fn serialize_signature<S, T>(item: &Option<T>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Signature,
{
    match item {
        Some(item) => s.serialize_some(&item.full_signature()),
        None => s.serialize_none(),
    }
}

/// Human-readable signature used when serializing descriptors.
trait Signature {
    fn full_signature(&self) -> String;
}

impl Signature for Function {
    fn full_signature(&self) -> String {
        Function::full_signature(self)
    }
}

impl Signature for Event {
    fn full_signature(&self) -> String {
        Event::full_signature(self)
    }
}

impl Signature for AbiError {
    fn full_signature(&self) -> String {
        AbiError::signature(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCall {
    pub from: Address,
    pub to: Option<Address>,
    #[serde(serialize_with = "serialize_signature")]
    pub function: Option<Function>,
    pub contract_name: Option<String>,
    pub input_parameters: Vec<DecodedParameter>,
    pub output_parameters: Vec<DecodedParameter>,
    /// In execution order.
    pub inner_calls: Vec<DecodedCall>,
    /// Logs emitted by this frame.
    pub logs: Vec<DecodedLog>,
    pub call_type: CallKind,
    pub depth: usize,
    pub is_decoded: bool,
    #[serde(with = "serde_utils::bytes")]
    pub raw_input: Bytes,
    #[serde(with = "serde_utils::bytes")]
    pub raw_output: Bytes,
    pub value: U256,
    pub gas_used: Option<u64>,
    pub is_reverted: bool,
    pub error: Option<DecodedError>,
}

impl DecodedCall {
    /// An undecoded node carrying only what the raw call says.
    pub fn raw(call: &CallInput, depth: usize) -> Self {
        Self {
            from: call.from,
            to: call.to,
            function: None,
            contract_name: None,
            input_parameters: Vec::new(),
            output_parameters: Vec::new(),
            inner_calls: Vec::new(),
            logs: Vec::new(),
            call_type: call.call_kind(),
            depth,
            is_decoded: false,
            raw_input: call.data.clone(),
            raw_output: Bytes::new(),
            value: call.value,
            gas_used: None,
            is_reverted: false,
            error: None,
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        self.function.as_ref().map(|f| f.name.as_str())
    }

    /// Number of calls in this subtree, this one included.
    pub fn call_count(&self) -> usize {
        1 + self.inner_calls.iter().map(DecodedCall::call_count).sum::<usize>()
    }

    /// Depth-first walk in execution order.
    pub fn walk(&self) -> Vec<&DecodedCall> {
        let mut out = vec![self];
        for child in &self.inner_calls {
            out.extend(child.walk());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedLog {
    pub contract_address: Address,
    pub contract_name: Option<String>,
    #[serde(serialize_with = "serialize_signature")]
    pub event: Option<Event>,
    pub parameters: Vec<DecodedParameter>,
    pub is_decoded: bool,
    pub log_index: u64,
    pub call_depth: usize,
}

impl DecodedLog {
    pub fn event_name(&self) -> Option<&str> {
        self.event.as_ref().map(|e| e.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedError {
    #[serde(serialize_with = "serialize_signature")]
    pub error: Option<AbiError>,
    pub parameters: Vec<DecodedParameter>,
    pub message: String,
    /// `Error(string)` or `Panic(uint256)`.
    pub is_standard_error: bool,
    pub is_decoded: bool,
    #[serde(with = "serde_utils::bytes")]
    pub raw_data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedProgramResult {
    pub root_call: DecodedCall,
    /// Every log in the result, in emission order.
    pub logs: Vec<DecodedLog>,
    pub return_values: Vec<DecodedParameter>,
    pub revert_reason: Option<DecodedError>,
    pub is_success: bool,
    pub chain_id: u64,
    #[serde(skip)]
    pub original_call: CallInput,
    #[serde(skip)]
    pub raw_result: ProgramResult,
}

impl DecodedProgramResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human_readable_string(&self) -> String {
        formatter::format_result(self, &DecoderConfig::default())
    }

    pub fn to_human_readable_string_with(&self, config: &DecoderConfig) -> String {
        formatter::format_result(self, config)
    }
}
