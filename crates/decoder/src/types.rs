//! Raw execution results as produced by the interpreter.

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use ethsim_common::serde_utils;
use serde::{Deserialize, Serialize};

/// Kind of call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Call,
    DelegateCall,
    StaticCall,
    CallCode,
    Create,
    Create2,
}

impl CallKind {
    pub fn is_create(self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }
}

/// Parameters of one call, as sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallInput {
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    #[serde(with = "serde_utils::bytes")]
    pub data: Bytes,
    pub value: U256,
    pub gas: Option<u64>,
    /// Supplied by the trace when known.
    pub kind: Option<CallKind>,
}

impl CallInput {
    /// The trace-supplied kind, else `Create` without a target and `Call` otherwise.
    pub fn call_kind(&self) -> CallKind {
        self.kind.unwrap_or(match self.to {
            None => CallKind::Create,
            Some(_) => CallKind::Call,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerCall {
    #[serde(flatten)]
    pub call: CallInput,
    /// Absolute depth in the trace; the root call is depth 0.
    pub depth: Option<usize>,
    #[serde(with = "serde_utils::bytes")]
    pub output: Bytes,
    pub reverted: bool,
    pub gas_used: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "serde_utils::bytes")]
    pub data: Bytes,
    /// Defaults to the log's position in the result.
    pub log_index: Option<u64>,
    /// Frame that emitted the log: 0 is the root call, `n` is `inner_calls[n - 1]`.
    pub call_index: Option<usize>,
}

/// Everything the interpreter reports after running one top-level call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramResult {
    /// Return data, or revert data when `reverted`.
    #[serde(with = "serde_utils::bytes")]
    pub output: Bytes,
    pub reverted: bool,
    pub gas_used: Option<u64>,
    /// In execution order.
    pub inner_calls: Vec<InnerCall>,
    pub logs: Vec<RawLog>,
}

/// A recorded run: the call that was sent and what came back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedExecution {
    pub chain_id: u64,
    pub call: CallInput,
    pub result: ProgramResult,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn structural_kind_inference() {
        let create = CallInput::default();
        assert_eq!(create.call_kind(), CallKind::Create);

        let call = CallInput {
            to: Some(Address::from_low_u64_be(1)),
            ..Default::default()
        };
        assert_eq!(call.call_kind(), CallKind::Call);

        let delegate = CallInput {
            kind: Some(CallKind::DelegateCall),
            ..call
        };
        assert_eq!(delegate.call_kind(), CallKind::DelegateCall);
        assert!(CallKind::Create2.is_create());
    }

    #[test]
    fn recorded_execution_parses_with_defaults() {
        let json = r#"{
            "chain_id": 1,
            "call": {
                "from": "0x0000000000000000000000000000000000000001",
                "to": "0x0000000000000000000000000000000000000002",
                "data": "0xa9059cbb"
            },
            "result": {
                "output": "0x",
                "inner_calls": [{
                    "from": "0x0000000000000000000000000000000000000002",
                    "to": "0x0000000000000000000000000000000000000003",
                    "data": "0x",
                    "kind": "StaticCall",
                    "depth": 1
                }],
                "logs": [{
                    "address": "0x0000000000000000000000000000000000000002",
                    "topics": [],
                    "data": "0x"
                }]
            }
        }"#;
        let recorded: RecordedExecution = serde_json::from_str(json).unwrap();
        assert_eq!(recorded.chain_id, 1);
        assert_eq!(recorded.call.value, U256::zero());
        assert_eq!(recorded.call.data.as_ref(), &[0xa9, 0x05, 0x9c, 0xbb]);
        assert!(!recorded.result.reverted);
        let inner = &recorded.result.inner_calls[0];
        assert_eq!(inner.call.kind, Some(CallKind::StaticCall));
        assert_eq!(inner.depth, Some(1));
        assert_eq!(recorded.result.logs[0].log_index, None);
    }
}
