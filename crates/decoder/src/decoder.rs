//! Best-effort decoding of raw execution results.
//!
//! Every step degrades to an undecoded node or an empty parameter list when
//! the ABI is unknown or the payload does not match it. Nothing in here
//! returns an error to the caller.

use std::sync::Arc;

use alloy_dyn_abi::{DecodedEvent, DynSolValue, EventExt, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Event, Function, Param};
use alloy_primitives::LogData;
use bytes::Bytes;
use ethereum_types::Address;
use ethsim_common::{SELECTOR_LEN, to_hex};
use tracing::debug;

use crate::{
    convert::to_b256,
    decoded::{DecodedCall, DecodedError, DecodedLog, DecodedParameter, DecodedProgramResult},
    error::DecodeError,
    registry::{AbiRegistry, Selector},
    revert::decode_standard,
    types::{CallInput, InnerCall, ProgramResult, RawLog},
};

pub struct ProgramResultDecoder {
    registry: Arc<dyn AbiRegistry>,
}

impl ProgramResultDecoder {
    pub fn new(registry: Arc<dyn AbiRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &dyn AbiRegistry {
        self.registry.as_ref()
    }

    /// Decode the call's input against the registry. Outputs are left empty.
    pub fn decode_call(&self, call: &CallInput, chain_id: u64, depth: usize) -> DecodedCall {
        let mut decoded = DecodedCall::raw(call, depth);
        if call.data.len() < SELECTOR_LEN {
            return decoded;
        }
        let Some(to) = call.to else {
            // Creation input is init code, not a function call.
            return decoded;
        };
        let Some(function) = self.registry.resolve_function(chain_id, to, &call.data) else {
            debug!(
                chain_id,
                %to,
                selector = %to_hex(&call.data[..SELECTOR_LEN]),
                "No function for selector"
            );
            return decoded;
        };

        decoded.input_parameters = decode_function_input(&function, &call.data)
            .unwrap_or_else(|err| {
                debug!(function = %function.name, %err, "Input decoding failed");
                Vec::new()
            });
        decoded.contract_name = self.registry.contract_name(chain_id, to);
        decoded.function = Some(function);
        decoded.is_decoded = true;
        decoded
    }

    /// Decode a log; `log_index` and `call_depth` are supplied by the caller.
    pub fn decode_log(
        &self,
        log: &RawLog,
        chain_id: u64,
        log_index: u64,
        call_depth: usize,
    ) -> DecodedLog {
        let mut decoded = DecodedLog {
            contract_address: log.address,
            contract_name: self.registry.contract_name(chain_id, log.address),
            event: None,
            parameters: Vec::new(),
            is_decoded: false,
            log_index,
            call_depth,
        };
        let Some(topic0) = log.topics.first() else {
            return decoded;
        };
        let Some(event) = self.registry.resolve_event(chain_id, log.address, *topic0) else {
            debug!(chain_id, address = %log.address, %topic0, "No event for topic");
            return decoded;
        };

        decoded.parameters = decode_event(&event, log).unwrap_or_else(|err| {
            debug!(event = %event.name, %err, "Log decoding failed");
            Vec::new()
        });
        decoded.event = Some(event);
        decoded.is_decoded = true;
        decoded
    }

    /// Standard Solidity error, then a registry-resolved custom error, then raw bytes.
    pub fn decode_revert(
        &self,
        data: &[u8],
        chain_id: u64,
        contract: Option<Address>,
    ) -> DecodedError {
        let raw_data = Bytes::copy_from_slice(data);
        let Some((selector, body)) = split_selector(data) else {
            let message = if data.is_empty() {
                "execution reverted".to_string()
            } else {
                format!("unknown error {}", to_hex(data))
            };
            return undecoded_error(message, raw_data);
        };

        if let Some(standard) = decode_standard(selector, body) {
            return match standard {
                Ok(revert) => DecodedError {
                    error: None,
                    parameters: revert.parameters,
                    message: revert.message,
                    is_standard_error: true,
                    is_decoded: true,
                    raw_data,
                },
                Err(err) => {
                    debug!(%err, "Malformed standard revert");
                    undecoded_error(format!("unknown error {}", to_hex(data)), raw_data)
                }
            };
        }

        let resolved = contract.and_then(|c| self.registry.resolve_error(chain_id, c, selector));
        let Some(error) = resolved else {
            debug!(chain_id, selector = %to_hex(&selector), "No custom error for selector");
            return undecoded_error(format!("unknown error {}", to_hex(data)), raw_data);
        };

        let parameters = error
            .abi_decode_input(body)
            .map_err(DecodeError::from)
            .map(|values| name_values(&error.inputs, values))
            .unwrap_or_else(|err| {
                debug!(error = %error.name, %err, "Custom error decoding failed");
                Vec::new()
            });
        let args = crate::formatter::format_params(&parameters, &Default::default());
        DecodedError {
            message: format!("{}({args})", error.name),
            error: Some(error),
            parameters,
            is_standard_error: false,
            is_decoded: true,
            raw_data,
        }
    }

    /// Empty when there is no descriptor, no declared output or no data.
    pub fn decode_return_value(
        &self,
        function: Option<&Function>,
        output: &[u8],
    ) -> Vec<DecodedParameter> {
        let Some(function) = function else {
            return Vec::new();
        };
        if function.outputs.is_empty() || output.is_empty() {
            return Vec::new();
        }
        function
            .abi_decode_output(output)
            .map(|values| name_values(&function.outputs, values))
            .unwrap_or_else(|err| {
                debug!(function = %function.name, %err, "Output decoding failed");
                Vec::new()
            })
    }

    /// Decode a full result into a call tree with attributed logs.
    pub fn decode(
        &self,
        result: &ProgramResult,
        original_call: &CallInput,
        chain_id: u64,
    ) -> DecodedProgramResult {
        let mut root = self.decode_call(original_call, chain_id, 0);
        root.raw_output = result.output.clone();
        root.gas_used = result.gas_used;
        root.is_reverted = result.reverted;

        let (return_values, revert_reason) = if result.reverted {
            let reason = self.decode_revert(&result.output, chain_id, original_call.to);
            (Vec::new(), Some(reason))
        } else {
            let values = self.decode_return_value(root.function.as_ref(), &result.output);
            (values, None)
        };
        root.output_parameters = return_values.clone();
        root.error = revert_reason.clone();

        let mut frames = vec![root];
        let mut parents = vec![None];
        let mut trace_depths = vec![0];
        for inner in &result.inner_calls {
            let trace_depth = inner.depth.unwrap_or(1).max(1);
            let parent = attach_point(&trace_depths, trace_depth);
            let depth = frames[parent].depth + 1;
            frames.push(self.decode_inner_call(inner, chain_id, depth));
            parents.push(Some(parent));
            trace_depths.push(trace_depth);
        }

        let mut logs = Vec::with_capacity(result.logs.len());
        for (position, log) in result.logs.iter().enumerate() {
            let frame = log_frame(log, &frames, &result.inner_calls);
            let log_index = log
                .log_index
                .unwrap_or_else(|| u64::try_from(position).unwrap_or(u64::MAX));
            let decoded = self.decode_log(log, chain_id, log_index, frames[frame].depth);
            frames[frame].logs.push(decoded.clone());
            logs.push(decoded);
        }

        DecodedProgramResult {
            root_call: assemble_tree(frames, &parents),
            logs,
            return_values,
            revert_reason,
            is_success: !result.reverted,
            chain_id,
            original_call: original_call.clone(),
            raw_result: result.clone(),
        }
    }

    fn decode_inner_call(&self, inner: &InnerCall, chain_id: u64, depth: usize) -> DecodedCall {
        let mut decoded = self.decode_call(&inner.call, chain_id, depth);
        decoded.raw_output = inner.output.clone();
        decoded.gas_used = inner.gas_used;
        decoded.is_reverted = inner.reverted;
        if inner.reverted {
            decoded.error = Some(self.decode_revert(&inner.output, chain_id, inner.call.to));
        } else {
            decoded.output_parameters =
                self.decode_return_value(decoded.function.as_ref(), &inner.output);
        }
        decoded
    }
}

fn split_selector(data: &[u8]) -> Option<(Selector, &[u8])> {
    let (selector, body) = data.split_first_chunk::<SELECTOR_LEN>()?;
    Some((*selector, body))
}

fn undecoded_error(message: String, raw_data: Bytes) -> DecodedError {
    DecodedError {
        error: None,
        parameters: Vec::new(),
        message,
        is_standard_error: false,
        is_decoded: false,
        raw_data,
    }
}

fn decode_function_input(
    function: &Function,
    data: &[u8],
) -> Result<Vec<DecodedParameter>, DecodeError> {
    let body = data.get(SELECTOR_LEN..).ok_or(DecodeError::TooShort)?;
    let values = function.abi_decode_input(body)?;
    Ok(name_values(&function.inputs, values))
}

fn decode_event(event: &Event, log: &RawLog) -> Result<Vec<DecodedParameter>, DecodeError> {
    let topics = log.topics.iter().copied().map(to_b256).collect();
    let log_data = LogData::new_unchecked(topics, log.data.to_vec().into());
    let decoded = event.decode_log(&log_data)?;
    let values = reconstruct_params(event, &decoded);
    Ok(event
        .inputs
        .iter()
        .zip(values)
        .map(|(input, value)| DecodedParameter::new(&input.name, input.selector_type(), value))
        .collect())
}

/// Interleave indexed and body values back into declaration order.
fn reconstruct_params(event: &Event, decoded: &DecodedEvent) -> Vec<DynSolValue> {
    let mut indexed = 0;
    let mut unindexed = 0;
    let mut inputs = vec![];
    for input in &event.inputs {
        if input.indexed && indexed < decoded.indexed.len() {
            inputs.push(decoded.indexed[indexed].clone());
            indexed += 1;
        } else if unindexed < decoded.body.len() {
            inputs.push(decoded.body[unindexed].clone());
            unindexed += 1;
        }
    }
    inputs
}

fn name_values(params: &[Param], values: Vec<DynSolValue>) -> Vec<DecodedParameter> {
    params
        .iter()
        .zip(values)
        .map(|(param, value)| DecodedParameter::new(&param.name, param.selector_type(), value))
        .collect()
}

/// Parent frame for a call at trace depth `depth`: the most recent frame that
/// is shallower in the trace. Calls without a depth hang off the root.
fn attach_point(trace_depths: &[usize], depth: usize) -> usize {
    trace_depths
        .iter()
        .rposition(|d| *d < depth)
        .unwrap_or(0)
}

/// Frame index a log belongs to: the one it names, else the latest call to the
/// log's address, else the root.
fn log_frame(log: &RawLog, frames: &[DecodedCall], inner_calls: &[InnerCall]) -> usize {
    if let Some(index) = log.call_index.filter(|i| *i < frames.len()) {
        return index;
    }
    inner_calls
        .iter()
        .rposition(|call| call.call.to == Some(log.address))
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Fold the flat frame list into a tree. Parents always precede their children.
fn assemble_tree(frames: Vec<DecodedCall>, parents: &[Option<usize>]) -> DecodedCall {
    let mut slots: Vec<Option<DecodedCall>> = frames.into_iter().map(Some).collect();
    for index in (1..slots.len()).rev() {
        let (Some(parent), Some(child)) = (parents[index], slots[index].take()) else {
            continue;
        };
        if let Some(parent) = slots[parent].as_mut() {
            parent.inner_calls.push(child);
        }
    }
    let mut root = slots
        .swap_remove(0)
        .unwrap_or_else(|| DecodedCall::raw(&CallInput::default(), 0));
    reverse_children(&mut root);
    root
}

fn reverse_children(call: &mut DecodedCall) {
    call.inner_calls.reverse();
    for child in &mut call.inner_calls {
        reverse_children(child);
    }
}
