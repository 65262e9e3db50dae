//! Call-tree reconstruction and log attribution.

use bytes::Bytes;

use super::helpers::{
    ALICE, BOB, CHAIN_ID, TOKEN, addr, decoder, error_string_revert, transfer_call,
    transfer_log, word,
};
use crate::types::{CallInput, InnerCall, ProgramResult};

fn inner(to: u64, depth: Option<usize>) -> InnerCall {
    InnerCall {
        call: CallInput {
            from: addr(ALICE),
            to: Some(addr(to)),
            ..Default::default()
        },
        depth,
        ..Default::default()
    }
}

fn targets(calls: &[crate::DecodedCall]) -> Vec<u64> {
    calls
        .iter()
        .map(|c| c.to.map_or(0, |a| a.to_low_u64_be()))
        .collect()
}

#[test]
fn nesting_follows_trace_depth() {
    let result = ProgramResult {
        inner_calls: vec![
            inner(0xa, Some(1)),
            inner(0xb, Some(2)),
            inner(0xc, Some(3)),
            inner(0xd, Some(1)),
            inner(0xe, Some(2)),
        ],
        ..Default::default()
    };
    let call = transfer_call(addr(ALICE), addr(BOB), 1);
    let decoded = decoder().decode(&result, &call, CHAIN_ID);
    let root = &decoded.root_call;

    assert_eq!(root.depth, 0);
    assert_eq!(root.call_count(), 6);
    assert_eq!(targets(&root.inner_calls), [0xa, 0xd]);
    assert_eq!(targets(&root.inner_calls[0].inner_calls), [0xb]);
    assert_eq!(targets(&root.inner_calls[0].inner_calls[0].inner_calls), [0xc]);
    assert_eq!(targets(&root.inner_calls[1].inner_calls), [0xe]);

    let depths: Vec<_> = root.walk().iter().map(|c| c.depth).collect();
    assert_eq!(depths, [0, 1, 2, 3, 1, 2]);
}

#[test]
fn calls_without_depth_are_siblings_in_order() {
    let result = ProgramResult {
        inner_calls: vec![inner(0xa, None), inner(0xb, None), inner(0xc, None)],
        ..Default::default()
    };
    let decoded = decoder().decode(&result, &CallInput::default(), CHAIN_ID);

    assert_eq!(targets(&decoded.root_call.inner_calls), [0xa, 0xb, 0xc]);
    assert!(decoded.root_call.inner_calls.iter().all(|c| c.depth == 1));
}

#[test]
fn depth_gaps_attach_to_nearest_shallower_call() {
    let result = ProgramResult {
        inner_calls: vec![inner(0xa, Some(3)), inner(0xb, Some(5))],
        ..Default::default()
    };
    let decoded = decoder().decode(&result, &CallInput::default(), CHAIN_ID);
    let root = &decoded.root_call;

    assert_eq!(targets(&root.inner_calls), [0xa]);
    assert_eq!(root.inner_calls[0].depth, 1);
    assert_eq!(root.inner_calls[0].inner_calls[0].depth, 2);
}

#[test]
fn logs_attach_to_named_frame() {
    let mut log = transfer_log(addr(ALICE), addr(BOB), 3);
    log.call_index = Some(2);
    let result = ProgramResult {
        inner_calls: vec![inner(0xa, Some(1)), inner(0xb, Some(2))],
        logs: vec![log],
        ..Default::default()
    };
    let decoded = decoder().decode(&result, &CallInput::default(), CHAIN_ID);
    let nested = &decoded.root_call.inner_calls[0].inner_calls[0];

    assert_eq!(nested.logs.len(), 1);
    assert_eq!(nested.logs[0].call_depth, 2);
    assert!(decoded.root_call.logs.is_empty());
    assert_eq!(decoded.logs.len(), 1);
    assert_eq!(decoded.logs[0].log_index, 0);
}

#[test]
fn logs_fall_back_to_latest_call_into_emitter() {
    let result = ProgramResult {
        inner_calls: vec![
            inner(TOKEN, Some(1)),
            inner(0xa, Some(1)),
            inner(TOKEN, Some(2)),
        ],
        logs: vec![transfer_log(addr(ALICE), addr(BOB), 3)],
        ..Default::default()
    };
    let decoded = decoder().decode(&result, &CallInput::default(), CHAIN_ID);
    let root = &decoded.root_call;

    assert!(root.inner_calls[0].logs.is_empty());
    assert_eq!(root.inner_calls[1].inner_calls[0].logs.len(), 1);
    assert!(decoded.logs[0].is_decoded);
}

#[test]
fn logs_from_unknown_frames_stay_on_root() {
    let mut log = transfer_log(addr(ALICE), addr(BOB), 3);
    log.log_index = Some(9);
    let result = ProgramResult {
        logs: vec![log],
        ..Default::default()
    };
    let call = transfer_call(addr(ALICE), addr(BOB), 3);
    let decoded = decoder().decode(&result, &call, CHAIN_ID);

    assert_eq!(decoded.root_call.logs.len(), 1);
    assert_eq!(decoded.root_call.logs[0].log_index, 9);
    assert_eq!(decoded.root_call.logs[0].call_depth, 0);
}

#[test]
fn successful_result_decodes_return_values() {
    let result = ProgramResult {
        output: word(1).into(),
        gas_used: Some(51_000),
        ..Default::default()
    };
    let call = transfer_call(addr(ALICE), addr(BOB), 3);
    let decoded = decoder().decode(&result, &call, CHAIN_ID);

    assert!(decoded.is_success);
    assert!(decoded.revert_reason.is_none());
    assert_eq!(decoded.return_values.len(), 1);
    assert_eq!(decoded.return_values[0].ty, "bool");
    assert_eq!(decoded.root_call.output_parameters, decoded.return_values);
    assert_eq!(decoded.root_call.gas_used, Some(51_000));
    assert_eq!(decoded.original_call, call);
    assert_eq!(decoded.raw_result, result);
}

#[test]
fn reverted_result_carries_reason_on_root_and_inner_calls() {
    let mut failing = inner(TOKEN, Some(1));
    failing.call.data = transfer_call(addr(ALICE), addr(BOB), 3).data;
    failing.reverted = true;
    failing.output = error_string_revert("insufficient balance").into();

    let result = ProgramResult {
        output: Bytes::from(error_string_revert("insufficient balance")),
        reverted: true,
        inner_calls: vec![failing],
        ..Default::default()
    };
    let decoded = decoder().decode(&result, &CallInput::default(), CHAIN_ID);

    assert!(!decoded.is_success);
    assert!(decoded.return_values.is_empty());
    let reason = decoded.revert_reason.as_ref().unwrap();
    assert_eq!(reason.message, "insufficient balance");
    assert!(decoded.root_call.is_reverted);

    let inner = &decoded.root_call.inner_calls[0];
    assert!(inner.is_reverted);
    assert_eq!(inner.function_name(), Some("transfer"));
    assert_eq!(
        inner.error.as_ref().map(|e| e.message.as_str()),
        Some("insufficient balance")
    );
    assert!(inner.output_parameters.is_empty());
}
