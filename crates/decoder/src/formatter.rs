//! Deterministic text rendering of decoded results.

use alloy_dyn_abi::DynSolValue;
use ethsim_common::to_hex;
use serde_json::{Value, json};

use crate::{
    config::DecoderConfig,
    convert::to_checksum,
    decoded::{DecodedCall, DecodedLog, DecodedParameter, DecodedProgramResult},
};

/// Render a whole result: header, call tree, logs, outcome.
pub fn format_result(result: &DecodedProgramResult, config: &DecoderConfig) -> String {
    let status = if result.is_success { "SUCCESS" } else { "REVERTED" };
    let mut lines = vec![
        "=== EVM Execution Result ===".to_string(),
        format!("Chain ID: {}", result.chain_id),
        format!("Status: {status}"),
        String::new(),
        "Call Tree:".to_string(),
    ];
    format_call_tree(&result.root_call, config, &mut lines);

    if !result.logs.is_empty() {
        lines.push(String::new());
        lines.push("Logs:".to_string());
        for log in &result.logs {
            lines.push(format!("  {}", format_log(log, config)));
        }
    }

    lines.push(String::new());
    lines.push(format_outcome(result, config));
    lines.join("\n")
}

fn format_outcome(result: &DecodedProgramResult, config: &DecoderConfig) -> String {
    if result.is_success {
        let values = result
            .return_values
            .iter()
            .map(|p| format_value(&p.value, config))
            .collect::<Vec<_>>()
            .join(", ");
        format!("SUCCESS => {values}")
    } else {
        let message = result
            .revert_reason
            .as_ref()
            .map_or("execution reverted", |e| e.message.as_str());
        format!("REVERT - {message}")
    }
}

/// Depth-first, two spaces per level, `-> ` before every non-root call.
pub fn format_call_tree(call: &DecodedCall, config: &DecoderConfig, lines: &mut Vec<String>) {
    let indent = "  ".repeat(call.depth);
    let arrow = if call.depth > 0 { "-> " } else { "" };
    lines.push(format!("{indent}{arrow}{}", format_call(call, config)));
    for child in &call.inner_calls {
        format_call_tree(child, config, lines);
    }
}

/// A single call line, without indentation.
pub fn format_call(call: &DecodedCall, config: &DecoderConfig) -> String {
    let mut line = match (&call.contract_name, call.function_name()) {
        (Some(contract), Some(function)) => format!(
            "{contract}.{function}({})",
            format_params(&call.input_parameters, config)
        ),
        (None, Some(function)) => format!(
            "{function}({})",
            format_params(&call.input_parameters, config)
        ),
        _ => format!("call({})", selector_preview(&call.raw_input)),
    };
    if !call.value.is_zero() {
        line.push_str(&format!(" [value: {}]", call.value));
    }
    if call.is_reverted {
        line.push_str(" [reverted]");
    }
    line
}

/// Undecoded input: full hex up to a selector, else the selector and `...`.
fn selector_preview(input: &[u8]) -> String {
    if input.is_empty() {
        return String::new();
    }
    let hex = to_hex(input);
    if input.len() > ethsim_common::SELECTOR_LEN {
        format!("{}...", &hex[..10])
    } else {
        hex
    }
}

pub fn format_log(log: &DecodedLog, config: &DecoderConfig) -> String {
    let emitter = log
        .contract_name
        .clone()
        .unwrap_or_else(|| to_checksum(&log.contract_address));
    match log.event_name() {
        Some(event) => format!(
            "[{}] {emitter}.{event}({})",
            log.log_index,
            format_params(&log.parameters, config)
        ),
        None => format!("[{}] {emitter}: undecoded log", log.log_index),
    }
}

pub fn format_params(params: &[DecodedParameter], config: &DecoderConfig) -> String {
    params
        .iter()
        .map(|p| {
            let value = format_value(&p.value, config);
            if p.name.is_empty() {
                value
            } else {
                format!("{}: {value}", p.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_value(value: &DynSolValue, config: &DecoderConfig) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Address(a) => a.to_checksum(None),
        DynSolValue::FixedBytes(word, size) => {
            format_bytes(word.get(..*size).unwrap_or(word.as_slice()), config)
        }
        DynSolValue::Bytes(bytes) => format_bytes(bytes, config),
        DynSolValue::String(s) => format_string(s, config),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            format!("[{}]", join_values(items, config))
        }
        DynSolValue::Tuple(items) => format!("({})", join_values(items, config)),
        other => format!("{other:?}"),
    }
}

fn join_values(items: &[DynSolValue], config: &DecoderConfig) -> String {
    items
        .iter()
        .map(|v| format_value(v, config))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_bytes(bytes: &[u8], config: &DecoderConfig) -> String {
    if bytes.len() <= config.max_inline_bytes {
        return to_hex(bytes);
    }
    let digits = hex::encode(bytes);
    let preview = digits
        .get(..config.bytes_preview_hex_chars)
        .unwrap_or(digits.as_str());
    format!("0x{preview}... ({} bytes)", bytes.len())
}

pub fn format_string(s: &str, config: &DecoderConfig) -> String {
    if s.chars().count() > config.max_string_chars {
        let preview: String = s.chars().take(config.string_preview_chars).collect();
        format!("\"{preview}...\"")
    } else {
        format!("\"{s}\"")
    }
}

/// JSON form of a decoded value: integers as decimal strings, addresses
/// checksummed, bytes as full hex.
pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => json!(b),
        DynSolValue::Int(i, _) => json!(i.to_string()),
        DynSolValue::Uint(u, _) => json!(u.to_string()),
        DynSolValue::Address(a) => json!(a.to_checksum(None)),
        DynSolValue::FixedBytes(word, size) => {
            json!(to_hex(word.get(..*size).unwrap_or(word.as_slice())))
        }
        DynSolValue::Bytes(bytes) => json!(to_hex(bytes)),
        DynSolValue::String(s) => json!(s),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        other => json!(format!("{other:?}")),
    }
}
