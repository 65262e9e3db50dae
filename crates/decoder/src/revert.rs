//! Solidity's built-in revert encodings.

use alloy_dyn_abi::{DynSolType, DynSolValue};

use crate::{decoded::DecodedParameter, error::DecodeError, registry::Selector};

/// `Error(string)`
pub const ERROR_SELECTOR: Selector = [0x08, 0xc3, 0x79, 0xa0];
/// `Panic(uint256)`
pub const PANIC_SELECTOR: Selector = [0x4e, 0x48, 0x7b, 0x71];

/// A decoded `Error(string)` or `Panic(uint256)`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StandardRevert {
    pub message: String,
    pub parameters: Vec<DecodedParameter>,
}

/// `None` when the selector is not a built-in one.
pub(crate) fn decode_standard(
    selector: Selector,
    body: &[u8],
) -> Option<Result<StandardRevert, DecodeError>> {
    match selector {
        ERROR_SELECTOR => Some(decode_error_string(body)),
        PANIC_SELECTOR => Some(decode_panic(body)),
        _ => None,
    }
}

fn decode_error_string(body: &[u8]) -> Result<StandardRevert, DecodeError> {
    let value = DynSolType::String.abi_decode(body)?;
    let message = value.as_str().unwrap_or_default().to_string();
    Ok(StandardRevert {
        message,
        parameters: vec![DecodedParameter::new("reason", "string", value)],
    })
}

fn decode_panic(body: &[u8]) -> Result<StandardRevert, DecodeError> {
    let value = DynSolType::Uint(256).abi_decode(body)?;
    let code = match &value {
        DynSolValue::Uint(code, _) => u64::try_from(*code).ok(),
        _ => None,
    };
    let message = match code {
        Some(code) => format!("panic: {} (0x{code:02x})", panic_description(code)),
        None => "panic: unknown panic code".to_string(),
    };
    Ok(StandardRevert {
        message,
        parameters: vec![DecodedParameter::new("code", "uint256", value)],
    })
}

/// Solidity's description of a `Panic(uint256)` code.
pub fn panic_description(code: u64) -> &'static str {
    match code {
        0x00 => "generic compiler panic",
        0x01 => "assertion failed",
        0x11 => "arithmetic underflow or overflow",
        0x12 => "division or modulo by zero",
        0x21 => "invalid enum value",
        0x22 => "incorrectly encoded storage byte array",
        0x31 => "pop on empty array",
        0x32 => "array index out of bounds",
        0x41 => "out of memory",
        0x51 => "call to zero-initialized internal function",
        _ => "unknown panic code",
    }
}
