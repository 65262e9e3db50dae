//! ABI-based decoding of simulated execution results.
//!
//! Turns the raw output of a top-level call (return data, nested calls and
//! logs) into a call tree with named parameters, decoded events and revert
//! reasons, and renders it as text or JSON.

pub mod config;
pub mod convert;
pub mod decoded;
pub mod decoder;
pub mod error;
pub mod formatter;
pub mod registry;
pub mod revert;
pub mod types;

pub use config::DecoderConfig;
pub use decoded::{
    DecodedCall, DecodedError, DecodedLog, DecodedParameter, DecodedProgramResult,
};
pub use convert::to_checksum;
pub use decoder::ProgramResultDecoder;
pub use error::RegistryError;
pub use registry::{AbiRegistry, InMemoryAbiRegistry, Selector};
pub use revert::{ERROR_SELECTOR, PANIC_SELECTOR, panic_description};
pub use types::{CallInput, CallKind, InnerCall, ProgramResult, RawLog, RecordedExecution};

#[cfg(test)]
mod tests;
