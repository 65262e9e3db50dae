use std::path::PathBuf;

/// Failure to load ABI metadata into a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid ABI JSON: {0}")]
    InvalidAbi(#[from] serde_json::Error),

    #[error("Cannot read ABI file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a single decode step produced nothing. Never leaves the crate: every
/// occurrence is collapsed into an undecoded result.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DecodeError {
    #[error("payload shorter than a selector")]
    TooShort,

    #[error("parameter decoding failed: {0}")]
    Abi(#[from] alloy_dyn_abi::Error),
}
