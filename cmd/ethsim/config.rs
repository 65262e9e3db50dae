//! TOML configuration for the `ethsim` binary.
//!
//! ```toml
//! [rpc]
//! url = "http://localhost:8545"
//! block = 19000000
//! timeout = 30
//! max_retries = 3
//!
//! [decoder]
//! max_string_chars = 80
//!
//! [[abi]]
//! chain_id = 1
//! address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
//! name = "USDC"
//! path = "abis/usdc.json"
//! ```

use std::path::{Path, PathBuf};

use ethsim_common::{Address, parse_address};
use ethsim_decoder::DecoderConfig;
use ethsim_state::RpcConfig;
use serde::Deserialize;

/// Top-level configuration, loadable from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub rpc: RpcSection,
    pub decoder: DecoderConfig,
    pub abi: Vec<AbiEntry>,
}

/// Node connection used by the ledger's JSON-RPC data source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    pub url: Option<String>,
    /// Block every query is pinned to.
    pub block: Option<u64>,
    #[serde(flatten)]
    pub client: RpcConfig,
}

/// One contract ABI to register with the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbiEntry {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    pub address: String,
    /// Defaults to the ABI file's stem.
    pub name: Option<String>,
    pub path: PathBuf,
}

fn default_chain_id() -> u64 {
    1
}

impl AbiEntry {
    /// Parse `<address>=<path>` as given on the command line.
    pub fn from_arg(arg: &str, chain_id: u64) -> Result<Self, String> {
        let (address, path) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected <address>=<path>, got {arg:?}"))?;
        parse_address(address).map_err(|e| format!("{arg:?}: {e}"))?;
        Ok(Self {
            chain_id,
            address: address.to_string(),
            name: None,
            path: PathBuf::from(path),
        })
    }

    pub fn parsed_address(&self) -> Result<Address, String> {
        parse_address(&self.address).map_err(|e| format!("abi entry {}: {e}", self.address))
    }

    pub fn contract_name(&self) -> Option<String> {
        self.name.clone().or_else(|| {
            self.path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values, returning an error message on failure.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(raw) = &self.rpc.url {
            let url = url::Url::parse(raw).map_err(|e| format!("rpc.url {raw:?}: {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!(
                    "rpc.url must use http or https, got {}",
                    url.scheme()
                ));
            }
        }
        if self.rpc.client.timeout.is_zero() {
            return Err("rpc.timeout must be greater than zero".to_string());
        }
        if self.decoder.string_preview_chars > self.decoder.max_string_chars {
            return Err(format!(
                "decoder.string_preview_chars ({}) must not exceed decoder.max_string_chars ({})",
                self.decoder.string_preview_chars, self.decoder.max_string_chars
            ));
        }
        for entry in &self.abi {
            entry.parsed_address()?;
            if entry.path.as_os_str().is_empty() {
                return Err(format!("abi entry {} has an empty path", entry.address));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = SimConfig::from_toml("").unwrap();
        assert!(config.rpc.url.is_none());
        assert_eq!(config.rpc.client.max_retries, 3);
        assert_eq!(config.decoder, DecoderConfig::default());
        assert!(config.abi.is_empty());
    }

    #[test]
    fn full_file_parses() {
        let config = SimConfig::from_toml(
            r#"
            [rpc]
            url = "http://localhost:8545"
            block = 100
            timeout = 5
            max_retries = 1

            [decoder]
            max_string_chars = 80

            [[abi]]
            address = "0x00000000000000000000000000000000000000aa"
            path = "abis/Token.json"

            [[abi]]
            chain_id = 10
            address = "0x00000000000000000000000000000000000000bb"
            name = "Router"
            path = "router.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.rpc.block, Some(100));
        assert_eq!(config.rpc.client.timeout.as_secs(), 5);
        assert_eq!(config.rpc.client.max_retries, 1);
        assert_eq!(config.decoder.max_string_chars, 80);
        assert_eq!(config.abi[0].chain_id, 1);
        assert_eq!(config.abi[0].contract_name().as_deref(), Some("Token"));
        assert_eq!(config.abi[1].contract_name().as_deref(), Some("Router"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(SimConfig::from_toml("[rpc]\nurl = \"ftp://node\"").is_err());
        assert!(SimConfig::from_toml("[rpc]\ntimeout = 0").is_err());
        assert!(
            SimConfig::from_toml("[[abi]]\naddress = \"0x12\"\npath = \"a.json\"").is_err()
        );
        assert!(
            SimConfig::from_toml("[decoder]\nmax_string_chars = 10\nstring_preview_chars = 20")
                .is_err()
        );
    }

    #[test]
    fn abi_argument_parsing() {
        let entry =
            AbiEntry::from_arg("0x00000000000000000000000000000000000000aa=out/Pool.json", 5)
                .unwrap();
        assert_eq!(entry.chain_id, 5);
        assert_eq!(entry.contract_name().as_deref(), Some("Pool"));
        assert!(AbiEntry::from_arg("no-separator", 1).is_err());
        assert!(AbiEntry::from_arg("0xzz=a.json", 1).is_err());
    }
}
