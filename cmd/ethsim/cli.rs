use std::{fmt::Display, path::PathBuf, str::FromStr, sync::Arc};

use clap::{ArgAction, Parser as ClapParser, Subcommand as ClapSubcommand};
use ethsim_common::{U256, parse_address, to_hex};
use ethsim_decoder::{ProgramResultDecoder, RecordedExecution, to_checksum};
use ethsim_state::ExecutionStateService;
use eyre::{WrapErr, eyre};
use serde_json::json;
use tracing::{Level, info};

use crate::{
    config::AbiEntry,
    initializers::{build_registry, init_data_source, load_config},
};

#[allow(clippy::upper_case_acronyms)]
#[derive(ClapParser)]
#[command(
    name = "ethsim",
    author = "LambdaClass",
    version,
    about = "Offline EVM execution state and result decoding"
)]
pub struct CLI {
    #[command(flatten)]
    pub opts: Options,
    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(ClapParser, Debug, Clone)]
pub struct Options {
    #[arg(
        long = "config",
        value_name = "CONFIG_FILE",
        help = "TOML file with [rpc], [decoder] and [[abi]] sections.",
        long_help = "Command-line flags override the values read from this file.",
        global = true,
        env = "ETHSIM_CONFIG"
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        env = "ETHSIM_LOG_LEVEL",
        help = "The verbosity level used for logs.",
        long_help = "Possible values: info, debug, trace, warn, error",
        global = true
    )]
    pub log_level: Level,
    #[arg(
        long = "log.color",
        default_value_t = LogColor::Auto,
        help = "Output logs with ANSI color codes.",
        long_help = "Possible values: auto, always, never",
        global = true,
        env = "ETHSIM_LOG_COLOR"
    )]
    pub log_color: LogColor,
}

#[derive(ClapSubcommand, Debug, Clone)]
pub enum Subcommand {
    #[command(name = "decode", about = "Decode a recorded execution result")]
    Decode {
        #[arg(
            long = "result",
            value_name = "RESULT_FILE",
            help = "JSON file with the chain id, the call that was sent and its raw result."
        )]
        result: PathBuf,
        #[arg(
            long = "abi",
            value_name = "ADDRESS=PATH",
            action = ArgAction::Append,
            help = "Register a JSON ABI for a contract. May be repeated.",
            long_help = "The contract name shown in the output is the file stem of PATH."
        )]
        abi: Vec<String>,
        #[arg(
            long = "chain-id",
            value_name = "CHAIN_ID",
            help = "Overrides the chain id stored in the result file.",
            env = "ETHSIM_CHAIN_ID"
        )]
        chain_id: Option<u64>,
        #[arg(long = "json", action = ArgAction::SetTrue, help = "Print JSON instead of text.")]
        json: bool,
    },
    #[command(name = "account", about = "Load an account through a node")]
    Account {
        #[arg(long = "address", value_name = "ADDRESS")]
        address: String,
        #[arg(
            long = "slot",
            value_name = "STORAGE_KEY",
            action = ArgAction::Append,
            help = "Storage key to read, hex with 0x prefix or decimal. May be repeated."
        )]
        slot: Vec<String>,
        #[arg(
            long = "rpc-url",
            value_name = "URL",
            help = "JSON-RPC endpoint of the node.",
            env = "ETHSIM_RPC_URL"
        )]
        rpc_url: Option<String>,
        #[arg(
            long = "block",
            value_name = "BLOCK_NUMBER",
            help = "Block every query is pinned to.",
            env = "ETHSIM_BLOCK"
        )]
        block: Option<u64>,
        #[arg(long = "json", action = ArgAction::SetTrue, help = "Print JSON instead of text.")]
        json: bool,
    },
}

impl Subcommand {
    pub async fn run(self, opts: &Options) -> eyre::Result<()> {
        let mut config = load_config(opts)?;
        match self {
            Subcommand::Decode {
                result,
                abi,
                chain_id,
                json,
            } => {
                let contents = std::fs::read_to_string(&result)
                    .wrap_err_with(|| format!("cannot read {}", result.display()))?;
                let recorded: RecordedExecution = serde_json::from_str(&contents)
                    .wrap_err_with(|| format!("malformed result file {}", result.display()))?;
                let chain_id = chain_id.unwrap_or(recorded.chain_id);

                for arg in &abi {
                    config
                        .abi
                        .push(AbiEntry::from_arg(arg, chain_id).map_err(|e| eyre!(e))?);
                }
                let registry = build_registry(&config.abi)?;
                let decoder = ProgramResultDecoder::new(Arc::new(registry));

                info!(
                    chain_id,
                    inner_calls = recorded.result.inner_calls.len(),
                    logs = recorded.result.logs.len(),
                    "Decoding execution result"
                );
                let decoded = decoder.decode(&recorded.result, &recorded.call, chain_id);
                if json {
                    println!("{}", decoded.to_json()?);
                } else {
                    println!("{}", decoded.to_human_readable_string_with(&config.decoder));
                }
            }
            Subcommand::Account {
                address,
                slot,
                rpc_url,
                block,
                json,
            } => {
                let address = parse_address(&address)?;
                let keys = slot
                    .iter()
                    .map(String::as_str)
                    .map(parse_storage_key)
                    .collect::<eyre::Result<Vec<_>>>()?;
                if rpc_url.is_some() {
                    config.rpc.url = rpc_url;
                }
                if block.is_some() {
                    config.rpc.block = block;
                }
                config.validate().map_err(|e| eyre!(e))?;

                let source = init_data_source(&config.rpc)?;
                let block = source.client().block_number();
                let mut state = ExecutionStateService::new(source);
                state.load_balance_nonce_code(address).await?;
                let balance = state.get_total_balance(address).await?;
                let nonce = state.get_nonce(address).await?;
                let code = state.get_code(address).await?;
                let mut slots = Vec::with_capacity(keys.len());
                for key in keys {
                    slots.push((key, state.get_storage(address, key).await?));
                }

                if json {
                    let storage: serde_json::Map<_, _> = slots
                        .iter()
                        .map(|(key, value)| (format!("{key:#x}"), json!(to_hex(value))))
                        .collect();
                    let out = json!({
                        "address": to_checksum(&address),
                        "block": block,
                        "balance": balance.to_string(),
                        "nonce": nonce,
                        "code": to_hex(&code),
                        "storage": storage,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                } else {
                    println!("Account {}", to_checksum(&address));
                    println!("  Block:   {block}");
                    println!("  Balance: {balance}");
                    println!("  Nonce:   {nonce}");
                    println!("  Code:    {} bytes", code.len());
                    for (key, value) in &slots {
                        println!("  Slot {key:#x}: {}", to_hex(value));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A storage key as `0x`-prefixed hex or decimal.
pub fn parse_storage_key(input: &str) -> eyre::Result<U256> {
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| eyre!("{e:?}")),
        None => U256::from_dec_str(input).map_err(|e| eyre!("{e:?}")),
    };
    parsed.wrap_err_with(|| format!("invalid storage key {input:?}"))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LogColor {
    #[default]
    Auto,
    Always,
    Never,
}

impl Display for LogColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogColor::Auto => write!(f, "auto"),
            LogColor::Always => write!(f, "always"),
            LogColor::Never => write!(f, "never"),
        }
    }
}

impl FromStr for LogColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(LogColor::Auto),
            "always" => Ok(LogColor::Always),
            "never" => Ok(LogColor::Never),
            _ => Err(format!(
                "Invalid log color '{s}'. Expected: auto, always, or never"
            )),
        }
    }
}
