use std::{io::IsTerminal, sync::Arc};

use ethsim_decoder::InMemoryAbiRegistry;
use ethsim_state::RpcNodeDataSource;
use eyre::{WrapErr, eyre};
use tracing::{Level, info};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Directive, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
    cli::{LogColor, Options},
    config::{AbiEntry, RpcSection, SimConfig},
};

/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(opts: &Options) {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    let use_color = match opts.log_color {
        LogColor::Always => true,
        LogColor::Never => false,
        LogColor::Auto => std::io::stderr().is_terminal(),
    };

    let include_target = matches!(opts.log_level, Level::DEBUG | Level::TRACE);

    let fmt_layer = fmt::layer()
        .with_target(include_target)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .with_filter(log_filter);

    tracing_subscriber::registry().with(fmt_layer).init();
}

pub fn load_config(opts: &Options) -> eyre::Result<SimConfig> {
    match &opts.config {
        Some(path) => {
            let config = SimConfig::load(path).map_err(|e| eyre!(e))?;
            info!(path = %path.display(), abis = config.abi.len(), "Loaded configuration");
            Ok(config)
        }
        None => Ok(SimConfig::default()),
    }
}

pub fn build_registry(entries: &[AbiEntry]) -> eyre::Result<InMemoryAbiRegistry> {
    let mut registry = InMemoryAbiRegistry::new();
    for entry in entries {
        let address = entry.parsed_address().map_err(|e| eyre!(e))?;
        registry
            .register_file(entry.chain_id, address, entry.contract_name(), &entry.path)
            .wrap_err_with(|| format!("cannot register ABI for {}", entry.address))?;
        info!(
            chain_id = entry.chain_id,
            %address,
            path = %entry.path.display(),
            "Registered ABI"
        );
    }
    Ok(registry)
}

pub fn init_data_source(rpc: &RpcSection) -> eyre::Result<Arc<RpcNodeDataSource>> {
    let url = rpc
        .url
        .as_deref()
        .ok_or_else(|| eyre!("no RPC URL: pass --rpc-url or set [rpc] url"))?;
    let block = rpc
        .block
        .ok_or_else(|| eyre!("no block number: pass --block or set [rpc] block"))?;
    info!(url, block, "Using node data source");
    Ok(Arc::new(RpcNodeDataSource::from_url(
        url,
        block,
        rpc.client.clone(),
    )))
}
