//! Configuration loading, env vars, CLI flags.

use crate::types::{QuoterError, Result};
use crate::utils::{load_token_list, parse_address};
use alloy_primitives::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_GAS_PRICE_TTL_SECS: u64 = 300;
pub const DEFAULT_GAS_REFRESH_SECS: u64 = 10;
/// 0.3%, i.e. the 997/1000 UniswapV2 fee.
pub const DEFAULT_SWAP_FEE_BPS: u32 = 30;
/// UniswapV2 factory on Ethereum mainnet.
pub const DEFAULT_FACTORY_ADDRESS: &str = "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f";
/// WETH on Ethereum mainnet.
pub const DEFAULT_WRAPPED_NATIVE_ADDRESS: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const DEFAULT_WRAPPED_NATIVE_DECIMALS: u8 = 18;
pub const DEFAULT_API_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rpc_url: String,
    pub rpc_timeout_secs: u64,
    /// The one freshness window for gas snapshots, used by refresher and reader alike.
    pub gas_price_ttl_secs: u64,
    pub gas_refresh_secs: u64,
    pub swap_fee_bps: u32,
    pub factory_address: Address,
    pub wrapped_native_address: Address,
    pub wrapped_native_decimals: u8,
    pub tokens_file: Option<String>,
    pub api_addr: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub rpc_url: Option<String>,
    pub rpc_timeout_secs: Option<u64>,
    pub gas_price_ttl_secs: Option<u64>,
    pub gas_refresh_secs: Option<u64>,
    pub swap_fee_bps: Option<u32>,
    pub factory_address: Option<String>,
    pub wrapped_native_address: Option<String>,
    pub wrapped_native_decimals: Option<u8>,
    pub tokens_file: Option<String>,
    pub api_addr: Option<String>,
}

impl FileConfig {
    pub fn from_path(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QuoterError::Config(format!("cannot read {}: {}", path, e)))?;
        toml::from_str(&contents)
            .map_err(|e| QuoterError::Config(format!("invalid config file {}: {}", path, e)))
    }
}

#[cfg(feature = "cli")]
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version)]
pub struct CliConfig {
    /// TOML file with any of the settings below
    #[arg(long, global = true)]
    pub config: Option<String>,
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,
    #[arg(long, global = true)]
    pub rpc_timeout_secs: Option<u64>,
    #[arg(long, global = true)]
    pub gas_price_ttl_secs: Option<u64>,
    #[arg(long, global = true)]
    pub gas_refresh_secs: Option<u64>,
    #[arg(long, global = true)]
    pub swap_fee_bps: Option<u32>,
    #[arg(long, global = true)]
    pub factory_address: Option<String>,
    #[arg(long, global = true)]
    pub wrapped_native_address: Option<String>,
    #[arg(long, global = true)]
    pub wrapped_native_decimals: Option<u8>,
    #[arg(long, global = true)]
    pub tokens_file: Option<String>,
    #[arg(long, global = true)]
    pub api_addr: Option<String>,
}

#[cfg(feature = "cli")]
impl CliConfig {
    fn into_layer(self) -> FileConfig {
        FileConfig {
            rpc_url: self.rpc_url,
            rpc_timeout_secs: self.rpc_timeout_secs,
            gas_price_ttl_secs: self.gas_price_ttl_secs,
            gas_refresh_secs: self.gas_refresh_secs,
            swap_fee_bps: self.swap_fee_bps,
            factory_address: self.factory_address,
            wrapped_native_address: self.wrapped_native_address,
            wrapped_native_decimals: self.wrapped_native_decimals,
            tokens_file: self.tokens_file,
            api_addr: self.api_addr,
        }
    }
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_parse<T>(lookup: Lookup<'_>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| QuoterError::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(None),
    }
}

/// A value set by a higher layer wins; otherwise fall through to the environment.
fn layered<T>(value: Option<T>, lookup: Lookup<'_>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(v) => Ok(Some(v)),
        None => env_parse(lookup, key),
    }
}

fn config_address(raw: &str, field: &str) -> Result<Address> {
    parse_address(raw).map_err(|_| QuoterError::Config(format!("{} is not an address: {}", field, raw)))
}

impl AppConfig {
    /// Environment variables over defaults.
    pub fn load() -> Result<Self> {
        Self::resolve(FileConfig::default(), FileConfig::default(), &|key: &str| env::var(key).ok())
    }

    #[cfg(feature = "cli")]
    pub fn load_with_cli() -> Result<Self> {
        Self::from_cli(CliConfig::parse())
    }

    /// CLI flags, then the `--config` TOML file, then environment, then defaults.
    #[cfg(feature = "cli")]
    pub fn from_cli(cli: CliConfig) -> Result<Self> {
        let file_config = match cli.config.as_deref() {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli.into_layer(), file_config, &|key: &str| env::var(key).ok())
    }

    /// Merge two override layers (`upper` wins) over `lookup` and the defaults.
    pub fn resolve(upper: FileConfig, lower: FileConfig, lookup: Lookup<'_>) -> Result<Self> {
        let rpc_url = layered(upper.rpc_url.or(lower.rpc_url), lookup, "RPC_URL")?
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let rpc_timeout_secs =
            layered(upper.rpc_timeout_secs.or(lower.rpc_timeout_secs), lookup, "RPC_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_RPC_TIMEOUT_SECS);
        let gas_price_ttl_secs = layered(
            upper.gas_price_ttl_secs.or(lower.gas_price_ttl_secs),
            lookup,
            "GAS_PRICE_TTL_SECS",
        )?
        .unwrap_or(DEFAULT_GAS_PRICE_TTL_SECS);
        let gas_refresh_secs =
            layered(upper.gas_refresh_secs.or(lower.gas_refresh_secs), lookup, "GAS_REFRESH_SECS")?
                .unwrap_or(DEFAULT_GAS_REFRESH_SECS);
        let swap_fee_bps = layered(upper.swap_fee_bps.or(lower.swap_fee_bps), lookup, "SWAP_FEE_BPS")?
            .unwrap_or(DEFAULT_SWAP_FEE_BPS);
        let factory_address = layered::<String>(
            upper.factory_address.or(lower.factory_address),
            lookup,
            "FACTORY_ADDRESS",
        )?
        .unwrap_or_else(|| DEFAULT_FACTORY_ADDRESS.to_string());
        let wrapped_native_address = layered::<String>(
            upper.wrapped_native_address.or(lower.wrapped_native_address),
            lookup,
            "WRAPPED_NATIVE_ADDRESS",
        )?
        .unwrap_or_else(|| DEFAULT_WRAPPED_NATIVE_ADDRESS.to_string());
        let wrapped_native_decimals = layered(
            upper.wrapped_native_decimals.or(lower.wrapped_native_decimals),
            lookup,
            "WRAPPED_NATIVE_DECIMALS",
        )?
        .unwrap_or(DEFAULT_WRAPPED_NATIVE_DECIMALS);
        let tokens_file = layered(upper.tokens_file.or(lower.tokens_file), lookup, "TOKENS_FILE")?;
        let api_addr = layered(upper.api_addr.or(lower.api_addr), lookup, "API_ADDR")?
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());

        let config = Self {
            rpc_url,
            rpc_timeout_secs,
            gas_price_ttl_secs,
            gas_refresh_secs,
            swap_fee_bps,
            factory_address: config_address(&factory_address, "factory_address")?,
            wrapped_native_address: config_address(&wrapped_native_address, "wrapped_native_address")?,
            wrapped_native_decimals,
            tokens_file,
            api_addr,
        };
        config.validate()?;
        info!(
            rpc_url = %config.rpc_url,
            ttl_secs = config.gas_price_ttl_secs,
            refresh_secs = config.gas_refresh_secs,
            fee_bps = config.swap_fee_bps,
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gas_refresh_secs == 0 {
            return Err(QuoterError::Config("gas_refresh_secs must be positive".into()));
        }
        if self.gas_price_ttl_secs == 0 {
            return Err(QuoterError::Config("gas_price_ttl_secs must be positive".into()));
        }
        if self.gas_refresh_secs >= self.gas_price_ttl_secs {
            return Err(QuoterError::Config(format!(
                "gas_refresh_secs ({}) must be shorter than gas_price_ttl_secs ({})",
                self.gas_refresh_secs, self.gas_price_ttl_secs
            )));
        }
        if self.swap_fee_bps >= 10_000 {
            return Err(QuoterError::Config(format!(
                "swap_fee_bps must be below 10000, got {}",
                self.swap_fee_bps
            )));
        }
        Ok(())
    }

    pub fn gas_price_ttl(&self) -> Duration {
        Duration::from_secs(self.gas_price_ttl_secs)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.gas_refresh_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Tokens whose decimals are known without a `decimals()` call: the
    /// wrapped native asset plus every entry of `tokens_file`.
    pub fn decimals_overrides(&self) -> Result<HashMap<Address, u8>> {
        let mut overrides = HashMap::new();
        overrides.insert(self.wrapped_native_address, self.wrapped_native_decimals);
        if let Some(path) = &self.tokens_file {
            let entries = load_token_list(path).map_err(|e| QuoterError::Config(e.to_string()))?;
            info!(path = %path, count = entries.len(), "loaded token decimals overrides");
            for entry in entries {
                overrides.insert(entry.address, entry.decimals);
            }
        }
        Ok(overrides)
    }
}
