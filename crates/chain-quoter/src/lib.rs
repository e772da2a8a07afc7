//! Library entry point for chain-quoter: a warm gas price cache and
//! UniswapV2 swap quotes read from live chain state.

pub mod cache;
pub mod chain;
pub mod config;
pub mod engine;
pub mod types;
pub mod utils;

#[cfg(feature = "api")]
pub mod api;

#[cfg(test)]
mod tests;

pub use alloy_primitives::{Address, U256};
pub use cache::GasPriceCache;
pub use chain::{ChainDataPort, JsonRpcChainClient};
pub use config::AppConfig;
pub use engine::{GasPriceReader, GasPriceRefresher, RefreshOutcome, SwapFee, SwapQuoter};
pub use types::{GasPriceSnapshot, QuoteResult, QuoterError, Result};
