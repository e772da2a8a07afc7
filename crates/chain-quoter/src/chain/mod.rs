//! Access to live chain state.
//!
//! The core only depends on [`ChainDataPort`]; [`rpc::JsonRpcChainClient`] is
//! the HTTP JSON-RPC implementation used by the binaries.

pub mod contracts;
pub mod rpc;

use crate::types::{FeeData, Result};
use alloy_primitives::Address;
use async_trait::async_trait;

pub use rpc::JsonRpcChainClient;

/// The three chain primitives the quoter needs.
///
/// Implementations make exactly one attempt per call; retry policy, if any,
/// lives inside the implementation.
#[async_trait]
pub trait ChainDataPort: Send + Sync {
    /// Current fee market data.
    async fn fetch_fee_data(&self) -> Result<FeeData>;

    /// Run a view call with ABI-encoded `calldata` against `contract` and
    /// return the raw return data. [`contracts::read`] is the typed wrapper.
    async fn read_contract(&self, contract: Address, calldata: &[u8]) -> Result<Vec<u8>>;

    /// Cheap liveness check. Never errors, only answers.
    async fn is_reachable(&self) -> bool;
}
