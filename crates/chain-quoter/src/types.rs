//! Common types, enums, error handling, data models.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common error type for the chain-quoter system.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuoterError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Pair does not exist for {token_a} / {token_b}")]
    PairNotFound { token_a: Address, token_b: Address },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Chain unreachable: {0}")]
    ChainUnreachable(String),

    #[error("RPC call {method} failed: {message}")]
    RpcCallFailed { method: String, message: String },

    #[error("Config error: {0}")]
    Config(String),
}

impl QuoterError {
    pub fn rpc<M: Into<String>, S: Into<String>>(method: M, message: S) -> Self {
        Self::RpcCallFailed {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Coarse bucket used for logging and status mapping.
    pub fn category(&self) -> &'static str {
        match self {
            QuoterError::InvalidAddress(_) | QuoterError::InvalidAmount(_) => "validation",
            QuoterError::PairNotFound { .. } | QuoterError::InsufficientLiquidity => "business",
            QuoterError::ChainUnreachable(_) | QuoterError::RpcCallFailed { .. } => "upstream",
            QuoterError::Config(_) => "config",
        }
    }

    /// Validation failures and business rejections are the caller's problem;
    /// everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self.category(), "validation" | "business")
    }
}

pub type Result<T> = std::result::Result<T, QuoterError>;

/// Fee data as reported by the chain. Any field may be missing, e.g. on
/// chains without an EIP-1559 fee market.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeData {
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

/// The single gas price observation held by the cache.
///
/// All fee fields are always populated: missing upstream values are stored as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPriceSnapshot {
    /// Network gas price (the base fee equivalent), in wei.
    pub gas_price: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub captured_at: DateTime<Utc>,
}

impl GasPriceSnapshot {
    pub fn from_fee_data(fee_data: FeeData, captured_at: DateTime<Utc>) -> Self {
        Self {
            gas_price: fee_data.gas_price.unwrap_or(U256::ZERO),
            max_fee_per_gas: fee_data.max_fee_per_gas.unwrap_or(U256::ZERO),
            max_priority_fee_per_gas: fee_data.max_priority_fee_per_gas.unwrap_or(U256::ZERO),
            captured_at,
        }
    }
}

/// Reserves of a UniswapV2 pair oriented for one swap direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveState {
    pub pair_address: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub reserve_in: U256,
    pub reserve_out: U256,
    pub decimals_in: u8,
    pub decimals_out: u8,
}

/// Result of a single swap quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteResult {
    pub from_token: Address,
    pub to_token: Address,
    /// Human-scale input, normalised (e.g. `"1.50"` becomes `"1.5"`).
    pub amount_in: String,
    /// Human-scale output, exact.
    pub amount_out: String,
    pub price_impact_pct: Decimal,
    pub timestamp: DateTime<Utc>,
}

// Wire payloads. Fee values and amounts are strings so large integers survive JSON.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceResponse {
    pub gas_price: String,
    pub max_fee_per_gas: String,
    pub max_priority_fee_per_gas: String,
    pub timestamp: i64,
}

impl From<&GasPriceSnapshot> for GasPriceResponse {
    fn from(snapshot: &GasPriceSnapshot) -> Self {
        Self {
            gas_price: snapshot.gas_price.to_string(),
            max_fee_per_gas: snapshot.max_fee_per_gas.to_string(),
            max_priority_fee_per_gas: snapshot.max_priority_fee_per_gas.to_string(),
            timestamp: snapshot.captured_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub from_token_address: String,
    pub to_token_address: String,
    /// Input as quoted: truncated to the token's decimals and normalised, so
    /// `"1.2345678"` at 6 decimals comes back as `"1.234567"`.
    pub amount_in: String,
    pub amount_out: String,
    pub price_impact: String,
    pub timestamp: i64,
}

impl From<&QuoteResult> for QuoteResponse {
    fn from(quote: &QuoteResult) -> Self {
        Self {
            from_token_address: quote.from_token.to_string(),
            to_token_address: quote.to_token.to_string(),
            amount_in: quote.amount_in.clone(),
            amount_out: quote.amount_out.clone(),
            price_impact: quote.price_impact_pct.to_string(),
            timestamp: quote.timestamp.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fee_fields_become_zero() {
        let fee_data = FeeData {
            gas_price: Some(U256::from(20_000_000_000u64)),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        };
        let snapshot = GasPriceSnapshot::from_fee_data(fee_data, Utc::now());
        assert_eq!(snapshot.gas_price, U256::from(20_000_000_000u64));
        assert_eq!(snapshot.max_fee_per_gas, U256::ZERO);
        assert_eq!(snapshot.max_priority_fee_per_gas, U256::ZERO);
    }

    #[test]
    fn gas_response_renders_strings() {
        let big = U256::from(u128::MAX) * U256::from(1000u64);
        let snapshot = GasPriceSnapshot {
            gas_price: big,
            max_fee_per_gas: U256::from(30_000_000_000u64),
            max_priority_fee_per_gas: U256::from(2_000_000_000u64),
            captured_at: Utc::now(),
        };
        let json = serde_json::to_value(GasPriceResponse::from(&snapshot)).unwrap();
        assert_eq!(json["gasPrice"], serde_json::Value::String(big.to_string()));
        assert_eq!(json["maxFeePerGas"], "30000000000");
        assert_eq!(json["maxPriorityFeePerGas"], "2000000000");
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn error_categories() {
        assert!(QuoterError::InvalidAmount("0".into()).is_client_error());
        assert!(QuoterError::InsufficientLiquidity.is_client_error());
        assert!(!QuoterError::ChainUnreachable("down".into()).is_client_error());
        assert!(!QuoterError::rpc("eth_call", "reverted").is_client_error());
        assert_eq!(QuoterError::Config("x".into()).category(), "config");
    }
}
