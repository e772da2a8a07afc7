//! Single-pair UniswapV2 quotes computed from live reserves.

use super::amm::{self, SwapFee};
use crate::chain::contracts::{self, IUniswapV2Factory, IUniswapV2Pair, IERC20};
use crate::chain::ChainDataPort;
use crate::config::AppConfig;
use crate::types::{QuoteResult, QuoterError, ReserveState, Result};
use crate::utils::parse_address;
use alloy_primitives::{Address, U256};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Quotes swaps against the pair a UniswapV2 factory reports for two tokens.
///
/// Holds no mutable state; every quote reads the chain afresh.
pub struct SwapQuoter<P> {
    port: Arc<P>,
    factory: Address,
    decimals_overrides: HashMap<Address, u8>,
    fee: SwapFee,
}

impl<P> Clone for SwapQuoter<P> {
    fn clone(&self) -> Self {
        Self {
            port: self.port.clone(),
            factory: self.factory,
            decimals_overrides: self.decimals_overrides.clone(),
            fee: self.fee,
        }
    }
}

impl<P: ChainDataPort> SwapQuoter<P> {
    pub fn new(port: Arc<P>, factory: Address, decimals_overrides: HashMap<Address, u8>, fee: SwapFee) -> Self {
        Self {
            port,
            factory,
            decimals_overrides,
            fee,
        }
    }

    pub fn from_config(port: Arc<P>, config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            port,
            config.factory_address,
            config.decimals_overrides()?,
            SwapFee::from_bps(config.swap_fee_bps)?,
        ))
    }

    /// Quote with string addresses, as received from the outside world.
    pub async fn quote_str(&self, from: &str, to: &str, amount_in: &str) -> Result<QuoteResult> {
        let from = parse_address(from)?;
        let to = parse_address(to)?;
        self.quote(from, to, amount_in).await
    }

    /// Expected output and price impact of selling `amount_in` (human units)
    /// of `from` for `to`.
    pub async fn quote(&self, from: Address, to: Address, amount_in: &str) -> Result<QuoteResult> {
        debug!(%from, %to, amount_in, "quoting swap");
        let result = self.compute(from, to, amount_in).await;
        if let Err(e) = &result {
            if !e.is_client_error() {
                error!(%from, %to, amount_in, error = %e, "swap quote failed");
            }
        }
        result
    }

    async fn compute(&self, from: Address, to: Address, amount_in: &str) -> Result<QuoteResult> {
        amm::check_human(amount_in)?;
        let state = self.fetch_reserves(from, to).await?;

        let raw_in = amm::to_raw(amount_in, state.decimals_in)?;
        let reserve_in = amm::u256_to_biguint(&state.reserve_in);
        let reserve_out = amm::u256_to_biguint(&state.reserve_out);

        let raw_out = amm::get_amount_out(&raw_in, &reserve_in, &reserve_out, self.fee)?;
        let price_impact_pct = amm::price_impact_pct(&raw_in, &raw_out, &reserve_in, &reserve_out)?;

        Ok(QuoteResult {
            from_token: from,
            to_token: to,
            amount_in: amm::to_human(&raw_in, state.decimals_in),
            amount_out: amm::to_human(&raw_out, state.decimals_out),
            price_impact_pct,
            timestamp: Utc::now(),
        })
    }

    /// Resolve the pair for `from`/`to` and read its reserves oriented for a
    /// `from -> to` swap.
    ///
    /// Both reserves come from one `getReserves()` call. `token0`/`token1`
    /// never change for a deployed pair. Decimals are read afterwards and are
    /// not tied to the same block.
    pub async fn fetch_reserves(&self, from: Address, to: Address) -> Result<ReserveState> {
        let port = self.port.as_ref();
        let get_pair = IUniswapV2Factory::getPairCall { tokenA: from, tokenB: to };
        let pair_address = contracts::read(port, self.factory, get_pair).await?.pair;
        if pair_address == Address::ZERO {
            return Err(QuoterError::PairNotFound { token_a: from, token_b: to });
        }

        let (reserves, token0, token1) = tokio::try_join!(
            contracts::read(port, pair_address, IUniswapV2Pair::getReservesCall {}),
            contracts::read(port, pair_address, IUniswapV2Pair::token0Call {}),
            contracts::read(port, pair_address, IUniswapV2Pair::token1Call {}),
        )?;
        let (token0, token1) = (token0._0, token1._0);
        let reserve0 = U256::from(reserves.reserve0);
        let reserve1 = U256::from(reserves.reserve1);
        if from != token0 && from != token1 {
            warn!(%pair_address, %from, %token0, %token1, "pair does not list the input token, treating it as token1");
        }

        let (decimals_in, decimals_out) = tokio::try_join!(self.token_decimals(from), self.token_decimals(to))?;

        let (reserve_in, reserve_out) = if from == token0 { (reserve0, reserve1) } else { (reserve1, reserve0) };
        debug!(%pair_address, %reserve_in, %reserve_out, decimals_in, decimals_out, "pair reserves");

        Ok(ReserveState {
            pair_address,
            token_in: from,
            token_out: to,
            reserve_in,
            reserve_out,
            decimals_in,
            decimals_out,
        })
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        if let Some(decimals) = self.decimals_overrides.get(&token) {
            return Ok(*decimals);
        }
        Ok(contracts::read(self.port.as_ref(), token, IERC20::decimalsCall {}).await?._0)
    }
}
