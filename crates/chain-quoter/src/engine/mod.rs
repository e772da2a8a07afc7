//! Gas price refresh and swap quoting on top of [`ChainDataPort`](crate::chain::ChainDataPort).

pub mod amm;
pub mod gas;
pub mod quoting;

pub use amm::SwapFee;
pub use gas::{GasPriceReader, GasPriceRefresher, RefreshOutcome};
pub use quoting::SwapQuoter;
