//! Typed bindings for the view calls the quoter makes.

use super::ChainDataPort;
use crate::types::{QuoterError, Result};
use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall};

sol! {
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

sol! {
    #[derive(Debug)]
    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }
}

sol! {
    interface IERC20 {
        function decimals() external view returns (uint8);
    }
}

/// Encode `call`, run it against `contract` and decode what comes back.
///
/// Return data is decoded in validating mode: an address word with dirty
/// high bytes or a `uint8` above 255 is an `RpcCallFailed`, never truncated.
pub async fn read<P, C>(port: &P, contract: Address, call: C) -> Result<C::Return>
where
    P: ChainDataPort + ?Sized,
    C: SolCall,
{
    let calldata = call.abi_encode();
    let output = port.read_contract(contract, &calldata).await?;
    C::abi_decode_returns(&output, true)
        .map_err(|e| QuoterError::rpc(C::SIGNATURE, format!("{} returned undecodable data: {}", contract, e)))
}
