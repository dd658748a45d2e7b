//! ABI surface of the contracts the engine talks to.

use alloy_sol_types::sol;

sol! {
    interface IERC20 {
        function decimals() external view returns (uint8);
    }

    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    interface IUniswapV2Factory {
        event PairCreated(address indexed token0, address indexed token1, address pair, uint256 allPairsLength);
    }

    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }

    interface Multicall3 {
        struct Call {
            address target;
            bytes callData;
        }

        struct CallResult {
            bool success;
            bytes returnData;
        }

        function tryAggregate(bool requireSuccess, Call[] calldata calls) external payable returns (CallResult[] memory returnData);
    }
}

/// Multicall3 is deployed at the same address on every supported chain.
pub const MULTICALL3_ADDRESS: alloy_primitives::Address =
    alloy_primitives::address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Human-readable signature used when the router has no verified ABI.
pub const GET_AMOUNTS_OUT_SIGNATURE: &str = "getAmountsOut(uint256,address[])";
