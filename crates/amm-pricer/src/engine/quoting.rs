//! `getAmountsOut` quoting through a router.

use std::time::Duration;

use alloy_primitives::{keccak256, Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use tracing::debug;

use crate::chain::contracts::{IUniswapV2Router02, GET_AMOUNTS_OUT_SIGNATURE};
use crate::chain::{with_timeout, ChainReader};
use crate::types::{ChainError, PricingError, Quote, Result, SwapPath};

/// How a router is called. Picked once per router from its verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStrategy {
    /// Typed call through the router's known interface.
    Typed,
    /// Selector derived from the textual signature plus hand-encoded arguments.
    Raw,
}

impl QuoteStrategy {
    pub fn for_router(verified: bool) -> Self {
        if verified {
            QuoteStrategy::Typed
        } else {
            QuoteStrategy::Raw
        }
    }

    pub fn encode(&self, amount_in: U256, path: &SwapPath) -> Bytes {
        match self {
            QuoteStrategy::Typed => IUniswapV2Router02::getAmountsOutCall {
                amountIn: amount_in,
                path: path.tokens().to_vec(),
            }
            .abi_encode()
            .into(),
            QuoteStrategy::Raw => {
                let hash = keccak256(GET_AMOUNTS_OUT_SIGNATURE);
                let mut data = hash[..4].to_vec();
                data.extend((amount_in, path.tokens().to_vec()).abi_encode_params());
                data.into()
            }
        }
    }

    pub fn decode(&self, data: &[u8]) -> std::result::Result<Vec<U256>, ChainError> {
        let decoded = match self {
            QuoteStrategy::Typed => IUniswapV2Router02::getAmountsOutCall::abi_decode_returns(data, true)
                .map(|ret| ret.amounts),
            QuoteStrategy::Raw => <Vec<U256>>::abi_decode(data, true),
        };
        decoded.map_err(|e| ChainError::Decode(e.to_string()))
    }
}

/// Quote `amount_in` along `path` at `block`.
///
/// `Ok(None)` when the router answers with a malformed amounts sequence, which some forks do
/// for paths they do not support. Any other failure is `QuoteFailed`.
pub async fn quote(
    reader: &dyn ChainReader,
    router: Address,
    strategy: QuoteStrategy,
    amount_in: U256,
    path: &SwapPath,
    block: Option<u64>,
    timeout: Duration,
) -> Result<Option<Quote>> {
    let data = strategy.encode(amount_in, path);
    let raw = match with_timeout(timeout, reader.call(router, data, block)).await {
        Ok(raw) => raw,
        Err(e) if e.is_malformed_sequence() => {
            debug!(%router, "Sequence has incorrect length, no quote");
            return Ok(None);
        }
        Err(reason) => return Err(PricingError::QuoteFailed { reason }),
    };
    match strategy.decode(&raw) {
        Ok(amounts) if amounts.len() == path.tokens().len() => Ok(Some(Quote { amounts })),
        Ok(amounts) => {
            debug!(%router, expected = path.tokens().len(), got = amounts.len(), "amounts length mismatch, no quote");
            Ok(None)
        }
        Err(e) => {
            debug!(%router, "undecodable getAmountsOut return: {}", e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> SwapPath {
        SwapPath::pair(Address::repeat_byte(1), Address::repeat_byte(2))
    }

    #[test]
    fn test_raw_and_typed_encodings_agree() {
        let amount = U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(QuoteStrategy::Typed.encode(amount, &path()), QuoteStrategy::Raw.encode(amount, &path()));
    }

    #[test]
    fn test_raw_and_typed_decodings_agree() {
        let amounts = vec![U256::from(1u64), U256::from(2u64)];
        let data = IUniswapV2Router02::getAmountsOutCall::abi_encode_returns(&(amounts.clone(),));
        assert_eq!(QuoteStrategy::Typed.decode(&data).unwrap(), amounts);
        assert_eq!(QuoteStrategy::Raw.decode(&data).unwrap(), amounts);
    }

    #[test]
    fn test_strategy_follows_verification() {
        assert_eq!(QuoteStrategy::for_router(true), QuoteStrategy::Typed);
        assert_eq!(QuoteStrategy::for_router(false), QuoteStrategy::Raw);
    }
}
