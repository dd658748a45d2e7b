//! ERC-20 decimals with a process-scoped memo.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use tracing::debug;

use crate::chain::contracts::IERC20;
use crate::chain::ChainReader;
use crate::types::{CallOutcome, ChainError, PricingError, Result, MAX_DECIMALS};

/// Decimals memo keyed by `(token, block)`. Entries are facts about chain history and are
/// inserted once, read many times, and live as long as the process.
#[derive(Debug, Default)]
pub struct TokenMetadata {
    decimals: RwLock<HashMap<(Address, Option<u64>), u8>>,
}

impl TokenMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_decimals(&self, token: &Address, block: Option<u64>) -> Option<u8> {
        self.decimals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(*token, block))
            .copied()
    }

    /// Decimals of `token` at `block`. Tokens without a conforming `decimals()` are
    /// `NonStandardToken`.
    pub async fn decimals<R>(&self, reader: &R, token: Address, block: Option<u64>) -> Result<u8>
    where
        R: ChainReader + ?Sized,
    {
        if let Some(decimals) = self.cached_decimals(&token, block) {
            return Ok(decimals);
        }
        let decimals = match raw_decimals(reader, token, block).await {
            Ok(CallOutcome::Success(decimals)) => decimals,
            Ok(CallOutcome::Reverted) | Ok(CallOutcome::Overflowed) => {
                debug!(%token, "decimals() missing or non-conforming");
                return Err(PricingError::NonStandardToken(token));
            }
            Err(ChainError::MissingHistoricalState(_)) => {
                return Err(PricingError::MissingHistoricalState { block })
            }
            Err(e) => return Err(e.into()),
        };
        self.decimals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((token, block))
            .or_insert(decimals);
        Ok(decimals)
    }

    pub fn len(&self) -> usize {
        self.decimals.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw `decimals()` call. Reverts and empty returns are `Reverted`, a word above
/// [`MAX_DECIMALS`] is `Overflowed`. Transport failures stay errors.
pub async fn raw_decimals<R>(
    reader: &R,
    token: Address,
    block: Option<u64>,
) -> std::result::Result<CallOutcome<u8>, ChainError>
where
    R: ChainReader + ?Sized,
{
    let data = IERC20::decimalsCall {}.abi_encode();
    match reader.call(token, data.into(), block).await {
        Ok(bytes) => Ok(decode_decimals_word(&bytes)),
        Err(ChainError::Reverted(_)) | Err(ChainError::OutOfGas) => Ok(CallOutcome::Reverted),
        Err(e) => Err(e),
    }
}

fn decode_decimals_word(bytes: &[u8]) -> CallOutcome<u8> {
    if bytes.len() < 32 {
        return CallOutcome::Reverted;
    }
    let word = U256::from_be_slice(&bytes[..32]);
    if word > U256::from(MAX_DECIMALS) {
        CallOutcome::Overflowed
    } else {
        CallOutcome::Success(word.to::<u8>())
    }
}
