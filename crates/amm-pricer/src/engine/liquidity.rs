//! Reserve-weighted pool selection.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use tracing::{debug, warn};

use crate::chain::contracts::IUniswapV2Pair;
use crate::chain::{with_timeout, BatchCall, ChainReader};
use crate::engine::graph::PoolGraph;
use crate::networks::Network;
use crate::types::{ChainError, PricingError, Result};

/// Everything a single lookup reads against: one graph, one block.
#[derive(Clone, Copy)]
pub struct PoolLookup<'a> {
    pub reader: &'a dyn ChainReader,
    pub graph: &'a PoolGraph,
    pub network: Network,
    pub block: Option<u64>,
    pub timeout: Duration,
}

impl<'a> PoolLookup<'a> {
    /// Pool holding the most of `token`. The wrapped gas coin only considers stable pairs.
    ///
    /// Reserves are compared as raw integers without decimal normalization, which compares
    /// token-unit depth rather than value depth.
    pub async fn deepest_pool(&self, token: Address) -> Result<Option<Address>> {
        if token == self.network.wrapped_gas_coin() {
            return self.deepest_stable_pool(token).await;
        }
        let Some(candidates) = self.graph.candidates(&token) else {
            return Ok(None);
        };
        self.select_deepest(token, candidates.keys().copied().collect()).await
    }

    /// Like [`Self::deepest_pool`] but only over pools paired against a stable.
    pub async fn deepest_stable_pool(&self, token: Address) -> Result<Option<Address>> {
        let Some(candidates) = self.graph.candidates(&token) else {
            return Ok(None);
        };
        let stable_pools = candidates
            .iter()
            .filter(|(_, paired_with)| self.network.is_stable(paired_with))
            .map(|(pool, _)| *pool)
            .collect();
        self.select_deepest(token, stable_pools).await
    }

    async fn select_deepest(&self, token: Address, pools: Vec<Address>) -> Result<Option<Address>> {
        if pools.is_empty() {
            return Ok(None);
        }
        let call_data = IUniswapV2Pair::getReservesCall {}.abi_encode();
        let calls = pools.iter().map(|pool| BatchCall::new(*pool, call_data.clone())).collect();
        let results = with_timeout(self.timeout, self.reader.batch(calls, self.block))
            .await
            .map_err(|e| self.chain_error(e))?;

        let mut deepest = None;
        let mut deepest_balance = U256::ZERO;
        for (pool, result) in pools.iter().zip(results) {
            let Some(bytes) = result else {
                debug!(%pool, "reserve read failed, excluding pool");
                continue;
            };
            let reserves = match IUniswapV2Pair::getReservesCall::abi_decode_returns(&bytes, true) {
                Ok(reserves) => reserves,
                Err(e) => {
                    warn!(%pool, "undecodable getReserves() return: {}", e);
                    continue;
                }
            };
            let Some(record) = self.graph.pool(pool) else { continue };
            let reserve = if record.token0 == token {
                U256::from(reserves.reserve0)
            } else {
                U256::from(reserves.reserve1)
            };
            if reserve > deepest_balance {
                deepest = Some(*pool);
                deepest_balance = reserve;
            }
        }
        Ok(deepest)
    }

    pub(crate) fn chain_error(&self, e: ChainError) -> PricingError {
        match e {
            ChainError::MissingHistoricalState(_) => {
                PricingError::MissingHistoricalState { block: self.block }
            }
            other => PricingError::Chain(other),
        }
    }
}
