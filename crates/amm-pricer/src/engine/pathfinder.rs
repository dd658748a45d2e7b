//! Swap path selection: graph-resolved routes to a stable and the fixed heuristic fallback.

use std::collections::HashMap;

use alloy_primitives::Address;
use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::engine::liquidity::PoolLookup;
use crate::networks::Network;
use crate::types::{PricingError, Result, SwapPath};

/// Recursion ceiling for [`path_to_stable`]. The deepest-pool walk can cycle.
pub const MAX_PATH_DEPTH: usize = 10;

/// Walk from `token` along its deepest pools until a stable is reached.
///
/// Tried in order: a deepest pool that is also the deepest stable pool completes the path;
/// a deepest pool against an intermediary recurses through that intermediary; on chains with
/// a router-native token, a deepest pool against it completes through the native token's
/// deepest stable pool; otherwise the counterparty is peeled off and resolved recursively.
pub fn path_to_stable<'a>(
    lookup: &'a PoolLookup<'a>,
    token: Address,
    depth: usize,
) -> BoxFuture<'a, Result<SwapPath>> {
    async move {
        if depth > MAX_PATH_DEPTH {
            debug!(%token, depth, "path search exceeded depth ceiling");
            return Err(PricingError::NoPathFound(token));
        }
        let Some(deepest) = lookup.deepest_pool(token).await? else {
            return Err(PricingError::NoPathFound(token));
        };
        let deepest_stable = lookup.deepest_stable_pool(token).await?;
        let paired_with = lookup
            .graph
            .counterparty(&token, &deepest)
            .ok_or(PricingError::NoPathFound(token))?;

        if deepest_stable == Some(deepest) {
            return Ok(SwapPath::pair(token, paired_with));
        }

        if lookup.network.intermediaries().contains(&paired_with) {
            return match path_to_stable(lookup, paired_with, depth + 1).await {
                Ok(path) => Ok(path.prepend(token)),
                Err(PricingError::NoPathFound(_)) => Err(PricingError::NoPathFound(token)),
                Err(e) => Err(e),
            };
        }

        if Some(paired_with) == lookup.network.router_native_intermediary() {
            if let Some(pool) = lookup.deepest_stable_pool(paired_with).await? {
                if let Some(stable) = lookup.graph.counterparty(&paired_with, &pool) {
                    return Ok(SwapPath::pair(token, paired_with).append(stable));
                }
            }
        }

        let path = path_to_stable(lookup, paired_with, depth + 1).await?;
        Ok(path.prepend(token))
    }
    .boxed()
}

/// Fixed, network-convention path used when the graph yields nothing.
pub fn heuristic_path(
    network: Network,
    special_paths: &HashMap<Address, Vec<Address>>,
    token_in: Address,
    token_out: Address,
    paired_against: Address,
) -> SwapPath {
    let weth = network.weth();
    let gas_coin = network.wrapped_gas_coin();
    let either_leg = |token: Address| token_in == token || token_out == token;

    if network.is_stable(&paired_against) && network.is_stable(&token_out) {
        return SwapPath::pair(token_in, paired_against);
    }
    if either_leg(weth) {
        return SwapPath::pair(token_in, token_out);
    }
    if let Some(router_token) = network.router_token() {
        if paired_against == router_token && token_out != router_token {
            return SwapPath::pair(token_in, router_token).append(weth).append(token_out);
        }
    }
    if network.is_stable(&token_out) {
        if let Some(path) = special_paths.get(&token_in).and_then(|p| SwapPath::new(p.clone())) {
            return path;
        }
    }
    if let Some(native) = network.router_native_intermediary() {
        if either_leg(native) {
            return SwapPath::pair(token_in, token_out);
        }
    }
    if either_leg(gas_coin) {
        SwapPath::pair(token_in, token_out)
    } else {
        SwapPath::pair(token_in, gas_coin).append(token_out)
    }
}
