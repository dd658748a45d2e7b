//! Pool graph built from factory `PairCreated` logs.

use std::time::Duration;

use alloy_primitives::Address;
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::chain::logs::{decode_pair_created, fetch_logs_chunked, pair_created_topic};
use crate::chain::{contract_creation_block, with_timeout, ChainReader};
use crate::config::RouterConfig;
use crate::networks::Network;
use crate::types::{Pool, PricingError, Result};

/// token -> {pool -> counterparty token}. Insertion order is kept so candidate iteration,
/// and with it tie-breaking, is deterministic.
#[derive(Debug, Clone, Default)]
pub struct PoolGraph {
    pools: IndexMap<Address, Pool>,
    mapping: IndexMap<Address, IndexMap<Address, Address>>,
}

impl PoolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pools<I: IntoIterator<Item = Pool>>(pools: I) -> Self {
        let mut graph = Self::new();
        for pool in pools {
            graph.add_pool(pool);
        }
        graph
    }

    /// Register `pool` under both of its tokens.
    pub fn add_pool(&mut self, pool: Pool) {
        self.pools.insert(pool.address, pool);
        self.mapping.entry(pool.token0).or_default().insert(pool.address, pool.token1);
        self.mapping.entry(pool.token1).or_default().insert(pool.address, pool.token0);
    }

    /// Pools holding `token`, with the token on the other side.
    pub fn candidates(&self, token: &Address) -> Option<&IndexMap<Address, Address>> {
        self.mapping.get(token)
    }

    pub fn counterparty(&self, token: &Address, pool: &Address) -> Option<Address> {
        self.mapping.get(token).and_then(|pools| pools.get(pool)).copied()
    }

    pub fn pool(&self, address: &Address) -> Option<&Pool> {
        self.pools.get(address)
    }

    pub fn token_count(&self) -> usize {
        self.mapping.len()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }
}

/// Log scan settings for [`build_pools`]. `timeout` bounds every node read of the build.
#[derive(Debug, Clone, Copy)]
pub struct LogScan {
    pub chunk_size: u64,
    pub concurrency: usize,
    pub timeout: Duration,
}

/// Replay every `PairCreated` emitted by the router's factory into a [`PoolGraph`].
///
/// Expensive: scans from the factory's deployment block to the head.
pub async fn build_pools(
    reader: &dyn ChainReader,
    router: &RouterConfig,
    network: Network,
    scan: LogScan,
) -> Result<PoolGraph> {
    let unavailable = |reason: String| PricingError::GraphUnavailable { router: router.address, reason };
    let factory = router.factory.ok_or_else(|| unavailable("factory address not configured".into()))?;
    let label = router.display_label();
    info!(
        "Fetching pools for {} on {}. This scans every pool creation since the factory was deployed and can take a while.",
        label, network
    );

    let to_block = with_timeout(scan.timeout, reader.block_number())
        .await
        .map_err(|e| unavailable(e.to_string()))?;
    let from_block = match router.deploy_block {
        Some(block) => block,
        None => contract_creation_block(reader, factory, scan.timeout)
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .unwrap_or(0),
    };

    let logs = fetch_logs_chunked(
        reader,
        factory,
        pair_created_topic(),
        from_block,
        to_block,
        scan.chunk_size,
        scan.concurrency,
        scan.timeout,
    )
    .await
    .map_err(|e| unavailable(e.to_string()))?;

    let mut graph = PoolGraph::new();
    for log in &logs {
        match decode_pair_created(log) {
            Ok(pool) => graph.add_pool(pool),
            Err(e) => warn!(%factory, "Skipping undecodable PairCreated log: {}", e),
        }
    }
    info!("Loaded {} tokens on {}", graph.token_count(), label);
    Ok(graph)
}
