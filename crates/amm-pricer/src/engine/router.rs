//! A router instance: its lazily built pool graph and its quote transport.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use alloy_primitives::{Address, U256};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::chain::ChainReader;
use crate::config::{RouterConfig, DEFAULT_LOG_CHUNK_SIZE, DEFAULT_LOG_FETCH_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::engine::graph::{build_pools, LogScan, PoolGraph};
use crate::engine::liquidity::PoolLookup;
use crate::engine::pathfinder::{heuristic_path, path_to_stable};
use crate::engine::quoting::{quote, QuoteStrategy};
use crate::networks::Network;
use crate::types::{Quote, Result, SwapPath};

type GraphCell = Arc<OnceCell<Arc<PoolGraph>>>;

pub struct Router {
    config: RouterConfig,
    network: Network,
    strategy: QuoteStrategy,
    reader: Arc<dyn ChainReader>,
    graph: RwLock<GraphCell>,
    call_timeout: Duration,
    scan: LogScan,
}

impl Router {
    pub fn new(config: RouterConfig, network: Network, reader: Arc<dyn ChainReader>) -> Self {
        let strategy = QuoteStrategy::for_router(config.verified);
        Self {
            config,
            network,
            strategy,
            reader,
            graph: RwLock::new(Arc::new(OnceCell::new())),
            call_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            scan: LogScan {
                chunk_size: DEFAULT_LOG_CHUNK_SIZE,
                concurrency: DEFAULT_LOG_FETCH_CONCURRENCY,
                timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
        }
    }

    /// Bound for every node read: quotes, reserve batches and the graph build.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self.scan.timeout = timeout;
        self
    }

    pub fn with_log_scan(mut self, chunk_size: u64, concurrency: usize) -> Self {
        self.scan.chunk_size = chunk_size;
        self.scan.concurrency = concurrency;
        self
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn label(&self) -> String {
        self.config.display_label()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn strategy(&self) -> QuoteStrategy {
        self.strategy
    }

    /// The pool graph, built on first use. Concurrent first callers share one build; a failed
    /// build leaves the cell empty so the next caller retries.
    pub async fn pools(&self) -> Result<Arc<PoolGraph>> {
        let cell = self.graph.read().unwrap_or_else(PoisonError::into_inner).clone();
        cell.get_or_try_init(|| async {
            build_pools(self.reader.as_ref(), &self.config, self.network, self.scan)
                .await
                .map(Arc::new)
        })
        .await
        .cloned()
    }

    /// Discard the built graph. The next lookup rebuilds it.
    pub fn invalidate_pools(&self) {
        info!(router = %self.config.address, "Invalidating pool graph");
        *self.graph.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(OnceCell::new());
    }

    pub fn is_built(&self) -> bool {
        self.graph.read().unwrap_or_else(PoisonError::into_inner).initialized()
    }

    pub async fn path_to_stable(&self, token: Address, block: Option<u64>) -> Result<SwapPath> {
        let graph = self.pools().await?;
        let lookup = self.lookup(&graph, block);
        let path = path_to_stable(&lookup, token, 0).await?;
        debug!(router = %self.label(), path = ?path.tokens(), "graph-resolved path");
        Ok(path)
    }

    pub async fn deepest_pool(&self, token: Address, block: Option<u64>) -> Result<Option<Address>> {
        let graph = self.pools().await?;
        self.lookup(&graph, block).deepest_pool(token).await
    }

    pub async fn deepest_stable_pool(&self, token: Address, block: Option<u64>) -> Result<Option<Address>> {
        let graph = self.pools().await?;
        self.lookup(&graph, block).deepest_stable_pool(token).await
    }

    fn lookup<'a>(&'a self, graph: &'a PoolGraph, block: Option<u64>) -> PoolLookup<'a> {
        PoolLookup {
            reader: self.reader.as_ref(),
            graph,
            network: self.network,
            block,
            timeout: self.call_timeout,
        }
    }

    pub fn heuristic_path(&self, token_in: Address, token_out: Address, paired_against: Address) -> SwapPath {
        let path = heuristic_path(self.network, &self.config.special_paths, token_in, token_out, paired_against);
        debug!(router = %self.label(), path = ?path.tokens(), "heuristic path");
        path
    }

    pub async fn quote(&self, amount_in: U256, path: &SwapPath, block: Option<u64>) -> Result<Option<Quote>> {
        quote(
            self.reader.as_ref(),
            self.config.address,
            self.strategy,
            amount_in,
            path,
            block,
            self.call_timeout,
        )
        .await
    }
}
