pub mod graph;
pub mod liquidity;
pub mod pathfinder;
pub mod quoting;
pub mod router;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy_primitives::Address;
use futures::future::join_all;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::cache::{CacheMetrics, PriceCache, PriceCacheKey};
use crate::chain::ChainReader;
use crate::config::{
    AppConfig, RouterConfig, DEFAULT_LOG_CHUNK_SIZE, DEFAULT_LOG_FETCH_CONCURRENCY, DEFAULT_PRICE_CACHE_CAPACITY,
    DEFAULT_PRICE_CACHE_TTL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::metadata::TokenMetadata;
use crate::networks::Network;
use crate::types::{u256_to_f64, ChainError, PricingError, Result, Token};

pub use graph::PoolGraph;
pub use router::Router;

/// Prices tokens by quoting a unit swap through a router towards a USD reference.
pub struct PriceEngine {
    network: Network,
    reader: Arc<dyn ChainReader>,
    routers: IndexMap<Address, Arc<Router>>,
    metadata: TokenMetadata,
    cache: Mutex<PriceCache>,
    call_timeout: Duration,
    log_chunk_size: u64,
    log_fetch_concurrency: usize,
}

impl PriceEngine {
    pub fn new(network: Network, reader: Arc<dyn ChainReader>) -> Self {
        Self {
            network,
            reader,
            routers: IndexMap::new(),
            metadata: TokenMetadata::new(),
            cache: Mutex::new(PriceCache::new(
                DEFAULT_PRICE_CACHE_CAPACITY,
                Duration::from_secs(DEFAULT_PRICE_CACHE_TTL_SECS),
            )),
            call_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_chunk_size: DEFAULT_LOG_CHUNK_SIZE,
            log_fetch_concurrency: DEFAULT_LOG_FETCH_CONCURRENCY,
        }
    }

    pub fn from_config(config: &AppConfig, reader: Arc<dyn ChainReader>) -> Self {
        let mut engine = Self {
            network: config.chain,
            reader,
            routers: IndexMap::new(),
            metadata: TokenMetadata::new(),
            cache: Mutex::new(PriceCache::new(config.price_cache_capacity, config.price_cache_ttl)),
            call_timeout: config.request_timeout,
            log_chunk_size: config.log_chunk_size,
            log_fetch_concurrency: config.log_fetch_concurrency,
        };
        for router in &config.routers {
            engine.add_router(router.clone());
        }
        engine
    }

    /// Register a router with the engine's timeout and log scan settings. Replaces any router
    /// already known at the same address.
    pub fn add_router(&mut self, config: RouterConfig) -> Arc<Router> {
        let router = Arc::new(
            Router::new(config, self.network, self.reader.clone())
                .with_call_timeout(self.call_timeout)
                .with_log_scan(self.log_chunk_size, self.log_fetch_concurrency),
        );
        self.routers.insert(router.address(), router.clone());
        router
    }

    /// Timeout applied to routers registered after this call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Log scan settings applied to routers registered after this call.
    pub fn with_log_scan(mut self, chunk_size: u64, concurrency: usize) -> Self {
        self.log_chunk_size = chunk_size;
        self.log_fetch_concurrency = concurrency;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn router(&self, address: &Address) -> Result<&Arc<Router>> {
        self.routers.get(address).ok_or(PricingError::UnknownRouter(*address))
    }

    pub fn routers(&self) -> impl Iterator<Item = &Arc<Router>> {
        self.routers.values()
    }

    /// First registered router, the default for callers that do not pick one.
    pub fn default_router(&self) -> Option<Address> {
        self.routers.keys().next().copied()
    }

    /// Build a router's pool graph ahead of the first lookup.
    pub async fn build_pools(&self, router: &Address) -> Result<Arc<PoolGraph>> {
        self.router(router)?.pools().await
    }

    /// Discard a router's pool graph and the latest-block prices computed through it.
    pub fn invalidate_pools(&self, router: &Address) -> Result<()> {
        self.router(router)?.invalidate_pools();
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).invalidate_router(router);
        Ok(())
    }

    /// Price of one `token_in` in `token_out` (default: the network's USD reference).
    ///
    /// `Ok(None)` is an explicit absence: no quote could be produced for an otherwise
    /// well-formed request. Pipeline failures are returned as errors.
    pub async fn try_get_price(
        &self,
        router: &Address,
        token_in: Address,
        block: Option<u64>,
        token_out: Option<Address>,
        paired_against: Option<Address>,
    ) -> Result<Option<f64>> {
        let router = self.router(router)?;
        let token_out = self.network.resolve_token_out(token_out);
        if self.network.is_stable(&token_in) {
            return Ok(Some(1.0));
        }

        let key = PriceCacheKey { router: router.address(), token_in, block, token_out };
        if let Some(price) = self.cache.lock().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return Ok(Some(price));
        }

        let decimals_in = self.decimals(token_in, block).await?;

        let mut path = None;
        if self.network.is_stable(&token_out) {
            match router.path_to_stable(token_in, block).await {
                Ok(found) => path = Some(found),
                Err(PricingError::NoPathFound(_)) => {
                    debug!(token = %token_in, "no graph path to a stable, using heuristic path")
                }
                Err(e) => return Err(e),
            }
        }
        let path = match path {
            Some(path) => path,
            None => router.heuristic_path(
                token_in,
                token_out,
                paired_against.unwrap_or_else(|| self.network.wrapped_gas_coin()),
            ),
        };

        let fees = path.fee_factor();
        let amount_in = Token::new(token_in, decimals_in)
            .scale()
            .ok_or(PricingError::NonStandardToken(token_in))?;
        let quote = match router.quote(amount_in, &path, block).await {
            Ok(Some(quote)) => quote,
            Ok(None) => return Ok(None),
            Err(PricingError::QuoteFailed { reason: ChainError::Reverted(msg) }) => {
                debug!(router = %router.label(), path = ?path.tokens(), "quote reverted: {}", msg);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let Some(amount_out) = quote.amount_out().filter(|amount| !amount.is_zero()) else {
            return Ok(None);
        };

        let decimals_out = self.decimals(path.last(), block).await?;
        let price = u256_to_f64(amount_out) / 10f64.powi(i32::from(decimals_out)) / fees;
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).insert(key, price);
        Ok(Some(price))
    }

    /// Like [`Self::try_get_price`] but every failure becomes `None`.
    pub async fn get_price(
        &self,
        router: &Address,
        token_in: Address,
        block: Option<u64>,
        token_out: Option<Address>,
        paired_against: Option<Address>,
    ) -> Option<f64> {
        match self.try_get_price(router, token_in, block, token_out, paired_against).await {
            Ok(price) => price,
            Err(e) => {
                warn!(token = %token_in, ?block, "price unavailable: {}", e);
                None
            }
        }
    }

    /// Prices for `tokens` in the default output token, looked up concurrently, in input order.
    pub async fn get_prices(&self, router: &Address, tokens: &[Address], block: Option<u64>) -> Vec<Option<f64>> {
        join_all(tokens.iter().map(|token| self.get_price(router, *token, block, None, None))).await
    }

    pub async fn decimals(&self, token: Address, block: Option<u64>) -> Result<u8> {
        bounded(self.call_timeout, self.metadata.decimals(self.reader.as_ref(), token, block)).await
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).metrics()
    }

    pub fn purge_expired_prices(&self) {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).purge_expired();
    }
}

async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout(limit).into()),
    }
}
