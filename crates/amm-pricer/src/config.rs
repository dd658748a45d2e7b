//! Configuration loading, env vars, CLI flags.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::info;

#[cfg(feature = "cli")]
use clap::Parser;

use crate::networks::Network;
use crate::types::PricingError;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PRICE_CACHE_TTL_SECS: u64 = 36_000;
pub const DEFAULT_PRICE_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_LOG_CHUNK_SIZE: u64 = 200_000;
pub const DEFAULT_LOG_FETCH_CONCURRENCY: usize = 4;

fn default_verified() -> bool {
    true
}

/// One router the engine quotes through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub address: Address,
    /// Factory emitting `PairCreated`. Required to build the pool graph.
    pub factory: Option<Address>,
    #[serde(default)]
    pub label: Option<String>,
    /// Whether the router's ABI is verified. Unverified routers are quoted through a raw
    /// signature call. Verification is not looked up on chain: it defaults to `true` when
    /// omitted, so an unverified fork must be configured with `verified = false`. Every
    /// built-in registry router is verified.
    #[serde(default = "default_verified")]
    pub verified: bool,
    /// First block to scan for `PairCreated`. Searched on chain when absent.
    #[serde(default)]
    pub deploy_block: Option<u64>,
    /// token -> hard-coded path towards a stable.
    #[serde(default)]
    pub special_paths: HashMap<Address, Vec<Address>>,
}

impl RouterConfig {
    pub fn new(address: Address, factory: Address) -> Self {
        Self {
            address,
            factory: Some(factory),
            label: None,
            verified: true,
            deploy_block: None,
            special_paths: HashMap::new(),
        }
    }

    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.address.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rpc_url: Option<String>,
    pub chain: Network,
    pub request_timeout: Duration,
    pub price_cache_ttl: Duration,
    pub price_cache_capacity: usize,
    pub log_chunk_size: u64,
    pub log_fetch_concurrency: usize,
    pub tokens_file: Option<String>,
    pub routers: Vec<RouterConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub rpc_url: Option<String>,
    pub chain: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub price_cache_ttl_secs: Option<u64>,
    pub price_cache_capacity: Option<usize>,
    pub log_chunk_size: Option<u64>,
    pub log_fetch_concurrency: Option<usize>,
    pub tokens_file: Option<String>,
    #[serde(default)]
    pub routers: Vec<RouterConfig>,
}

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliConfig {
    #[arg(long)]
    pub config: Option<String>,
    #[arg(long)]
    pub rpc_url: Option<String>,
    #[arg(long)]
    pub chain: Option<String>,
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
    #[arg(long)]
    pub price_cache_ttl_secs: Option<u64>,
    #[arg(long)]
    pub log_chunk_size: Option<u64>,
    #[arg(long)]
    pub tokens_file: Option<String>,
    /// Token to price. Repeatable.
    #[arg(long = "token")]
    pub tokens: Vec<String>,
    /// Output token. Defaults to the network's USD reference.
    #[arg(long)]
    pub token_out: Option<String>,
    /// Router to quote through. Defaults to the first configured router.
    #[arg(long)]
    pub router: Option<String>,
    /// Historical block. Latest when absent.
    #[arg(long)]
    pub block: Option<u64>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl FileConfig {
    pub fn from_env() -> Self {
        Self {
            rpc_url: env::var("RPC_URL").ok(),
            chain: env::var("CHAIN").ok(),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS"),
            price_cache_ttl_secs: env_parse("PRICE_CACHE_TTL_SECS"),
            price_cache_capacity: env_parse("PRICE_CACHE_CAPACITY"),
            log_chunk_size: env_parse("LOG_CHUNK_SIZE"),
            log_fetch_concurrency: env_parse("LOG_FETCH_CONCURRENCY"),
            tokens_file: env::var("TOKENS_FILE").ok(),
            routers: Vec::new(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| anyhow!("unable to read config {}: {}", path.as_ref().display(), e))?;
        toml::from_str(&contents)
            .map_err(|e| anyhow!("invalid config {}: {}", path.as_ref().display(), e))
    }

    /// Keep every value set here, fill the gaps from `fallback`.
    pub fn or(self, fallback: FileConfig) -> Self {
        Self {
            rpc_url: self.rpc_url.or(fallback.rpc_url),
            chain: self.chain.or(fallback.chain),
            request_timeout_secs: self.request_timeout_secs.or(fallback.request_timeout_secs),
            price_cache_ttl_secs: self.price_cache_ttl_secs.or(fallback.price_cache_ttl_secs),
            price_cache_capacity: self.price_cache_capacity.or(fallback.price_cache_capacity),
            log_chunk_size: self.log_chunk_size.or(fallback.log_chunk_size),
            log_fetch_concurrency: self.log_fetch_concurrency.or(fallback.log_fetch_concurrency),
            tokens_file: self.tokens_file.or(fallback.tokens_file),
            routers: if self.routers.is_empty() { fallback.routers } else { self.routers },
        }
    }
}

impl AppConfig {
    /// Environment variables over defaults.
    pub fn load() -> Result<Self, PricingError> {
        Self::from_file_config(FileConfig::from_env())
    }

    /// TOML file over environment variables over defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let layered = FileConfig::from_path(path)?.or(FileConfig::from_env());
        Ok(Self::from_file_config(layered)?)
    }

    #[cfg(feature = "cli")]
    pub fn from_cli(cli: &CliConfig) -> anyhow::Result<Self> {
        let file_config = match cli.config {
            Some(ref path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        let flags = FileConfig {
            rpc_url: cli.rpc_url.clone(),
            chain: cli.chain.clone(),
            request_timeout_secs: cli.request_timeout_secs,
            price_cache_ttl_secs: cli.price_cache_ttl_secs,
            price_cache_capacity: None,
            log_chunk_size: cli.log_chunk_size,
            log_fetch_concurrency: None,
            tokens_file: cli.tokens_file.clone(),
            routers: Vec::new(),
        };
        Ok(Self::from_file_config(flags.or(file_config).or(FileConfig::from_env()))?)
    }

    pub fn from_file_config(layered: FileConfig) -> Result<Self, PricingError> {
        let chain = match layered.chain {
            Some(ref name) => name.parse::<Network>()?,
            None => Network::Mainnet,
        };
        if layered.rpc_url.is_none() {
            info!("RPC_URL not set. An RPC endpoint is required to query prices.");
        }
        let routers = if layered.routers.is_empty() {
            chain
                .known_routers()
                .iter()
                .map(|known| RouterConfig {
                    label: Some(known.label.to_string()),
                    ..RouterConfig::new(known.router, known.factory)
                })
                .collect()
        } else {
            layered.routers
        };
        for router in &routers {
            if router.factory.is_none() {
                info!(router = %router.address, "No factory configured, pool graph will be unavailable");
            }
        }
        Ok(Self {
            rpc_url: layered.rpc_url,
            chain,
            request_timeout: Duration::from_secs(
                layered.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            price_cache_ttl: Duration::from_secs(
                layered.price_cache_ttl_secs.unwrap_or(DEFAULT_PRICE_CACHE_TTL_SECS),
            ),
            price_cache_capacity: layered.price_cache_capacity.unwrap_or(DEFAULT_PRICE_CACHE_CAPACITY),
            log_chunk_size: layered.log_chunk_size.unwrap_or(DEFAULT_LOG_CHUNK_SIZE),
            log_fetch_concurrency: layered
                .log_fetch_concurrency
                .unwrap_or(DEFAULT_LOG_FETCH_CONCURRENCY),
            tokens_file: layered.tokens_file,
            routers,
        })
    }
}
