//! In-memory chain for engine tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use amm_pricer::chain::contracts::{IUniswapV2Pair, IUniswapV2Router02, Multicall3, IERC20, MULTICALL3_ADDRESS};
use amm_pricer::chain::logs::pair_created_topic;
use amm_pricer::chain::{ChainReader, LogEntry};
use amm_pricer::config::RouterConfig;
use amm_pricer::{ChainError, Network, PriceEngine};
use async_trait::async_trait;

pub const FACTORY: Address = address!("fafafafafafafafafafafafafafafafafafafafa");
pub const ROUTER: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

pub fn token(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn e18() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

#[derive(Default)]
pub struct MockChain {
    pub head: u64,
    pub decimals: HashMap<Address, u8>,
    pub reserves: HashMap<Address, (U256, U256)>,
    pub amounts_out: HashMap<Vec<Address>, Vec<U256>>,
    pub failing_quotes: HashMap<Vec<Address>, ChainError>,
    pub logs: Vec<LogEntry>,
    /// Block from which an address has code.
    pub code_from: HashMap<Address, u64>,
    /// Blocks below this report missing trie nodes.
    pub pruned_below: u64,
    /// Multicall3 answers with empty bytes below this block.
    pub multicall_from: u64,
    pub log_delay: Duration,
    /// The next N `get_logs` calls fail.
    pub failing_log_calls: AtomicUsize,
    pub calls: AtomicUsize,
    pub log_calls: AtomicUsize,
    pub block_number_calls: AtomicUsize,
}

impl MockChain {
    pub fn new(head: u64) -> Self {
        Self { head, ..Self::default() }
    }

    /// Register a pool created at `block` with the given reserves.
    pub fn add_pool_at(&mut self, pool: Address, token0: Address, token1: Address, reserve0: u128, reserve1: u128, block: u64) {
        let mut data = pool.into_word().to_vec();
        data.extend_from_slice(&U256::from(self.logs.len() + 1).to_be_bytes::<32>());
        self.logs.push(LogEntry {
            address: FACTORY,
            topics: vec![pair_created_topic(), token0.into_word(), token1.into_word()],
            data: data.into(),
            block_number: Some(block),
        });
        self.reserves.insert(pool, (U256::from(reserve0), U256::from(reserve1)));
    }

    pub fn add_pool(&mut self, pool: Address, token0: Address, token1: Address, reserve0: u128, reserve1: u128) {
        self.add_pool_at(pool, token0, token1, reserve0, reserve1, 1);
    }

    /// A pool whose reserve read reverts, as after a self-destruct.
    pub fn add_dead_pool(&mut self, pool: Address, token0: Address, token1: Address) {
        self.add_pool(pool, token0, token1, 0, 0);
        self.reserves.remove(&pool);
    }

    pub fn set_decimals(&mut self, token: Address, decimals: u8) {
        self.decimals.insert(token, decimals);
    }

    pub fn set_quote(&mut self, path: &[Address], amounts: Vec<U256>) {
        self.amounts_out.insert(path.to_vec(), amounts);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    fn answer(&self, target: Address, data: &[u8]) -> Result<Bytes, ChainError> {
        if data.len() < 4 {
            return Err(ChainError::Reverted("no selector".into()));
        }
        let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];
        if selector == IERC20::decimalsCall::SELECTOR {
            let decimals = self
                .decimals
                .get(&target)
                .ok_or_else(|| ChainError::Reverted("decimals".into()))?;
            return Ok(U256::from(*decimals).to_be_bytes::<32>().to_vec().into());
        }
        if selector == IUniswapV2Pair::getReservesCall::SELECTOR {
            let (r0, r1) = self
                .reserves
                .get(&target)
                .ok_or_else(|| ChainError::Reverted("getReserves".into()))?;
            let mut out = r0.to_be_bytes::<32>().to_vec();
            out.extend_from_slice(&r1.to_be_bytes::<32>());
            out.extend_from_slice(&[0u8; 32]);
            return Ok(out.into());
        }
        if selector == IUniswapV2Router02::getAmountsOutCall::SELECTOR {
            let call = IUniswapV2Router02::getAmountsOutCall::abi_decode(data, true)
                .map_err(|e| ChainError::Decode(e.to_string()))?;
            if let Some(err) = self.failing_quotes.get(&call.path) {
                return Err(err.clone());
            }
            let amounts = self
                .amounts_out
                .get(&call.path)
                .ok_or_else(|| ChainError::Reverted("UniswapV2Library: INVALID_PATH".into()))?;
            return Ok(IUniswapV2Router02::getAmountsOutCall::abi_encode_returns(&(amounts.clone(),)).into());
        }
        Err(ChainError::Reverted("unknown selector".into()))
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        self.block_number_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head)
    }

    async fn get_code(&self, address: Address, block: Option<u64>) -> Result<Bytes, ChainError> {
        let block = block.unwrap_or(self.head);
        if block < self.pruned_below {
            return Err(ChainError::MissingHistoricalState(format!("missing trie node at {block}")));
        }
        match self.code_from.get(&address) {
            Some(from) if block >= *from => Ok(Bytes::from(vec![0x60, 0x80])),
            _ => Ok(Bytes::new()),
        }
    }

    async fn call(&self, to: Address, data: Bytes, block: Option<u64>) -> Result<Bytes, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if to != MULTICALL3_ADDRESS {
            return self.answer(to, &data);
        }
        if block.unwrap_or(self.head) < self.multicall_from {
            return Ok(Bytes::new());
        }
        let batch = Multicall3::tryAggregateCall::abi_decode(&data, true)
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        let results: Vec<Multicall3::CallResult> = batch
            .calls
            .iter()
            .map(|call| match self.answer(call.target, &call.callData) {
                Ok(data) => Multicall3::CallResult { success: true, returnData: data },
                Err(_) => Multicall3::CallResult { success: false, returnData: Bytes::new() },
            })
            .collect();
        Ok(Multicall3::tryAggregateCall::abi_encode_returns(&(results,)).into())
    }

    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        if !self.log_delay.is_zero() {
            tokio::time::sleep(self.log_delay).await;
        }
        let pending = self.failing_log_calls.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_log_calls.store(pending - 1, Ordering::SeqCst);
            return Err(ChainError::Transport("connection reset".into()));
        }
        Ok(self
            .logs
            .iter()
            .filter(|log| log.address == address && log.topics.first() == Some(&topic0))
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                block >= from_block && block <= to_block
            })
            .cloned()
            .collect())
    }
}

pub fn router_config(address: Address, verified: bool) -> RouterConfig {
    RouterConfig {
        verified,
        deploy_block: Some(0),
        label: Some("test swap".into()),
        ..RouterConfig::new(address, FACTORY)
    }
}

/// Mainnet engine over `chain` with one verified router at [`ROUTER`].
pub fn engine_with(chain: Arc<MockChain>) -> PriceEngine {
    engine_on(Network::Mainnet, chain)
}

pub fn engine_on(network: Network, chain: Arc<MockChain>) -> PriceEngine {
    let reader: Arc<dyn ChainReader> = chain;
    let mut engine = PriceEngine::new(network, reader);
    engine.add_router(router_config(ROUTER, true));
    engine
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
