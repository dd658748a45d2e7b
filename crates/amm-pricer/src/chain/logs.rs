//! Factory event logs: decoding and chunked range scans.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolEvent;
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::chain::contracts::IUniswapV2Factory;
use crate::chain::{with_timeout, ChainReader};
use crate::types::{ChainError, Pool};
use crate::utils::retry::retry_async;

const CHUNK_ATTEMPTS: usize = 4;
const CHUNK_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
}

/// Topic0 of `PairCreated(address,address,address,uint256)`.
pub fn pair_created_topic() -> B256 {
    IUniswapV2Factory::PairCreated::SIGNATURE_HASH
}

/// Turn a `PairCreated` log into a pool. Tokens are indexed, the pair is the first data word.
pub fn decode_pair_created(log: &LogEntry) -> Result<Pool, ChainError> {
    if log.topics.len() < 3 || log.topics[0] != pair_created_topic() {
        return Err(ChainError::Decode(format!("not a PairCreated log from {}", log.address)));
    }
    if log.data.len() < 32 {
        return Err(ChainError::Decode(format!(
            "PairCreated data too short: {} bytes",
            log.data.len()
        )));
    }
    Ok(Pool {
        address: Address::from_slice(&log.data[12..32]),
        token0: Address::from_word(log.topics[1]),
        token1: Address::from_word(log.topics[2]),
    })
}

/// Inclusive block ranges of at most `chunk_size` blocks covering `[from, to]`.
pub fn block_chunks(from: u64, to: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let step = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start.saturating_add(step - 1).min(to);
        chunks.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    chunks
}

/// Fetch every log of `topic0` emitted by `address` in `[from, to]`.
///
/// At most `concurrency` chunk requests are in flight. Each attempt is bounded by `timeout`
/// and each chunk is retried with backoff; the scan fails as soon as one chunk exhausts its
/// attempts. Output is in block order.
pub async fn fetch_logs_chunked<R>(
    reader: &R,
    address: Address,
    topic0: B256,
    from: u64,
    to: u64,
    chunk_size: u64,
    concurrency: usize,
    timeout: Duration,
) -> Result<Vec<LogEntry>, ChainError>
where
    R: ChainReader + ?Sized,
{
    let chunks: Vec<Vec<LogEntry>> = stream::iter(block_chunks(from, to, chunk_size))
        .map(|(start, end)| {
            retry_async(
                move |_| with_timeout(timeout, reader.get_logs(address, topic0, start, end)),
                CHUNK_ATTEMPTS,
                CHUNK_BACKOFF,
            )
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;
    Ok(chunks.into_iter().flatten().collect())
}
