//! Chain collaborators: node reads, batched calls, factory logs.

pub mod contracts;
pub mod logs;
pub mod multicall;
pub mod rpc;

use std::future::Future;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::types::ChainError;

pub use logs::LogEntry;
pub use multicall::BatchCall;

/// Read-only view of an EVM node. `block = None` means latest.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn block_number(&self) -> Result<u64, ChainError>;

    async fn get_code(&self, address: Address, block: Option<u64>) -> Result<Bytes, ChainError>;

    async fn call(&self, to: Address, data: Bytes, block: Option<u64>) -> Result<Bytes, ChainError>;

    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError>;

    /// Execute independent read calls in one round trip against the same block.
    /// A failed call yields `None` at its index without failing the batch.
    async fn batch(
        &self,
        calls: Vec<BatchCall>,
        block: Option<u64>,
    ) -> Result<Vec<Option<Bytes>>, ChainError> {
        multicall::try_aggregate(self, calls, block).await
    }
}

/// Bound a remote call. An elapsed timer is a failure like any other.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ChainError::Timeout(limit)),
    }
}

/// Binary search for the first block at which `address` has code.
///
/// Every node read is bounded by `timeout`. Needs historical state. When the node lacks it
/// for a probed block the search assumes code was already present, so the answer can be
/// early but never late. Returns `None` when the address has no code at the head. Does not
/// account for CREATE2 redeploys or self-destructs.
pub async fn contract_creation_block<R>(
    reader: &R,
    address: Address,
    timeout: Duration,
) -> Result<Option<u64>, ChainError>
where
    R: ChainReader + ?Sized,
{
    let code_at = |block: Option<u64>| with_timeout(timeout, reader.get_code(address, block));
    let height = with_timeout(timeout, reader.block_number()).await?;
    if code_at(None).await?.is_empty() {
        return Ok(None);
    }
    info!(%address, height, "Searching contract creation block");
    if code_at(Some(0)).await.map(|c| !c.is_empty()).unwrap_or(false) {
        return Ok(Some(0));
    }
    let (mut lo, mut hi) = (0u64, height);
    let mut approximate = false;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        match code_at(Some(mid)).await {
            Ok(code) if !code.is_empty() => hi = mid,
            Ok(_) => lo = mid,
            Err(ChainError::MissingHistoricalState(_)) => {
                approximate = true;
                hi = mid;
            }
            Err(e) => return Err(e),
        }
    }
    if approximate {
        warn!(%address, block = hi, "Missing trie node during creation block search, result may be earlier than actual. Use an archive node for an exact block.");
    }
    Ok(Some(hi))
}
