//! Batched read calls through Multicall3 `tryAggregate(false, ..)`.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use futures::future::join_all;
use tracing::debug;

use crate::chain::contracts::{Multicall3, MULTICALL3_ADDRESS};
use crate::chain::ChainReader;
use crate::types::ChainError;

/// One independent read call inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub target: Address,
    pub call_data: Bytes,
}

impl BatchCall {
    pub fn new(target: Address, call_data: impl Into<Bytes>) -> Self {
        Self { target, call_data: call_data.into() }
    }
}

/// Run `calls` as a single `eth_call` to Multicall3 at `block`.
///
/// Below Multicall3's deployment block the aggregator has no code and answers with empty
/// bytes; the calls are then issued one by one at the same block.
pub async fn try_aggregate<R>(
    reader: &R,
    calls: Vec<BatchCall>,
    block: Option<u64>,
) -> Result<Vec<Option<Bytes>>, ChainError>
where
    R: ChainReader + ?Sized,
{
    if calls.is_empty() {
        return Ok(Vec::new());
    }
    let raw = reader.call(MULTICALL3_ADDRESS, encode_try_aggregate(&calls), block).await?;
    if raw.is_empty() {
        debug!(?block, calls = calls.len(), "Multicall3 has no code at block, calling individually");
        return Ok(call_individually(reader, calls, block).await);
    }
    decode_try_aggregate(&raw, calls.len())
}

/// Same contract as [`try_aggregate`] without the aggregator: failed or empty results are `None`.
pub async fn call_individually<R>(reader: &R, calls: Vec<BatchCall>, block: Option<u64>) -> Vec<Option<Bytes>>
where
    R: ChainReader + ?Sized,
{
    join_all(calls.into_iter().map(|call| async move {
        match reader.call(call.target, call.call_data, block).await {
            Ok(data) if !data.is_empty() => Some(data),
            Ok(_) => None,
            Err(e) => {
                debug!(to = %call.target, "individual call failed: {}", e);
                None
            }
        }
    }))
    .await
}

pub fn encode_try_aggregate(calls: &[BatchCall]) -> Bytes {
    let calls = calls
        .iter()
        .map(|call| Multicall3::Call { target: call.target, callData: call.call_data.clone() })
        .collect();
    Multicall3::tryAggregateCall { requireSuccess: false, calls }.abi_encode().into()
}

/// Failed or empty sub-call results become `None`.
pub fn decode_try_aggregate(raw: &[u8], expected: usize) -> Result<Vec<Option<Bytes>>, ChainError> {
    let results = Multicall3::tryAggregateCall::abi_decode_returns(raw, true)
        .map_err(|e| ChainError::Decode(format!("Failed to decode multicall results: {e}")))?
        .returnData;
    if results.len() != expected {
        return Err(ChainError::Decode(format!(
            "multicall returned {} results for {} calls",
            results.len(),
            expected
        )));
    }
    Ok(results
        .into_iter()
        .map(|r| (r.success && !r.returnData.is_empty()).then_some(r.returnData))
        .collect())
}
