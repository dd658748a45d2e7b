//! `ChainReader` over plain HTTP JSON-RPC.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U64};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chain::{ChainReader, LogEntry};
use crate::types::ChainError;

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<U64>,
}

impl From<RawLog> for LogEntry {
    fn from(raw: RawLog) -> Self {
        LogEntry {
            address: raw.address,
            topics: raw.topics,
            data: raw.data,
            block_number: raw.block_number.map(|n| n.to::<u64>()),
        }
    }
}

/// HTTP JSON-RPC client for an EVM node.
#[derive(Debug)]
pub struct JsonRpcClient {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Transport(format!("Failed to build http client: {e}")))?;
        Ok(Self { url: url.into(), client, next_id: AtomicU64::new(1) })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = build_request(id, method, params);
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("{method} request failed: {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChainError::Transport(format!("Failed to read {method} response: {e}")))?;
        parse_response(method, &bytes)
    }

    /// Chain id reported by the node.
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let id: U64 = self.request("eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }
}

fn build_request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Hex quantity for historical reads, `"latest"` otherwise.
pub fn block_param(block: Option<u64>) -> Value {
    match block {
        Some(number) => json!(format!("0x{number:x}")),
        None => json!("latest"),
    }
}

fn parse_response<T: DeserializeOwned>(method: &str, bytes: &[u8]) -> Result<T, ChainError> {
    let parsed: RpcResponse<T> = serde_json::from_slice(bytes).map_err(|e| {
        let raw = String::from_utf8_lossy(bytes);
        let preview: String = raw.chars().take(500).collect();
        ChainError::Decode(format!("Failed to parse {method} response: {e}. Raw response: {preview}"))
    })?;
    if let Some(error) = parsed.error {
        return Err(ChainError::from_rpc(error.code, error.message));
    }
    parsed
        .result
        .ok_or_else(|| ChainError::Decode(format!("{method} response missing both result and error fields")))
}

#[async_trait]
impl ChainReader for JsonRpcClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        let number: U64 = self.request("eth_blockNumber", json!([])).await?;
        Ok(number.to::<u64>())
    }

    async fn get_code(&self, address: Address, block: Option<u64>) -> Result<Bytes, ChainError> {
        self.request("eth_getCode", json!([address, block_param(block)])).await
    }

    async fn call(&self, to: Address, data: Bytes, block: Option<u64>) -> Result<Bytes, ChainError> {
        let call = json!({ "to": to, "data": data });
        self.request("eth_call", json!([call, block_param(block)])).await
    }

    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, ChainError> {
        let filter = json!({
            "address": address,
            "topics": [topic0],
            "fromBlock": block_param(Some(from_block)),
            "toBlock": block_param(Some(to_block)),
        });
        let logs: Vec<RawLog> = self.request("eth_getLogs", json!([filter])).await?;
        Ok(logs.into_iter().map(LogEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_param() {
        assert_eq!(block_param(None), json!("latest"));
        assert_eq!(block_param(Some(255)), json!("0xff"));
    }

    #[test]
    fn test_parse_result() {
        let code: Bytes = parse_response("eth_getCode", br#"{"jsonrpc":"2.0","id":1,"result":"0x6080"}"#).unwrap();
        assert_eq!(code.as_ref(), &[0x60, 0x80]);
    }

    #[test]
    fn test_parse_error_is_classified() {
        let body = br#"{"jsonrpc":"2.0","id":1,"error":{"code":3,"message":"execution reverted"}}"#;
        let err = parse_response::<Bytes>("eth_call", body).unwrap_err();
        assert!(matches!(err, ChainError::Reverted(_)));
    }

    #[test]
    fn test_parse_log() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":[{
            "address":"0x5c69bee701ef814a2b6a3edd4b1652cb9cc5aa6f",
            "topics":["0x0d3648bd0f6ba80134a33ba9275ac585d9d315f0ad8355cddefde31afa28d0e9"],
            "data":"0x",
            "blockNumber":"0x10"}]}"#;
        let logs: Vec<RawLog> = parse_response("eth_getLogs", body).unwrap();
        let entry = LogEntry::from(logs.into_iter().next().unwrap());
        assert_eq!(entry.block_number, Some(16));
        assert_eq!(entry.topics.len(), 1);
    }
}
