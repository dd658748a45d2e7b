//! Common types, enums, error handling, data models.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by the chain collaborators (node, multicall, log source).
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("out of gas")]
    OutOfGas,
    #[error("missing historical state: {0}")]
    MissingHistoricalState(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decoding error: {0}")]
    Decode(String),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

impl ChainError {
    /// Classify a JSON-RPC error object by its message.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("revert") {
            ChainError::Reverted(message)
        } else if lower.contains("out of gas") {
            ChainError::OutOfGas
        } else if lower.contains("missing trie node") || lower.contains("header not found") {
            ChainError::MissingHistoricalState(message)
        } else {
            ChainError::Rpc { code, message }
        }
    }

    /// Router forks that return a differently shaped `amounts` array.
    pub fn is_malformed_sequence(&self) -> bool {
        match self {
            ChainError::Rpc { message, .. } | ChainError::Decode(message) => {
                message.contains("Sequence has incorrect length")
            }
            _ => false,
        }
    }
}

/// Engine-level error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum PricingError {
    #[error("pool graph unavailable for router {router}: {reason}")]
    GraphUnavailable { router: Address, reason: String },
    #[error("no swap path found for {0}")]
    NoPathFound(Address),
    #[error("quote failed: {reason}")]
    QuoteFailed {
        #[source]
        reason: ChainError,
    },
    #[error("non-standard token {0}")]
    NonStandardToken(Address),
    #[error("missing historical state at block {block:?}")]
    MissingHistoricalState { block: Option<u64> },
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("unknown router {0}")]
    UnknownRouter(Address),
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type Result<T> = std::result::Result<T, PricingError>;

/// Outcome of a narrow raw call whose failure modes are part of normal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    Success(T),
    /// The call reverted or returned no data.
    Reverted,
    /// The return word did not fit the expected type.
    Overflowed,
}

/// Largest decimals value whose unit `10^decimals` fits in a `uint256`.
pub const MAX_DECIMALS: u8 = 77;

/// An ERC-20 token with its decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, decimals: u8) -> Self {
        Self { address, decimals }
    }

    /// `10^decimals`, one whole unit in the smallest denomination. `None` past
    /// [`MAX_DECIMALS`], where the unit no longer fits in a `uint256`.
    pub fn scale(&self) -> Option<U256> {
        U256::from(10u8).checked_pow(U256::from(self.decimals))
    }
}

/// A two-asset pool as announced by the factory's creation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl Pool {
    /// The token on the other side of `token`, if `token` belongs to the pool.
    pub fn counterparty(&self, token: &Address) -> Option<Address> {
        if *token == self.token0 {
            Some(self.token1)
        } else if *token == self.token1 {
            Some(self.token0)
        } else {
            None
        }
    }
}

/// Ordered token addresses a notional swap walks through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Address>", into = "Vec<Address>")]
pub struct SwapPath(Vec<Address>);

impl TryFrom<Vec<Address>> for SwapPath {
    type Error = String;

    fn try_from(tokens: Vec<Address>) -> std::result::Result<Self, Self::Error> {
        let len = tokens.len();
        Self::new(tokens).ok_or_else(|| format!("a swap path needs at least two tokens, got {len}"))
    }
}

impl From<SwapPath> for Vec<Address> {
    fn from(path: SwapPath) -> Self {
        path.0
    }
}

impl SwapPath {
    /// Build a path; fewer than two vertices is not a path.
    pub fn new(tokens: Vec<Address>) -> Option<Self> {
        if tokens.len() < 2 {
            return None;
        }
        Some(Self(tokens))
    }

    /// A single hop from `from` to `to`.
    pub fn pair(from: Address, to: Address) -> Self {
        Self(vec![from, to])
    }

    /// Append `token` as the new final vertex.
    pub fn append(mut self, token: Address) -> Self {
        self.0.push(token);
        self
    }

    /// Prepend `token` to an already valid path.
    pub fn prepend(mut self, token: Address) -> Self {
        self.0.insert(0, token);
        self
    }

    pub fn tokens(&self) -> &[Address] {
        &self.0
    }

    pub fn hops(&self) -> usize {
        self.0.len() - 1
    }

    pub fn first(&self) -> Address {
        self.0[0]
    }

    pub fn last(&self) -> Address {
        self.0[self.0.len() - 1]
    }

    /// Multiplicative 0.3% per-hop router fee, `0.997^hops`.
    pub fn fee_factor(&self) -> f64 {
        ROUTER_FEE_PER_HOP.powi(self.hops() as i32)
    }
}

/// Fraction of the input that survives one hop through a 0.3% pool.
pub const ROUTER_FEE_PER_HOP: f64 = 0.997;

/// Amounts returned by `getAmountsOut`, one per path vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub amounts: Vec<U256>,
}

impl Quote {
    pub fn amount_in(&self) -> Option<U256> {
        self.amounts.first().copied()
    }

    pub fn amount_out(&self) -> Option<U256> {
        self.amounts.last().copied()
    }
}

/// Lossy conversion used only where amounts become floating point ratios.
pub fn u256_to_f64(value: U256) -> f64 {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
        .to_f64()
        .unwrap_or(f64::INFINITY)
}
