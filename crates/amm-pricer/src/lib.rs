//! AMM price discovery: route a unit swap through a Uniswap V2 style router towards a USD
//! reference and read the price off the quote.

pub mod cache;
pub mod chain;
pub mod config;
pub mod engine;
pub mod metadata;
pub mod networks;
pub mod types;
pub mod utils;

pub use chain::rpc::JsonRpcClient;
pub use chain::ChainReader;
pub use config::{AppConfig, RouterConfig};
pub use engine::{PriceEngine, Router};
pub use networks::Network;
pub use types::{ChainError, PricingError};
