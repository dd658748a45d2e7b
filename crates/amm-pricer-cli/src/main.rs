use std::sync::Arc;

use amm_pricer::config::{AppConfig, CliConfig};
use amm_pricer::utils::parse_address;
use amm_pricer::utils::token_list::load_token_list;
use amm_pricer::{ChainReader, JsonRpcClient, PriceEngine};
use anyhow::{anyhow, Result};
use clap::Parser;
use rust_decimal::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Prices are shown with 6 decimal places, like token amounts.
fn format_price(price: Option<f64>) -> String {
    match price.and_then(Decimal::from_f64) {
        Some(price) => price.round_dp(6).to_string(),
        None => "unavailable".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = CliConfig::parse();
    let config = AppConfig::from_cli(&cli)?;

    let rpc_url = config
        .rpc_url
        .clone()
        .ok_or_else(|| anyhow!("--rpc-url or RPC_URL is required"))?;
    let client = JsonRpcClient::new(rpc_url, config.request_timeout)?;
    let node_chain = client.chain_id().await?;
    if node_chain != config.chain.chain_id() {
        return Err(anyhow!(
            "node reports chain id {} but {} ({}) is configured",
            node_chain,
            config.chain,
            config.chain.chain_id()
        ));
    }
    let reader: Arc<dyn ChainReader> = Arc::new(client);
    let engine = PriceEngine::from_config(&config, reader);

    let router = match cli.router {
        Some(ref address) => parse_address(address)?,
        None => engine.default_router().ok_or_else(|| anyhow!("no router configured for {}", config.chain))?,
    };
    let token_out = cli.token_out.as_deref().map(parse_address).transpose()?;

    let mut tokens = cli.tokens.iter().map(|s| parse_address(s)).collect::<Result<Vec<_>, _>>()?;
    if let Some(ref path) = config.tokens_file {
        tokens.extend(load_token_list(path)?);
    }
    if tokens.is_empty() {
        return Err(anyhow!("nothing to price: pass --token or --tokens-file"));
    }

    let label = engine.router(&router)?.label();
    info!("Pricing {} tokens through {} on {}", tokens.len(), label, config.chain);
    engine.build_pools(&router).await?;

    let prices = match token_out {
        None => engine.get_prices(&router, &tokens, cli.block).await,
        Some(out) => {
            let lookups = tokens.iter().map(|token| engine.get_price(&router, *token, cli.block, Some(out), None));
            futures_util::future::join_all(lookups).await
        }
    };

    for (token, price) in tokens.iter().zip(prices) {
        println!("{token}  {}", format_price(price));
    }

    let metrics = engine.cache_metrics();
    info!("Price cache: {} hits, {} misses, {} entries", metrics.hits, metrics.misses, metrics.entries);
    Ok(())
}
