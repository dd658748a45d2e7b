//! Liquidity selection and path resolution over synthetic pool graphs.

mod common;

use std::sync::Arc;

use amm_pricer::engine::pathfinder::MAX_PATH_DEPTH;
use amm_pricer::{Network, PricingError};
use common::{engine_on, engine_with, token, MockChain, ROUTER};

#[tokio::test]
async fn test_cyclic_graph_terminates_with_no_path() {
    let (a, b) = (token(0xa1), token(0xb1));
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), a, b, 1_000, 1_000);
    let chain = Arc::new(chain);
    let engine = engine_with(chain.clone());
    let router = engine.router(&ROUTER).unwrap();

    let res = router.path_to_stable(a, None).await;
    assert!(matches!(res, Err(PricingError::NoPathFound(_))));
    // one reserve batch per level, the stable filter never has candidates
    assert_eq!(chain.calls(), MAX_PATH_DEPTH + 1);
}

#[tokio::test]
async fn test_failed_reserve_read_excludes_pool() {
    let a = token(0xa1);
    let mut chain = MockChain::new(10);
    chain.add_dead_pool(token(0x01), a, token(0xc1));
    chain.add_pool(token(0x02), token(0xc2), a, 7, 3);
    let engine = engine_with(Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    assert_eq!(router.deepest_pool(a, None).await.unwrap(), Some(token(0x02)));
}

#[tokio::test]
async fn test_same_side_reserve_decides() {
    let a = token(0xa1);
    let mut chain = MockChain::new(10);
    // large reserve on the other side must not win
    chain.add_pool(token(0x01), a, token(0xc1), 10, 1_000_000);
    chain.add_pool(token(0x02), token(0xc2), a, 5, 20);
    let engine = engine_with(Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    assert_eq!(router.deepest_pool(a, None).await.unwrap(), Some(token(0x02)));
}

#[tokio::test]
async fn test_ties_go_to_first_seen_pool() {
    let a = token(0xa1);
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x03), a, token(0xc1), 50, 1);
    chain.add_pool(token(0x01), a, token(0xc2), 50, 1);
    chain.add_pool(token(0x02), a, token(0xc3), 50, 1);
    let engine = engine_with(Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    assert_eq!(router.deepest_pool(a, None).await.unwrap(), Some(token(0x03)));
}

#[tokio::test]
async fn test_empty_reserves_never_win() {
    let a = token(0xa1);
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), a, token(0xc1), 0, 0);
    let engine = engine_with(Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    assert_eq!(router.deepest_pool(a, None).await.unwrap(), None);
    assert_eq!(router.deepest_pool(token(0xff), None).await.unwrap(), None);
}

#[tokio::test]
async fn test_wrapped_gas_coin_only_considers_stable_pools() {
    let net = Network::Mainnet;
    let weth = net.wrapped_gas_coin();
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), weth, token(0xc1), 1_000_000, 1);
    chain.add_pool(token(0x02), net.usdc(), weth, 1, 10);
    let engine = engine_with(Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    assert_eq!(router.deepest_pool(weth, None).await.unwrap(), Some(token(0x02)));
    let path = router.path_to_stable(weth, None).await.unwrap();
    assert_eq!(path.tokens(), &[weth, net.usdc()]);
}

#[tokio::test]
async fn test_deepest_stable_pool_filters_counterparties() {
    let net = Network::Mainnet;
    let a = token(0xa1);
    let dai = net.stablecoins()[2];
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), a, token(0xc1), 1_000, 1);
    chain.add_pool(token(0x02), a, dai, 10, 1);
    chain.add_pool(token(0x03), a, net.usdc(), 20, 1);
    let engine = engine_with(Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    assert_eq!(router.deepest_pool(a, None).await.unwrap(), Some(token(0x01)));
    assert_eq!(router.deepest_stable_pool(a, None).await.unwrap(), Some(token(0x03)));
}

#[tokio::test]
async fn test_generic_peel_resolves_through_other_assets() {
    let net = Network::Mainnet;
    let (a, b) = (token(0xa1), token(0xb1));
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), a, b, 1_000, 1_000);
    chain.add_pool(token(0x02), b, net.usdc(), 5_000, 5_000);
    let engine = engine_with(Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    let path = router.path_to_stable(a, None).await.unwrap();
    assert_eq!(path.tokens(), &[a, b, net.usdc()]);
}

#[tokio::test]
async fn test_intermediary_without_stable_completion_is_no_path() {
    let net = Network::Mainnet;
    let a = token(0xa1);
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), a, net.weth(), 1_000, 1_000);
    let engine = engine_with(Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    let res = router.path_to_stable(a, None).await;
    assert!(matches!(res, Err(PricingError::NoPathFound(t)) if t == a));
}

#[tokio::test]
async fn test_token_paired_against_cake_completes_through_cake_stable_pool() {
    let net = Network::BinanceSmartChain;
    let cake = net.router_native_intermediary().unwrap();
    let busd = net.resolve_token_out(None);
    let a = token(0xa1);
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), a, cake, 1_000, 1_000);
    chain.add_pool(token(0x02), a, token(0xc1), 10, 10);
    // cake's deepest pool is against the gas coin, its deepest stable pool against busd
    chain.add_pool(token(0x03), cake, net.wrapped_gas_coin(), 10_000, 10_000);
    chain.add_pool(token(0x04), cake, busd, 500, 500);
    let engine = engine_on(net, Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    let path = router.path_to_stable(a, None).await.unwrap();
    assert_eq!(path.tokens(), &[a, cake, busd]);
}

#[tokio::test]
async fn test_weth_is_a_second_intermediary_where_it_is_not_the_gas_coin() {
    let net = Network::Polygon;
    assert_ne!(net.weth(), net.wrapped_gas_coin());
    let a = token(0xa1);
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), a, net.weth(), 1_000, 1_000);
    chain.add_pool(token(0x02), a, token(0xc1), 10, 10);
    chain.add_pool(token(0x03), net.weth(), net.usdc(), 5_000, 5_000);
    chain.add_pool(token(0x04), net.weth(), token(0xc2), 100, 100);
    let engine = engine_on(net, Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    let path = router.path_to_stable(a, None).await.unwrap();
    assert_eq!(path.tokens(), &[a, net.weth(), net.usdc()]);
}

#[tokio::test]
async fn test_failed_second_intermediary_reports_the_original_token() {
    let net = Network::Polygon;
    let a = token(0xa1);
    let mut chain = MockChain::new(10);
    chain.add_pool(token(0x01), a, net.weth(), 1_000, 1_000);
    // the gas coin has no stable pool to finish on
    chain.add_pool(token(0x02), net.weth(), net.wrapped_gas_coin(), 5_000, 5_000);
    let engine = engine_on(net, Arc::new(chain));
    let router = engine.router(&ROUTER).unwrap();

    let res = router.path_to_stable(a, None).await;
    assert!(matches!(res, Err(PricingError::NoPathFound(t)) if t == a));
}
