//! Per-chain constants: reference assets, intermediaries and known routers.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{address, Address};

use crate::types::PricingError;

/// Chains the engine knows reference assets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    BinanceSmartChain,
    Polygon,
    Fantom,
}

/// A router the engine can quote through out of the box.
#[derive(Debug, Clone, Copy)]
pub struct KnownRouter {
    pub label: &'static str,
    pub router: Address,
    pub factory: Address,
}

const MAINNET_STABLES: &[Address] = &[
    address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), // usdc
    address!("0000000000085d4780B73119b644AE5ecd22b376"), // tusd
    address!("6B175474E89094C44Da98b954EedeAC495271d0F"), // dai
    address!("dAC17F958D2ee523a2206206994597C13D831ec7"), // usdt
    address!("4Fabb145d64652a948d72533023f6E7A623C7C53"), // busd
    address!("57Ab1ec28D129707052df4dF418D58a2D46d5f51"), // susd
    address!("57Ab1E02fEE23774580C119740129eAC7081e9D3"), // susd_old
    address!("1456688345527bE1f37E9e627DA0837D6f08C925"), // usdp
    address!("674C6Ad92Fd080e4004b2312b45f796a192D27a0"), // usdn
    address!("853d955aCEf822Db058eb8505911ED77F175b99e"), // frax
    address!("5f98805A4E8be255a32880FDeC7F6728C6568bA0"), // lusd
    address!("BC6DA0FE9aD5f3b0d58160288917AA56653660E9"), // alusd
    address!("8e870d67f660d95d5be530380d0ec0bd388289e1"), // pax
    address!("e2f2a5C287993345a840Db3B0845fbC70f5935a5"), // musd
];

const BSC_STABLES: &[Address] = &[
    address!("8ac76a51cc950d9822d68b83fe1ad97b32cd580d"), // usdc
    address!("1af3f329e8be154074d8769d1ffa4ee058b1dbc3"), // dai
    address!("55d398326f99059ff775485246999027b3197955"), // usdt
    address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56"), // busd
    address!("23396cF899Ca06c4472205fC903bDB4de249D6fC"), // wust
    address!("14016E85a25aeb13065688cAFB43044C2ef86784"), // tusd
    address!("03ab98f5dc94996F8C33E15cD4468794d12d41f9"), // usdn
];

const POLYGON_STABLES: &[Address] = &[
    address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"), // usdc
    address!("8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063"), // dai
    address!("c2132D05D31c914a87C6611C10748AEb04B58e8F"), // usdt
    address!("E840B73E5287865EEc17d250bFb1536704B43B21"), // musd
];

const FANTOM_STABLES: &[Address] = &[
    address!("04068DA6C83AFCFA0e13ba15A6696662335D5B75"), // usdc
    address!("8D11eC38a3EB5E956B052f67Da8Bdc9bef8Abf3E"), // dai
    address!("049d68029688eAbF473097a2fC38ef61633A3C7A"), // fusdt
];

const MAINNET_ROUTERS: &[KnownRouter] = &[
    KnownRouter {
        label: "uniswap v2",
        router: address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
        factory: address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
    },
    KnownRouter {
        label: "sushiswap",
        router: address!("d9e1cE17f2641f24aE83637ab66a2cca9C378B9F"),
        factory: address!("C0AEe478e3658e2610c5F7A4A2E1777cE9e4f2Ac"),
    },
];

const BSC_ROUTERS: &[KnownRouter] = &[KnownRouter {
    label: "pancakeswap v2",
    router: address!("10ED43C718714eb63d5aA57B78B54704E256024E"),
    factory: address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73"),
}];

const POLYGON_ROUTERS: &[KnownRouter] = &[KnownRouter {
    label: "quickswap",
    router: address!("a5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff"),
    factory: address!("5757371414417b8C6CAad45bAeF941aBc7d3Ab32"),
}];

const FANTOM_ROUTERS: &[KnownRouter] = &[KnownRouter {
    label: "spookyswap",
    router: address!("F491e7B69E4244ad4002BC14e878a34207E38c29"),
    factory: address!("152eE697f2E276fA89E96742e9bB9aB1F2E61bE3"),
}];

impl Network {
    pub fn from_chain_id(chain_id: u64) -> Result<Self, PricingError> {
        match chain_id {
            1 => Ok(Network::Mainnet),
            56 => Ok(Network::BinanceSmartChain),
            137 => Ok(Network::Polygon),
            250 => Ok(Network::Fantom),
            other => Err(PricingError::UnsupportedNetwork(format!("chain id {other}"))),
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::BinanceSmartChain => 56,
            Network::Polygon => 137,
            Network::Fantom => 250,
        }
    }

    /// Tokenized form of the chain's native asset.
    pub fn wrapped_gas_coin(&self) -> Address {
        match self {
            Network::Mainnet => address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            Network::BinanceSmartChain => address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"),
            Network::Polygon => address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"),
            Network::Fantom => address!("21be370D5312f44cB42ce377BC9b8a0cEF1A4C83"),
        }
    }

    /// (Bridged) WETH. Equal to the wrapped gas coin on mainnet.
    pub fn weth(&self) -> Address {
        match self {
            Network::Mainnet => address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            Network::BinanceSmartChain => address!("2170Ed0880ac9A755fd29B2688956BD959F933F8"),
            Network::Polygon => address!("7ceb23fd6bc0add59e62ac25578270cff1b9f619"),
            Network::Fantom => address!("74b23882a30290451A17c44f4F05243b6b58C76d"),
        }
    }

    pub fn usdc(&self) -> Address {
        match self {
            Network::Mainnet => address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            Network::BinanceSmartChain => address!("8ac76a51cc950d9822d68b83fe1ad97b32cd580d"),
            Network::Polygon => address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
            Network::Fantom => address!("04068DA6C83AFCFA0e13ba15A6696662335D5B75"),
        }
    }

    /// Tokens treated as one USD.
    pub fn stablecoins(&self) -> &'static [Address] {
        match self {
            Network::Mainnet => MAINNET_STABLES,
            Network::BinanceSmartChain => BSC_STABLES,
            Network::Polygon => POLYGON_STABLES,
            Network::Fantom => FANTOM_STABLES,
        }
    }

    pub fn is_stable(&self, token: &Address) -> bool {
        self.stablecoins().contains(token)
    }

    /// Concrete output token for a request. `None` means "the default stable".
    /// On BSC the USDC pools are thin, so USDC requests are redirected to BUSD.
    pub fn resolve_token_out(&self, token_out: Option<Address>) -> Address {
        let token_out = token_out.unwrap_or_else(|| self.usdc());
        match self {
            Network::BinanceSmartChain if token_out == self.usdc() => {
                address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56")
            }
            _ => token_out,
        }
    }

    /// Tokens the resolver recurses through before trying a generic peel.
    pub fn intermediaries(&self) -> Vec<Address> {
        let mut tokens = vec![self.wrapped_gas_coin()];
        if self.weth() != self.wrapped_gas_coin() {
            tokens.push(self.weth());
        }
        tokens
    }

    /// Chains where routers pair most tokens against their own governance token.
    pub fn router_native_intermediary(&self) -> Option<Address> {
        match self {
            Network::BinanceSmartChain => Some(address!("0e09fabb73bd3ade0a17ecc321fd13a19e81ce82")), // cake
            _ => None,
        }
    }

    /// Token whose routes go `[token, native, weth, out]` when used as `paired_against`.
    pub fn router_token(&self) -> Option<Address> {
        match self {
            Network::Mainnet => Some(address!("6B3595068778DD592e39A122f4f5a5cF09C90fE2")), // sushi
            _ => None,
        }
    }

    pub fn known_routers(&self) -> &'static [KnownRouter] {
        match self {
            Network::Mainnet => MAINNET_ROUTERS,
            Network::BinanceSmartChain => BSC_ROUTERS,
            Network::Polygon => POLYGON_ROUTERS,
            Network::Fantom => FANTOM_ROUTERS,
        }
    }
}

impl FromStr for Network {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "ethereum" | "eth" => Ok(Network::Mainnet),
            "bsc" | "binance" | "binancesmartchain" => Ok(Network::BinanceSmartChain),
            "polygon" | "matic" => Ok(Network::Polygon),
            "fantom" | "ftm" => Ok(Network::Fantom),
            other => other
                .parse::<u64>()
                .map_err(|_| PricingError::UnsupportedNetwork(other.to_string()))
                .and_then(Network::from_chain_id),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "Mainnet",
            Network::BinanceSmartChain => "Binance Smart Chain",
            Network::Polygon => "Polygon",
            Network::Fantom => "Fantom",
        };
        write!(f, "{name}")
    }
}
