use alloy_primitives::Address;
use anyhow::anyhow;
use serde::Deserialize;

use crate::utils::parse_address;

/// Load a list of token addresses from a JSON `["0x..."]` or TOML `tokens=[...]` file.
/// Accepts absolute or relative path.
pub fn load_token_list<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Vec<Address>> {
    let text = std::fs::read_to_string(&path)
        .map_err(|e| anyhow!("unable to read token list {}: {}", path.as_ref().display(), e))?;
    parse_token_list(&text)
        .map_err(|e| anyhow!("token list {}: {}", path.as_ref().display(), e))
}

pub fn parse_token_list(text: &str) -> anyhow::Result<Vec<Address>> {
    if let Ok(vec) = serde_json::from_str::<Vec<String>>(text) {
        return parse_addresses(vec);
    }

    #[derive(Deserialize)]
    struct Wrapper {
        tokens: Vec<String>,
    }
    let wrapper: Wrapper =
        toml::from_str(text).map_err(|e| anyhow!("not valid JSON nor TOML: {}", e))?;
    parse_addresses(wrapper.tokens)
}

fn parse_addresses(list: Vec<String>) -> anyhow::Result<Vec<Address>> {
    list.iter().map(|s| parse_address(s).map_err(anyhow::Error::from)).collect()
}
