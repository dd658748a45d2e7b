pub mod retry;
pub mod token_list;

use std::str::FromStr;

use alloy_primitives::Address;

use crate::types::PricingError;

/// Parse a hex address, with or without `0x`.
pub fn parse_address(s: &str) -> Result<Address, PricingError> {
    Address::from_str(s.trim()).map_err(|_| PricingError::InvalidAddress(s.to_string()))
}
