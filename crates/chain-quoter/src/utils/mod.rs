//! Small helpers shared by the library and the binaries.

pub mod token_list;

use crate::types::{QuoterError, Result};
use alloy_primitives::Address;
use std::str::FromStr;

pub use token_list::{load_token_list, TokenEntry};

/// Parse a `0x`-prefixed, 40 hex digit address. Mixed case is accepted
/// without checksum verification.
pub fn parse_address(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    let well_formed = trimmed.len() == 42
        && trimmed.starts_with("0x")
        && trimmed[2..].chars().all(|c| c.is_ascii_hexdigit());
    if !well_formed {
        return Err(QuoterError::InvalidAddress(raw.to_string()));
    }
    Address::from_str(trimmed).map_err(|_| QuoterError::InvalidAddress(raw.to_string()))
}
