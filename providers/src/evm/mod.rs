pub mod general;
pub mod multicall;

use std::str::FromStr;
use thiserror::Error;
use web3::types::Address;

pub const MULTICALL_ABI: &[u8] = include_bytes!("../../abi/Multicall3.json");
pub const ERC20_ABI: &[u8] = include_bytes!("../../abi/ERC20.json");

lazy_static::lazy_static! {
    /// Canonical Multicall3 deployment, same address on every supported chain.
    pub static ref MULTICALL3: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Web3(#[from] web3::Error),
    #[error(transparent)]
    Abi(#[from] web3::ethabi::Error),
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("Malformed batch response: {0}")]
    Response(String),
    #[error("Invalid address `{0}`")]
    InvalidAddress(String),
    #[error("Call for `{0:#x}` reverted")]
    CallFailed(Address),
    #[error("Unexpected return data for `{0:#x}`: {1}")]
    Decode(Address, String),
}

pub fn parse_address(address: &str) -> Result<Address, ProviderError> {
    let trimmed = address.trim();

    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(ProviderError::InvalidAddress(address.to_string()));
    }

    Address::from_str(trimmed).map_err(|_| ProviderError::InvalidAddress(address.to_string()))
}
