#![deny(clippy::dbg_macro)]

#[macro_export]
macro_rules! address {
    ($addr:expr) => {{
        use std::str::FromStr;
        $crate::Address::from_str($addr).expect(&format!("Invalid address {}", $addr))
    }};
}

pub mod evm;
pub mod units;

use async_trait::async_trait;

pub use evm::{general::Provider, ProviderError, MULTICALL3};
pub use web3::types::{Address, U256};

/// A balance lookup result tagged with the address it was requested for.
pub type Tagged<A, B, E> = (A, Result<B, E>);

#[async_trait]
pub trait BalanceQuerier {
    type Address;
    type Balance;
    type Error;

    /// Queries the chain's base currency for every address in one round trip.
    ///
    /// The outer error means the whole batch failed, the inner ones are per
    /// address.
    async fn get_native_balances(
        &self,
        user_addresses: &[Self::Address],
    ) -> Result<Vec<Tagged<Self::Address, Self::Balance, Self::Error>>, Self::Error>;

    async fn get_fungible_balances(
        &self,
        token_address: Self::Address,
        user_addresses: &[Self::Address],
    ) -> Result<Vec<Tagged<Self::Address, Self::Balance, Self::Error>>, Self::Error>;
}
