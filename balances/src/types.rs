use crate::errors::FetchError;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    /// Empty for the chain's native asset.
    #[serde(default)]
    pub address: String,
    pub decimals: u8,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub name: String,
    #[serde(alias = "rpc_url")]
    pub rpc: String,
    /// Overrides the canonical Multicall3 deployment.
    #[serde(default)]
    pub multicall: Option<String>,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

/// A wallet address together with its position in the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub index: usize,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceRow {
    pub index: usize,
    pub address: String,
    /// Token symbol -> decimal balance, only for successful lookups.
    pub tokens: HashMap<String, String>,
    /// Token symbols whose lookup for this wallet could not be decoded.
    pub failed: HashSet<String>,
}

impl BalanceRow {
    pub fn new(wallet: &Wallet) -> Self {
        Self {
            index: wallet.index,
            address: wallet.address.clone(),
            ..Default::default()
        }
    }
}

pub type PerNetworkTable = Vec<BalanceRow>;

/// One wallet's entry in a fetch result, tagged with the wallet address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletBalance {
    pub address: String,
    pub balance: Result<String, FetchError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Network(String),
}
