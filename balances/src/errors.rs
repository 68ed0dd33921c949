use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Failed to connect to `{endpoint}`: {reason}")]
    Connection { endpoint: String, reason: String },
    #[error("Batched call failed: {0}")]
    Batch(String),
    #[error("Could not decode balance of `{address}`: {reason}")]
    Decode { address: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("No networks configured")]
    NoNetworks,
    #[error("Network `{0}` is configured more than once")]
    DuplicateNetwork(String),
    #[error("Network `{0}` has no RPC endpoint")]
    MissingRpc(String),
    #[error("Token `{symbol}` is configured more than once on `{network}`")]
    DuplicateToken { network: String, symbol: String },
    #[error("No wallets found in `{0}`")]
    NoWallets(PathBuf),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Network `{0}` is not configured")]
    UnknownNetwork(String),
    #[error("Could not create output directory `{path}`: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
