use crate::{errors::ConfigError, types::Wallet};
use std::path::Path;

/// Reads one wallet address per line. Blank lines and `#` comments are
/// skipped, so positions count wallets only.
pub fn load_wallets(path: &Path) -> Result<Vec<Wallet>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let wallets = parse_wallets(&raw);

    if wallets.is_empty() {
        return Err(ConfigError::NoWallets(path.to_path_buf()));
    }

    Ok(wallets)
}

pub fn parse_wallets(raw: &str) -> Vec<Wallet> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(index, address)| Wallet {
            index,
            address: address.to_string(),
        })
        .collect()
}
