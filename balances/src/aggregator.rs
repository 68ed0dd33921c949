use crate::types::{BalanceRow, PerNetworkTable, Token, Wallet, WalletBalance};
use log::warn;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

/// Counts of what a single merge wrote into a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub recorded: usize,
    pub failed: usize,
}

/// Per-network balance tables filled concurrently by fetch tasks.
///
/// Every network table sits behind its own lock, merges for different
/// networks never contend. The outer map lock is only held to look up or
/// allocate a table.
#[derive(Default)]
pub struct Aggregator {
    tables: RwLock<HashMap<String, Arc<Mutex<PerNetworkTable>>>>,
}

pub fn allocate_table(wallets: &[Wallet]) -> PerNetworkTable {
    wallets.iter().map(BalanceRow::new).collect()
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    async fn table(&self, network: &str, wallets: &[Wallet]) -> Arc<Mutex<PerNetworkTable>> {
        if let Some(table) = self.tables.read().await.get(network) {
            return Arc::clone(table);
        }

        let mut tables = self.tables.write().await;

        Arc::clone(
            tables
                .entry(network.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(allocate_table(wallets)))),
        )
    }

    /// Writes one token's results into the network's table, allocating the
    /// table on first use.
    ///
    /// `results` is positional: `results[i]` belongs to `wallets[i]`. Failed
    /// lookups leave the balance absent and mark the token as failed for that
    /// row.
    pub async fn merge(
        &self,
        network: &str,
        token: &Token,
        wallets: &[Wallet],
        results: &[WalletBalance],
    ) -> MergeStats {
        let table = self.table(network, wallets).await;
        let mut rows = table.lock().await;
        let mut stats = MergeStats::default();

        if results.len() != rows.len() {
            warn!(
                "{network}/{}: got {} results for {} wallets",
                token.symbol,
                results.len(),
                rows.len()
            );
        }

        for (row, result) in rows.iter_mut().zip(results) {
            if row.address != result.address {
                warn!(
                    "{network}/{}: result for `{}` does not match row {} (`{}`)",
                    token.symbol, result.address, row.index, row.address
                );
                continue;
            }

            match &result.balance {
                Ok(balance) => {
                    row.tokens.insert(token.symbol.clone(), balance.clone());
                    row.failed.remove(&token.symbol);
                    stats.recorded += 1;
                }
                Err(e) => {
                    warn!("{network}/{}: {e}", token.symbol);
                    if !row.tokens.contains_key(&token.symbol) {
                        row.failed.insert(token.symbol.clone());
                    }
                    stats.failed += 1;
                }
            }
        }

        stats
    }

    /// Copies the current tables out without consuming the aggregator.
    pub async fn snapshot(&self) -> HashMap<String, PerNetworkTable> {
        let tables = self.tables.read().await;
        let mut snapshot = HashMap::with_capacity(tables.len());

        for (network, table) in tables.iter() {
            snapshot.insert(network.clone(), table.lock().await.clone());
        }

        snapshot
    }

    /// Freezes the aggregator once every merge has completed. A table still
    /// shared with a merge is waited on and copied.
    pub async fn into_tables(self) -> HashMap<String, PerNetworkTable> {
        let mut tables = HashMap::new();

        for (network, table) in self.tables.into_inner() {
            let rows = match Arc::try_unwrap(table) {
                Ok(table) => table.into_inner(),
                Err(shared) => {
                    warn!("{network}: table still shared while freezing");
                    shared.lock().await.clone()
                }
            };

            tables.insert(network, rows);
        }

        tables
    }
}
