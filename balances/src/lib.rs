#![deny(clippy::dbg_macro)]

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod orchestrator;
pub mod report;
pub mod types;
pub mod wallets;

pub use aggregator::Aggregator;
pub use config::Config;
pub use fetcher::{BalanceFetcher, EvmFetcher};
pub use orchestrator::{Orchestrator, RunOptions, RunSummary};
