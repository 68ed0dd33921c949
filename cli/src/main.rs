#![deny(clippy::all)]
#![deny(clippy::dbg_macro)]

use anyhow::{bail, Context, Error};
use env_logger::{Builder, Env};
use log::{error, info};
use rusty_balances::{
    orchestrator::{DEFAULT_ERROR_MARKER, DEFAULT_MAX_CONCURRENCY},
    types::Selection,
    wallets::load_wallets,
    Config, EvmFetcher, Orchestrator, RunOptions,
};
use std::path::PathBuf;
use structopt::StructOpt;

mod prompt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rusty-balances",
    about = "Writes wallet balances of every configured token, one CSV per network."
)]
struct Opt {
    /// Set logging level
    #[structopt(short, long, default_value = "info")]
    log: String,

    /// Networks and tokens to query [env: BALANCES_CONFIG, default: config.yaml]
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Wallet addresses, one per line [env: BALANCES_WALLETS, default: wallets.txt]
    #[structopt(short, long, parse(from_os_str))]
    wallets: Option<PathBuf>,

    /// Directory the reports are written to [env: BALANCES_OUTPUT, default: results]
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Only query this network, skips the prompt
    #[structopt(short, long, conflicts_with = "all")]
    network: Option<String>,

    /// Query every network, skips the prompt
    #[structopt(short, long)]
    all: bool,

    /// Maximum number of simultaneous batch calls per network
    #[structopt(short, long, default_value = "8")]
    max_concurrency: usize,

    /// Cell content for balances that could not be decoded
    #[structopt(short, long)]
    error_marker: Option<String>,
}

fn path_or_env(value: Option<PathBuf>, var: &str, default: &str) -> PathBuf {
    value
        .or_else(|| std::env::var_os(var).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let opt = Opt::from_args();

    Builder::from_env(Env::default().default_filter_or(&opt.log)).init();

    if let Err(e) = try_main(opt).await {
        error!("{e:#}");
        std::process::exit(1);
    }

    info!("Exiting gracefully");
}

async fn try_main(opt: Opt) -> Result<(), Error> {
    let config_path = path_or_env(opt.config, "BALANCES_CONFIG", "config.yaml");
    let wallets_path = path_or_env(opt.wallets, "BALANCES_WALLETS", "wallets.txt");

    let config = Config::load(&config_path)
        .with_context(|| format!("Error when reading networks from {}", config_path.display()))?;
    let wallets = load_wallets(&wallets_path)
        .with_context(|| format!("Error reading wallets from {}", wallets_path.display()))?;

    println!(
        "Found {} networks and {} wallets",
        config.networks.len(),
        wallets.len()
    );

    let selection = match (opt.all, opt.network) {
        (true, _) => Selection::All,
        (false, Some(name)) => Selection::Network(name),
        (false, None) => prompt::select_network(&config.networks)
            .context("Error when selecting network")?,
    };

    let options = RunOptions {
        output_dir: path_or_env(opt.output, "BALANCES_OUTPUT", "results"),
        max_concurrency: if opt.max_concurrency == 0 {
            DEFAULT_MAX_CONCURRENCY
        } else {
            opt.max_concurrency
        },
        error_marker: opt
            .error_marker
            .unwrap_or_else(|| DEFAULT_ERROR_MARKER.to_string()),
    };

    let summary = Orchestrator::new(EvmFetcher, options)
        .run(&config.networks, &selection, &wallets)
        .await?;

    for path in &summary.written {
        println!("Wrote {}", path.display());
    }
    println!("{summary}");

    if !summary.is_complete() {
        bail!(
            "{} of {} reports could not be written",
            summary.failed_reports.len(),
            summary.failed_reports.len() + summary.written.len()
        );
    }

    Ok(())
}
