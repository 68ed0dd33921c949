use crate::{
    aggregator::{allocate_table, Aggregator, MergeStats},
    errors::{FetchError, ReportError, RunError},
    fetcher::BalanceFetcher,
    report::write_report,
    types::{Network, PerNetworkTable, Selection, Token, Wallet},
};
use log::{debug, error, info, warn};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Semaphore;

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_ERROR_MARKER: &str = "#ERR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// Upper bound of in-flight fetches per network.
    pub max_concurrency: usize,
    pub error_marker: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("results"),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub network: Arc<Network>,
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Fetched { recorded: usize, failed: usize },
    ConnectionFailed(String),
    BatchFailed(String),
    Aborted(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Fetched { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub network: String,
    pub token: String,
    pub outcome: TaskOutcome,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub tasks: Vec<TaskReport>,
    pub written: Vec<PathBuf>,
    pub failed_reports: Vec<(String, ReportError)>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.iter().filter(|t| !t.outcome.is_success())
    }

    pub fn is_complete(&self) -> bool {
        self.failed_reports.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let failed = self.failed_tasks().count();

        writeln!(
            f,
            "{} of {} fetches succeeded, {} reports written, {} failed",
            self.tasks.len() - failed,
            self.tasks.len(),
            self.written.len(),
            self.failed_reports.len()
        )?;

        for task in self.failed_tasks() {
            writeln!(f, "  {}/{}: {:?}", task.network, task.token, task.outcome)?;
        }

        for (network, e) in &self.failed_reports {
            writeln!(f, "  report {network}: {e}")?;
        }

        write!(f, "Lead time: {:?}", self.elapsed)
    }
}

/// Resolves which networks a run covers, keeping config order.
pub fn resolve_scope(networks: &[Network], selection: &Selection) -> Result<Vec<Network>, RunError> {
    match selection {
        Selection::All => Ok(networks.to_vec()),
        Selection::Network(name) => networks
            .iter()
            .find(|n| &n.name == name)
            .map(|n| vec![n.clone()])
            .ok_or_else(|| RunError::UnknownNetwork(name.clone())),
    }
}

/// One task per (network, token) pair. A pair seen twice is only planned once.
pub fn plan_tasks(networks: &[Network]) -> Vec<FetchTask> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::new();

    for network in networks {
        let shared = Arc::new(network.clone());

        for token in &network.tokens {
            if !seen.insert((network.name.clone(), token.symbol.clone())) {
                warn!("skipping duplicate task {}/{}", network.name, token.symbol);
                continue;
            }

            tasks.push(FetchTask {
                network: Arc::clone(&shared),
                token: token.clone(),
            });
        }
    }

    tasks
}

pub struct Orchestrator<F> {
    fetcher: Arc<F>,
    options: RunOptions,
}

impl<F> Orchestrator<F>
where
    F: BalanceFetcher + 'static,
{
    pub fn new(fetcher: F, options: RunOptions) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            options,
        }
    }

    pub async fn run(
        &self,
        networks: &[Network],
        selection: &Selection,
        wallets: &[Wallet],
    ) -> Result<RunSummary, RunError> {
        let started = Instant::now();

        let scope = resolve_scope(networks, selection)?;

        std::fs::create_dir_all(&self.options.output_dir).map_err(|source| {
            RunError::OutputDir {
                path: self.options.output_dir.clone(),
                source,
            }
        })?;

        let (tables, tasks) = self.fetch_all(&scope, wallets).await;

        debug!("all fetches settled, writing reports");
        let (written, failed_reports) = self.write_reports(&scope, wallets, tables);

        Ok(RunSummary {
            tasks,
            written,
            failed_reports,
            elapsed: started.elapsed(),
        })
    }

    /// Launches every (network, token) fetch at once and waits for all of
    /// them. Per-network semaphores bound how many hit an endpoint together.
    pub async fn fetch_all(
        &self,
        networks: &[Network],
        wallets: &[Wallet],
    ) -> (HashMap<String, PerNetworkTable>, Vec<TaskReport>) {
        let aggregator = Arc::new(Aggregator::new());
        let wallets: Arc<[Wallet]> = wallets.into();
        let permits = self.options.max_concurrency.max(1);

        let semaphores = networks
            .iter()
            .map(|n| (n.name.clone(), Arc::new(Semaphore::new(permits))))
            .collect::<HashMap<_, _>>();

        let tasks = plan_tasks(networks);
        info!(
            "launching {} fetches over {} networks for {} wallets",
            tasks.len(),
            networks.len(),
            wallets.len()
        );

        let handles = tasks
            .into_iter()
            .map(|task| {
                let key = (task.network.name.clone(), task.token.symbol.clone());
                let semaphore = semaphores
                    .get(&task.network.name)
                    .cloned()
                    .unwrap_or_else(|| Arc::new(Semaphore::new(permits)));

                let handle = tokio::spawn(run_task(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&aggregator),
                    semaphore,
                    task,
                    Arc::clone(&wallets),
                ));

                (key, handle)
            })
            .collect::<Vec<_>>();

        let (keys, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();

        let reports = futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(keys)
            .map(|(joined, (network, token))| match joined {
                Ok(outcome) => TaskReport {
                    network,
                    token,
                    outcome,
                },
                Err(e) => {
                    error!("{network}/{token}: task aborted: {e}");
                    TaskReport {
                        network,
                        token,
                        outcome: TaskOutcome::Aborted(e.to_string()),
                    }
                }
            })
            .collect();

        let tables = match Arc::try_unwrap(aggregator) {
            Ok(aggregator) => aggregator.into_tables().await,
            Err(shared) => shared.snapshot().await,
        };

        (tables, reports)
    }

    /// Writes every network's report, collecting failures instead of
    /// stopping at the first one.
    pub fn write_reports(
        &self,
        networks: &[Network],
        wallets: &[Wallet],
        mut tables: HashMap<String, PerNetworkTable>,
    ) -> (Vec<PathBuf>, Vec<(String, ReportError)>) {
        let mut written = Vec::new();
        let mut failed = Vec::new();

        for network in networks {
            let rows = tables
                .remove(&network.name)
                .unwrap_or_else(|| allocate_table(wallets));

            match write_report(
                &self.options.output_dir,
                network,
                &rows,
                &self.options.error_marker,
            ) {
                Ok(path) => {
                    info!(
                        "the results of {} {} were written to {}",
                        rows.len(),
                        network.name,
                        path.display()
                    );
                    written.push(path);
                }
                Err(e) => {
                    error!("failed to write report for {}: {e}", network.name);
                    failed.push((network.name.clone(), e));
                }
            }
        }

        (written, failed)
    }
}

async fn run_task<F>(
    fetcher: Arc<F>,
    aggregator: Arc<Aggregator>,
    semaphore: Arc<Semaphore>,
    task: FetchTask,
    wallets: Arc<[Wallet]>,
) -> TaskOutcome
where
    F: BalanceFetcher + ?Sized,
{
    let FetchTask { network, token } = task;

    let fetched = {
        let _permit = semaphore.acquire().await;
        fetcher.fetch(&network, &token, &wallets).await
    };

    match fetched {
        Ok(results) => {
            let MergeStats { recorded, failed } = aggregator
                .merge(&network.name, &token, &wallets, &results)
                .await;

            info!(
                "{}/{}: recorded {recorded} balances, {failed} failed",
                network.name, token.symbol
            );

            TaskOutcome::Fetched { recorded, failed }
        }
        Err(e @ FetchError::Connection { .. }) => {
            error!("{}/{}: {e}", network.name, token.symbol);
            TaskOutcome::ConnectionFailed(e.to_string())
        }
        Err(e) => {
            error!("{}/{}: {e}", network.name, token.symbol);
            TaskOutcome::BatchFailed(e.to_string())
        }
    }
}
