use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::chain::ChainReader;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, KeeperResult};
use crate::keeper_error;
use crate::state::{Registry, UpkeepRegistration};
use crate::store::KeeperStore;
use crate::types::UpkeepId;

/// Counters of one [`BatchWorkerPool::batch_sync`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSyncReport {
    /// Upkeeps for which a task was spawned.
    pub dispatched: u64,
    pub synced: u64,
    pub failed: u64,
    /// Upkeeps never dispatched because shutdown was requested.
    pub abandoned: u64,
}

/// Fetches and stores ranges of upkeeps with bounded concurrency.
#[derive(Debug, Clone)]
pub struct BatchWorkerPool<C, S> {
    chain: C,
    store: S,
    max_concurrent_upkeeps: usize,
    shutdown_rx: ShutdownRx,
}

impl<C, S> BatchWorkerPool<C, S>
where
    C: ChainReader + Clone + Send + Sync + 'static,
    S: KeeperStore + Clone + Send + Sync + 'static,
{
    /// Creates a pool running at most `max_concurrent_upkeeps` fetches at once (at least one).
    pub fn new(chain: C, store: S, max_concurrent_upkeeps: usize, shutdown_rx: ShutdownRx) -> Self {
        Self {
            chain,
            store,
            max_concurrent_upkeeps: max_concurrent_upkeeps.max(1),
            shutdown_rx,
        }
    }

    /// Syncs every upkeep in `[start, end)` of a persisted registry.
    ///
    /// Returns once every dispatched task finished. When shutdown is requested the remaining ids
    /// are abandoned, while tasks already running are drained. Per-upkeep failures are logged
    /// and counted, they never fail the call.
    pub async fn batch_sync(
        &self,
        registry: &Registry,
        start: UpkeepId,
        end: UpkeepId,
    ) -> BatchSyncReport {
        let mut report = BatchSyncReport::default();
        if start >= end {
            return report;
        }

        debug!(
            job_id = registry.job_id,
            registry_contract = %registry.contract_address,
            start,
            end,
            "syncing upkeeps on registry"
        );

        let registry = Arc::new(registry.clone());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_upkeeps));
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut join_set = JoinSet::new();

        for upkeep_id in start..end {
            if shutdown_rx.is_shutdown() {
                report.abandoned = (end - upkeep_id) as u64;
                break;
            }

            let permit = tokio::select! {
                biased;

                _ = shutdown_rx.wait_for_shutdown() => {
                    report.abandoned = (end - upkeep_id) as u64;
                    break;
                }

                permit = semaphore.clone().acquire_owned() => permit,
            };

            let Ok(permit) = permit else {
                error!(upkeep_id, "upkeep semaphore closed, abandoning remaining upkeeps");
                report.abandoned = (end - upkeep_id) as u64;
                break;
            };

            let chain = self.chain.clone();
            let store = self.store.clone();
            let registry = registry.clone();
            join_set.spawn(async move {
                let result = tokio::spawn(sync_upkeep(chain, store, registry.clone(), upkeep_id))
                    .await
                    .unwrap_or_else(|join_err| {
                        Err(keeper_error!(
                            ErrorKind::WorkerPanic,
                            "Upkeep sync task panicked",
                            join_err
                        ))
                    });

                drop(permit);

                if let Err(err) = &result {
                    error!(
                        upkeep_id,
                        registry_contract = %registry.contract_address,
                        error = %err,
                        "unable to sync upkeep on registry"
                    );
                }

                result
            });
            report.dispatched += 1;
        }

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(Ok(())) => report.synced += 1,
                Ok(Err(_)) => report.failed += 1,
                Err(join_err) => {
                    error!(
                        registry_contract = %registry.contract_address,
                        error = %join_err,
                        "upkeep sync task panicked"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.abandoned > 0 {
            info!(
                job_id = registry.job_id,
                registry_contract = %registry.contract_address,
                dispatched = report.dispatched,
                abandoned = report.abandoned,
                "upkeep sync interrupted by shutdown"
            );
        }

        report
    }
}

/// Fetches one upkeep and upserts its registration.
async fn sync_upkeep<C, S>(
    chain: C,
    store: S,
    registry: Arc<Registry>,
    upkeep_id: UpkeepId,
) -> KeeperResult<()>
where
    C: ChainReader,
    S: KeeperStore,
{
    let config = chain.get_upkeep(upkeep_id).await?;
    let upkeep = UpkeepRegistration::new(&registry, upkeep_id, config);
    store.upsert_upkeep(upkeep).await?;

    Ok(())
}
