use tracing::{debug, error, info};

use crate::bail;
use crate::chain::ChainReader;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, KeeperError, KeeperResult};
use crate::reporter::ErrorReporter;
use crate::state::{KeeperJob, Registry};
use crate::store::KeeperStore;
use crate::sync::outcome::{SyncOutcome, SyncPhase};
use crate::workers::batch::{BatchSyncReport, BatchWorkerPool};

/// Runs full sync cycles for one keeper job.
///
/// A cycle refreshes the registry, adds upkeeps registered since the last cycle and removes
/// canceled ones. Every step is idempotent, so a failed cycle is repaired by the next one.
#[derive(Debug, Clone)]
pub struct FullSyncEngine<C, S, R> {
    job: KeeperJob,
    chain: C,
    store: S,
    reporter: R,
    pool: BatchWorkerPool<C, S>,
}

impl<C, S, R> FullSyncEngine<C, S, R>
where
    C: ChainReader + Clone + Send + Sync + 'static,
    S: KeeperStore + Clone + Send + Sync + 'static,
    R: ErrorReporter + Clone + Send + Sync + 'static,
{
    /// Creates an engine syncing at most `max_concurrent_upkeeps` upkeeps at once.
    ///
    /// `shutdown_rx` stops the dispatch of upkeep fetches.
    pub fn new(
        job: KeeperJob,
        chain: C,
        store: S,
        reporter: R,
        max_concurrent_upkeeps: usize,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        let pool = BatchWorkerPool::new(
            chain.clone(),
            store.clone(),
            max_concurrent_upkeeps,
            shutdown_rx,
        );

        Self {
            job,
            chain,
            store,
            reporter,
            pool,
        }
    }

    pub fn job(&self) -> &KeeperJob {
        &self.job
    }

    /// Runs the three phases in order, stopping at the first failure.
    pub async fn full_sync(&self) -> SyncOutcome {
        debug!(
            job_id = self.job.job_id,
            registry_contract = %self.job.contract_address,
            "full syncing registry"
        );

        let registry = match self.sync_registry().await {
            Ok(registry) => registry,
            Err(err) => return self.phase_failed(SyncPhase::SyncRegistry, err),
        };

        if let Err(err) = self.add_new_upkeeps(&registry).await {
            return self.phase_failed(SyncPhase::AddNewUpkeeps, err);
        }

        if let Err(err) = self.delete_canceled_upkeeps().await {
            return self.phase_failed(SyncPhase::DeleteCanceledUpkeeps, err);
        }

        SyncOutcome::Success
    }

    /// Reads the contract config and keeper list and upserts the registry.
    ///
    /// A failing config read is also recorded against the job, since the job may have no
    /// registry yet to show it on.
    pub async fn sync_registry(&self) -> KeeperResult<Registry> {
        let config = match self.chain.get_config().await {
            Ok(config) => config,
            Err(err) => {
                self.reporter.try_record_error(self.job.job_id, err.to_string());
                return Err(err);
            }
        };
        let keepers = self.chain.get_keeper_list().await?;

        let registry = Registry::from_chain(
            self.job.job_id,
            self.job.contract_address,
            self.job.from_address,
            &config,
            &keepers,
        )?;

        self.store.upsert_registry(registry).await
    }

    /// Syncs every upkeep registered on the contract past the highest stored one.
    pub async fn add_new_upkeeps(&self, registry: &Registry) -> KeeperResult<BatchSyncReport> {
        let next_upkeep_id = self.store.lowest_unsynced_id(registry.id).await?;
        let count_on_contract = self.chain.get_upkeep_count().await?;

        if next_upkeep_id > count_on_contract {
            bail!(
                ErrorKind::InvariantViolation,
                "Contract has fewer upkeeps than the local store",
                format!(
                    "next upkeep id {next_upkeep_id} is past the contract upkeep count {count_on_contract}"
                )
            );
        }

        let report = self
            .pool
            .batch_sync(registry, next_upkeep_id, count_on_contract)
            .await;

        if report.dispatched > 0 {
            info!(
                job_id = self.job.job_id,
                registry_contract = %registry.contract_address,
                synced = report.synced,
                failed = report.failed,
                abandoned = report.abandoned,
                "new upkeeps synced"
            );
        }

        Ok(report)
    }

    /// Deletes the upkeeps the contract reports as canceled.
    ///
    /// The delete is issued even for an empty list.
    pub async fn delete_canceled_upkeeps(&self) -> KeeperResult<u64> {
        let canceled = self.chain.get_canceled_upkeep_list().await?;

        self.store
            .batch_delete_upkeeps_for_job(self.job.job_id, canceled)
            .await
    }

    fn phase_failed(&self, phase: SyncPhase, cause: KeeperError) -> SyncOutcome {
        error!(
            job_id = self.job.job_id,
            registry_contract = %self.job.contract_address,
            %phase,
            error = %cause,
            "full sync phase failed"
        );

        SyncOutcome::PartialFailure { phase, cause }
    }
}
