use keeper_config::shared::{KeeperNodeConfig, StoreConfig};
use keeper_postgres::migrations::apply_keeper_migrations;
use tracing::info;

use crate::chain::ChainReader;
use crate::error::{ErrorKind, KeeperResult};
use crate::keeper_error;
use crate::reporter::{ErrorReporter, NoopErrorReporter, PostgresErrorReporter};
use crate::state::KeeperJob;
use crate::store::{KeeperStore, MemoryStore, PostgresStore};
use crate::workers::base::Worker;
use crate::workers::synchronizer::{RegistrySynchronizer, RegistrySynchronizerHandle};

/// Validates `config`, prepares the configured store and starts a synchronizer on `chain`.
///
/// The Postgres store is migrated before the synchronizer starts.
pub async fn start_synchronizer<C>(
    config: &KeeperNodeConfig,
    chain: C,
) -> KeeperResult<RegistrySynchronizerHandle>
where
    C: ChainReader + Clone + Send + Sync + 'static,
{
    config.validate().map_err(|err| {
        keeper_error!(
            ErrorKind::ConfigError,
            "Invalid keeper node configuration",
            err,
            source: err
        )
    })?;
    let job = KeeperJob::try_from(&config.job)?;

    // Each store is dispatched statically.
    match &config.store {
        StoreConfig::Memory => {
            info!(job_id = job.job_id, "starting synchronizer with the memory store");

            start(job, config, chain, MemoryStore::new(), NoopErrorReporter).await
        }
        StoreConfig::Postgres(connection) => {
            apply_keeper_migrations(connection).await?;

            let store = PostgresStore::new(connection);
            let reporter = PostgresErrorReporter::new(store.pool().clone());
            info!(
                job_id = job.job_id,
                host = %connection.host,
                database = %connection.name,
                "starting synchronizer with the postgres store"
            );

            start(job, config, chain, store, reporter).await
        }
    }
}

async fn start<C, S, R>(
    job: KeeperJob,
    config: &KeeperNodeConfig,
    chain: C,
    store: S,
    reporter: R,
) -> KeeperResult<RegistrySynchronizerHandle>
where
    C: ChainReader + Clone + Send + Sync + 'static,
    S: KeeperStore + Clone + Send + Sync + 'static,
    R: ErrorReporter + Clone + Send + Sync + 'static,
{
    RegistrySynchronizer::new(job, &config.synchronizer, chain, store, reporter)
        .start()
        .await
}
