use std::time::Duration;

use keeper_config::shared::PgConnectionConfig;
use keeper_postgres::keeper::{self as queries, RegistryRow, UpkeepRegistrationRow};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use crate::error::{ErrorKind, KeeperError, KeeperResult};
use crate::keeper_error;
use crate::state::{Registry, UpkeepRegistration};
use crate::store::base::KeeperStore;
use crate::types::{Address, JobId, RegistryId, UpkeepId};

/// Upper bound on pooled connections, sized for concurrent upkeep upserts.
const MAX_POOL_CONNECTIONS: u32 = 10;

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a lazily connected pool. Connections are opened on demand and closed when idle.
fn create_database_pool(config: &PgConnectionConfig) -> PgPool {
    PgPoolOptions::new()
        .min_connections(0)
        .max_connections(MAX_POOL_CONNECTIONS)
        .idle_timeout(Some(IDLE_TIMEOUT))
        .connect_lazy_with(config.connect_options())
}

/// [`KeeperStore`] backed by the `keeper` schema of a Postgres database.
///
/// The tables must exist, see [`keeper_postgres::migrations::apply_keeper_migrations`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(config: &PgConnectionConfig) -> Self {
        Self {
            pool: create_database_pool(config),
        }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TryFrom<&Registry> for RegistryRow {
    type Error = KeeperError;

    fn try_from(registry: &Registry) -> KeeperResult<Self> {
        Ok(RegistryRow {
            id: registry.id,
            job_id: registry.job_id,
            contract_address: registry.contract_address.as_bytes().to_vec(),
            from_address: registry.from_address.as_bytes().to_vec(),
            check_gas: registry.check_gas,
            block_count_per_turn: registry.block_count_per_turn,
            keeper_index: registry.keeper_index,
            num_keepers: registry.num_keepers,
            keeper_index_map: serde_json::to_value(&registry.keeper_index_map)?,
        })
    }
}

impl TryFrom<RegistryRow> for Registry {
    type Error = KeeperError;

    fn try_from(row: RegistryRow) -> KeeperResult<Self> {
        Ok(Registry {
            id: row.id,
            job_id: row.job_id,
            contract_address: Address::try_from(row.contract_address.as_slice())?,
            from_address: Address::try_from(row.from_address.as_slice())?,
            check_gas: row.check_gas,
            block_count_per_turn: row.block_count_per_turn,
            keeper_index: row.keeper_index,
            num_keepers: row.num_keepers,
            keeper_index_map: serde_json::from_value(row.keeper_index_map)?,
        })
    }
}

impl TryFrom<UpkeepRegistration> for UpkeepRegistrationRow {
    type Error = KeeperError;

    fn try_from(upkeep: UpkeepRegistration) -> KeeperResult<Self> {
        let execute_gas = i64::try_from(upkeep.execute_gas).map_err(|err| {
            keeper_error!(
                ErrorKind::ConversionError,
                "Execute gas does not fit in a bigint column",
                upkeep.execute_gas,
                source: err
            )
        })?;

        Ok(UpkeepRegistrationRow {
            registry_id: upkeep.registry_id,
            upkeep_id: upkeep.upkeep_id,
            execute_gas,
            check_data: upkeep.check_data,
            positioning_constant: upkeep.positioning_constant,
        })
    }
}

impl TryFrom<UpkeepRegistrationRow> for UpkeepRegistration {
    type Error = KeeperError;

    fn try_from(row: UpkeepRegistrationRow) -> KeeperResult<Self> {
        Ok(UpkeepRegistration {
            registry_id: row.registry_id,
            upkeep_id: row.upkeep_id,
            check_data: row.check_data,
            execute_gas: u64::try_from(row.execute_gas)?,
            positioning_constant: row.positioning_constant,
        })
    }
}

impl KeeperStore for PostgresStore {
    async fn upsert_registry(&self, mut registry: Registry) -> KeeperResult<Registry> {
        let row = RegistryRow::try_from(&registry)?;
        registry.id = queries::upsert_registry(&self.pool, &row).await?;

        debug!(
            job_id = registry.job_id,
            registry_id = registry.id,
            "registry upserted"
        );

        Ok(registry)
    }

    async fn upsert_upkeep(&self, upkeep: UpkeepRegistration) -> KeeperResult<()> {
        let row = UpkeepRegistrationRow::try_from(upkeep)?;
        queries::upsert_upkeep(&self.pool, &row).await?;

        Ok(())
    }

    async fn lowest_unsynced_id(&self, registry_id: RegistryId) -> KeeperResult<UpkeepId> {
        Ok(queries::lowest_unsynced_id(&self.pool, registry_id).await?)
    }

    async fn batch_delete_upkeeps_for_job(
        &self,
        job_id: JobId,
        upkeep_ids: Vec<UpkeepId>,
    ) -> KeeperResult<u64> {
        let deleted = queries::batch_delete_upkeeps_for_job(&self.pool, job_id, &upkeep_ids).await?;

        debug!(job_id, requested = upkeep_ids.len(), deleted, "canceled upkeeps deleted");

        Ok(deleted)
    }

    async fn get_registry_for_job(&self, job_id: JobId) -> KeeperResult<Option<Registry>> {
        queries::get_registry_for_job(&self.pool, job_id)
            .await?
            .map(Registry::try_from)
            .transpose()
    }

    async fn get_upkeeps_for_registry(
        &self,
        registry_id: RegistryId,
    ) -> KeeperResult<Vec<UpkeepRegistration>> {
        queries::get_upkeeps_for_registry(&self.pool, registry_id)
            .await?
            .into_iter()
            .map(UpkeepRegistration::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn registry_row_conversion_preserves_keeper_map() {
        let registry = Registry {
            id: 3,
            job_id: 42,
            contract_address: Address::repeat_byte(0xaa),
            from_address: Address::repeat_byte(0xcc),
            check_gas: 100,
            block_count_per_turn: 20,
            keeper_index: 1,
            num_keepers: 2,
            keeper_index_map: BTreeMap::from([
                (Address::repeat_byte(0xbb), 0),
                (Address::repeat_byte(0xcc), 1),
            ]),
        };

        let row = RegistryRow::try_from(&registry).unwrap();
        assert_eq!(row.contract_address, vec![0xaa; 20]);

        assert_eq!(Registry::try_from(row).unwrap(), registry);
    }

    #[test]
    fn oversized_execute_gas_is_rejected() {
        let upkeep = UpkeepRegistration {
            registry_id: 1,
            upkeep_id: 0,
            check_data: vec![],
            execute_gas: u64::MAX,
            positioning_constant: 0,
        };

        let err = UpkeepRegistrationRow::try_from(upkeep).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }

    #[test]
    fn corrupt_address_bytes_are_invalid_data() {
        let row = RegistryRow {
            id: 1,
            job_id: 1,
            contract_address: vec![1, 2, 3],
            from_address: vec![0; 20],
            check_gas: 0,
            block_count_per_turn: 0,
            keeper_index: -1,
            num_keepers: 0,
            keeper_index_map: serde_json::json!({}),
        };

        assert_eq!(
            Registry::try_from(row).unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }
}
