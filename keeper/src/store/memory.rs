use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, KeeperResult};
use crate::state::{Registry, UpkeepRegistration};
use crate::store::base::KeeperStore;
use crate::types::{JobId, RegistryId, UpkeepId};

#[derive(Debug)]
struct Inner {
    next_registry_id: RegistryId,
    /// One registry per job.
    registries: BTreeMap<JobId, Registry>,
    upkeeps: BTreeMap<(RegistryId, UpkeepId), UpkeepRegistration>,
}

/// In-memory [`KeeperStore`].
///
/// Enforces the same keys and constraints as the Postgres tables. All data is lost on restart.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let inner = Inner {
            next_registry_id: 1,
            registries: BTreeMap::new(),
            upkeeps: BTreeMap::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeeperStore for MemoryStore {
    async fn upsert_registry(&self, mut registry: Registry) -> KeeperResult<Registry> {
        let mut inner = self.inner.lock().await;

        registry.id = match inner.registries.get(&registry.job_id) {
            Some(existing) => existing.id,
            None => {
                let id = inner.next_registry_id;
                inner.next_registry_id += 1;
                id
            }
        };
        inner.registries.insert(registry.job_id, registry.clone());

        Ok(registry)
    }

    async fn upsert_upkeep(&self, upkeep: UpkeepRegistration) -> KeeperResult<()> {
        let mut inner = self.inner.lock().await;

        if upkeep.upkeep_id < 0 {
            bail!(
                ErrorKind::StoreQueryFailed,
                "Upkeep id must not be negative",
                upkeep.upkeep_id
            );
        }

        if !inner
            .registries
            .values()
            .any(|registry| registry.id == upkeep.registry_id)
        {
            bail!(
                ErrorKind::StoreQueryFailed,
                "Upkeep references an unknown registry",
                upkeep.registry_id
            );
        }

        inner
            .upkeeps
            .insert((upkeep.registry_id, upkeep.upkeep_id), upkeep);

        Ok(())
    }

    async fn lowest_unsynced_id(&self, registry_id: RegistryId) -> KeeperResult<UpkeepId> {
        let inner = self.inner.lock().await;

        let next_id = inner
            .upkeeps
            .range((registry_id, UpkeepId::MIN)..=(registry_id, UpkeepId::MAX))
            .next_back()
            .map(|((_, upkeep_id), _)| upkeep_id + 1)
            .unwrap_or(0);

        Ok(next_id)
    }

    async fn batch_delete_upkeeps_for_job(
        &self,
        job_id: JobId,
        upkeep_ids: Vec<UpkeepId>,
    ) -> KeeperResult<u64> {
        let mut inner = self.inner.lock().await;

        let Some(registry_id) = inner.registries.get(&job_id).map(|registry| registry.id) else {
            return Ok(0);
        };

        let mut deleted = 0;
        for upkeep_id in upkeep_ids {
            if inner.upkeeps.remove(&(registry_id, upkeep_id)).is_some() {
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    async fn get_registry_for_job(&self, job_id: JobId) -> KeeperResult<Option<Registry>> {
        let inner = self.inner.lock().await;

        Ok(inner.registries.get(&job_id).cloned())
    }

    async fn get_upkeeps_for_registry(
        &self,
        registry_id: RegistryId,
    ) -> KeeperResult<Vec<UpkeepRegistration>> {
        let inner = self.inner.lock().await;

        Ok(inner
            .upkeeps
            .range((registry_id, UpkeepId::MIN)..=(registry_id, UpkeepId::MAX))
            .map(|(_, upkeep)| upkeep.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{RegistryConfig, UpkeepConfig};
    use crate::types::Address;

    fn registry(job_id: JobId) -> Registry {
        Registry::from_chain(
            job_id,
            Address::repeat_byte(0xaa),
            Address::repeat_byte(0xbb),
            &RegistryConfig {
                check_gas_limit: 1_000,
                block_count_per_turn: 10,
            },
            &[Address::repeat_byte(0xbb)],
        )
        .unwrap()
    }

    fn upkeep(registry: &Registry, upkeep_id: UpkeepId) -> UpkeepRegistration {
        UpkeepRegistration::new(
            registry,
            upkeep_id,
            UpkeepConfig {
                execute_gas: 1,
                check_data: vec![],
            },
        )
    }

    #[tokio::test]
    async fn registry_id_is_stable_across_upserts() {
        let store = MemoryStore::new();

        let first = store.upsert_registry(registry(42)).await.unwrap();
        let mut changed = registry(42);
        changed.check_gas = 5;
        let second = store.upsert_registry(changed).await.unwrap();
        let other = store.upsert_registry(registry(43)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, other.id);
        assert_eq!(
            store.get_registry_for_job(42).await.unwrap().unwrap().check_gas,
            5
        );
    }

    #[tokio::test]
    async fn lowest_unsynced_id_is_one_past_the_maximum() {
        let store = MemoryStore::new();
        let registry = store.upsert_registry(registry(1)).await.unwrap();

        assert_eq!(store.lowest_unsynced_id(registry.id).await.unwrap(), 0);

        for id in [0, 1, 4] {
            store.upsert_upkeep(upkeep(&registry, id)).await.unwrap();
        }

        assert_eq!(store.lowest_unsynced_id(registry.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn batch_delete_is_scoped_to_the_job() {
        let store = MemoryStore::new();
        let mine = store.upsert_registry(registry(1)).await.unwrap();
        let theirs = store.upsert_registry(registry(2)).await.unwrap();
        for id in 0..3 {
            store.upsert_upkeep(upkeep(&mine, id)).await.unwrap();
            store.upsert_upkeep(upkeep(&theirs, id)).await.unwrap();
        }

        let deleted = store
            .batch_delete_upkeeps_for_job(1, vec![1, 2, 99])
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.get_upkeeps_for_registry(mine.id).await.unwrap().len(), 1);
        assert_eq!(store.get_upkeeps_for_registry(theirs.id).await.unwrap().len(), 3);
        assert_eq!(store.batch_delete_upkeeps_for_job(7, vec![0]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn constraints_match_the_postgres_schema() {
        let store = MemoryStore::new();
        let registry = store.upsert_registry(registry(1)).await.unwrap();

        let negative = store.upsert_upkeep(upkeep(&registry, -1)).await.unwrap_err();
        let mut orphan = upkeep(&registry, 0);
        orphan.registry_id = registry.id + 100;
        let orphan = store.upsert_upkeep(orphan).await.unwrap_err();

        assert_eq!(negative.kind(), ErrorKind::StoreQueryFailed);
        assert_eq!(orphan.kind(), ErrorKind::StoreQueryFailed);
    }
}
