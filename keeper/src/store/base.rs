use std::future::Future;

use crate::error::KeeperResult;
use crate::state::{Registry, UpkeepRegistration};
use crate::types::{JobId, RegistryId, UpkeepId};

/// Persistence of registries and upkeep registrations.
///
/// Every write is an idempotent upsert or delete, so a sync cycle can be repeated at will.
/// Implementations must accept concurrent upserts of distinct upkeeps.
pub trait KeeperStore {
    /// Inserts or overwrites the registry of `registry.job_id`.
    ///
    /// The returned registry carries the id assigned by the store, which stays stable across
    /// upserts for the same job.
    fn upsert_registry(
        &self,
        registry: Registry,
    ) -> impl Future<Output = KeeperResult<Registry>> + Send;

    /// Inserts or updates a registration keyed by `(registry_id, upkeep_id)`.
    fn upsert_upkeep(
        &self,
        upkeep: UpkeepRegistration,
    ) -> impl Future<Output = KeeperResult<()>> + Send;

    /// Returns one past the highest stored upkeep id of the registry, or 0 when it has none.
    fn lowest_unsynced_id(
        &self,
        registry_id: RegistryId,
    ) -> impl Future<Output = KeeperResult<UpkeepId>> + Send;

    /// Deletes the listed upkeeps from the registry owned by `job_id`.
    ///
    /// Returns how many rows were removed. Unknown ids are ignored.
    fn batch_delete_upkeeps_for_job(
        &self,
        job_id: JobId,
        upkeep_ids: Vec<UpkeepId>,
    ) -> impl Future<Output = KeeperResult<u64>> + Send;

    fn get_registry_for_job(
        &self,
        job_id: JobId,
    ) -> impl Future<Output = KeeperResult<Option<Registry>>> + Send;

    /// Returns the registrations of a registry ordered by upkeep id.
    fn get_upkeeps_for_registry(
        &self,
        registry_id: RegistryId,
    ) -> impl Future<Output = KeeperResult<Vec<UpkeepRegistration>>> + Send;
}
