use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::KeeperResult;
use crate::state::{Registry, UpkeepRegistration};
use crate::store::KeeperStore;
use crate::test_utils::notify::TimedNotify;
use crate::types::{JobId, RegistryId, UpkeepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreMethod {
    UpsertRegistry,
    UpsertUpkeep,
    LowestUnsyncedId,
    BatchDeleteUpkeepsForJob,
    GetRegistryForJob,
    GetUpkeepsForRegistry,
}

type UpsertCondition = (u64, Arc<Notify>);

#[derive(Default)]
struct Inner {
    calls: HashMap<StoreMethod, u64>,
    delete_calls: Vec<(JobId, Vec<UpkeepId>)>,
    successful_upkeep_upserts: u64,
    upsert_conditions: Vec<UpsertCondition>,
}

impl Inner {
    fn check_conditions(&mut self) {
        let upserts = self.successful_upkeep_upserts;
        self.upsert_conditions.retain(|(target, notify)| {
            let should_retain = upserts < *target;
            if !should_retain {
                notify.notify_one();
            }
            should_retain
        });
    }
}

/// [`KeeperStore`] wrapper that records calls and wakes tests once enough upkeeps were stored.
#[derive(Clone)]
pub struct NotifyingStore<S> {
    store: S,
    inner: Arc<Mutex<Inner>>,
}

impl<S> NotifyingStore<S> {
    pub fn wrap(store: S) -> Self {
        Self {
            store,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn calls(&self, method: StoreMethod) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.calls.get(&method).copied().unwrap_or(0)
    }

    /// Arguments of every `batch_delete_upkeeps_for_job` call, in call order.
    pub fn delete_calls(&self) -> Vec<(JobId, Vec<UpkeepId>)> {
        self.inner.lock().unwrap().delete_calls.clone()
    }

    pub fn successful_upkeep_upserts(&self) -> u64 {
        self.inner.lock().unwrap().successful_upkeep_upserts
    }

    /// Returns a notification fired once `count` upkeep upserts succeeded in total.
    pub fn notify_on_upkeep_upserts(&self, count: u64) -> TimedNotify {
        let notify = Arc::new(Notify::new());
        let mut inner = self.inner.lock().unwrap();
        inner.upsert_conditions.push((count, notify.clone()));
        inner.check_conditions();

        TimedNotify::new(notify)
    }

    pub fn reset_calls(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.clear();
        inner.delete_calls.clear();
    }

    fn record_call(&self, method: StoreMethod) {
        *self.inner.lock().unwrap().calls.entry(method).or_insert(0) += 1;
    }
}

impl<S> KeeperStore for NotifyingStore<S>
where
    S: KeeperStore + Send + Sync,
{
    async fn upsert_registry(&self, registry: Registry) -> KeeperResult<Registry> {
        self.record_call(StoreMethod::UpsertRegistry);
        self.store.upsert_registry(registry).await
    }

    async fn upsert_upkeep(&self, upkeep: UpkeepRegistration) -> KeeperResult<()> {
        self.record_call(StoreMethod::UpsertUpkeep);
        let result = self.store.upsert_upkeep(upkeep).await;

        if result.is_ok() {
            let mut inner = self.inner.lock().unwrap();
            inner.successful_upkeep_upserts += 1;
            inner.check_conditions();
        }

        result
    }

    async fn lowest_unsynced_id(&self, registry_id: RegistryId) -> KeeperResult<UpkeepId> {
        self.record_call(StoreMethod::LowestUnsyncedId);
        self.store.lowest_unsynced_id(registry_id).await
    }

    async fn batch_delete_upkeeps_for_job(
        &self,
        job_id: JobId,
        upkeep_ids: Vec<UpkeepId>,
    ) -> KeeperResult<u64> {
        {
            let mut inner = self.inner.lock().unwrap();
            *inner
                .calls
                .entry(StoreMethod::BatchDeleteUpkeepsForJob)
                .or_insert(0) += 1;
            inner.delete_calls.push((job_id, upkeep_ids.clone()));
        }

        self.store
            .batch_delete_upkeeps_for_job(job_id, upkeep_ids)
            .await
    }

    async fn get_registry_for_job(&self, job_id: JobId) -> KeeperResult<Option<Registry>> {
        self.record_call(StoreMethod::GetRegistryForJob);
        self.store.get_registry_for_job(job_id).await
    }

    async fn get_upkeeps_for_registry(
        &self,
        registry_id: RegistryId,
    ) -> KeeperResult<Vec<UpkeepRegistration>> {
        self.record_call(StoreMethod::GetUpkeepsForRegistry);
        self.store.get_upkeeps_for_registry(registry_id).await
    }
}
