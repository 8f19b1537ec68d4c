use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bail;
use crate::chain::{ChainReader, RegistryConfig, UpkeepConfig};
use crate::error::{ErrorKind, KeeperResult};
use crate::types::{Address, UpkeepId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainMethod {
    GetConfig,
    GetKeeperList,
    GetUpkeepCount,
    GetUpkeep,
    GetCanceledUpkeepList,
}

const CHAIN_METHODS: [ChainMethod; 5] = [
    ChainMethod::GetConfig,
    ChainMethod::GetKeeperList,
    ChainMethod::GetUpkeepCount,
    ChainMethod::GetUpkeep,
    ChainMethod::GetCanceledUpkeepList,
];

#[derive(Debug, Default)]
struct Faults {
    failing_methods: HashSet<ChainMethod>,
    failing_upkeeps: HashSet<UpkeepId>,
    panicking_upkeeps: HashSet<UpkeepId>,
    upkeep_latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct Counters {
    calls: [AtomicU64; CHAIN_METHODS.len()],
    in_flight_upkeeps: AtomicUsize,
    max_in_flight_upkeeps: AtomicUsize,
    fetched_upkeeps: Mutex<Vec<UpkeepId>>,
    paused: AtomicBool,
}

/// [`ChainReader`] wrapper injecting failures, panics and latency, and counting calls.
///
/// Clones share faults and counters.
#[derive(Debug, Clone)]
pub struct FaultyChainReader<C> {
    inner: C,
    faults: Arc<Mutex<Faults>>,
    counters: Arc<Counters>,
}

fn method_index(method: ChainMethod) -> usize {
    CHAIN_METHODS
        .iter()
        .position(|m| *m == method)
        .unwrap_or_default()
}

impl<C> FaultyChainReader<C> {
    pub fn wrap(inner: C) -> Self {
        Self {
            inner,
            faults: Arc::new(Mutex::new(Faults::default())),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn fail_method(&self, method: ChainMethod, fail: bool) {
        let mut faults = self.faults.lock().unwrap();
        if fail {
            faults.failing_methods.insert(method);
        } else {
            faults.failing_methods.remove(&method);
        }
    }

    pub fn fail_upkeeps(&self, upkeep_ids: impl IntoIterator<Item = UpkeepId>) {
        self.faults
            .lock()
            .unwrap()
            .failing_upkeeps
            .extend(upkeep_ids);
    }

    pub fn panic_on_upkeeps(&self, upkeep_ids: impl IntoIterator<Item = UpkeepId>) {
        self.faults
            .lock()
            .unwrap()
            .panicking_upkeeps
            .extend(upkeep_ids);
    }

    /// Delays every `get_upkeep` call by `latency`.
    pub fn set_upkeep_latency(&self, latency: Duration) {
        self.faults.lock().unwrap().upkeep_latency = Some(latency);
    }

    pub fn clear_faults(&self) {
        *self.faults.lock().unwrap() = Faults::default();
    }

    /// Holds every `get_upkeep` call until [`FaultyChainReader::resume_upkeeps`] is called.
    pub fn pause_upkeeps(&self) {
        self.counters.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume_upkeeps(&self) {
        self.counters.paused.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self, method: ChainMethod) -> u64 {
        self.counters.calls[method_index(method)].load(Ordering::SeqCst)
    }

    pub fn in_flight_upkeeps(&self) -> usize {
        self.counters.in_flight_upkeeps.load(Ordering::SeqCst)
    }

    /// Highest number of `get_upkeep` calls observed running at the same time.
    pub fn max_in_flight_upkeeps(&self) -> usize {
        self.counters.max_in_flight_upkeeps.load(Ordering::SeqCst)
    }

    /// Upkeep ids passed to `get_upkeep`, in call order.
    pub fn fetched_upkeeps(&self) -> Vec<UpkeepId> {
        self.counters.fetched_upkeeps.lock().unwrap().clone()
    }

    pub fn reset_counters(&self) {
        for counter in &self.counters.calls {
            counter.store(0, Ordering::SeqCst);
        }
        self.counters.max_in_flight_upkeeps.store(0, Ordering::SeqCst);
        self.counters.fetched_upkeeps.lock().unwrap().clear();
    }

    fn record_call(&self, method: ChainMethod) -> bool {
        self.counters.calls[method_index(method)].fetch_add(1, Ordering::SeqCst);

        self.faults.lock().unwrap().failing_methods.contains(&method)
    }
}

/// Tracks one in-flight `get_upkeep` call until dropped.
struct InFlightGuard<'a>(&'a Counters);

impl<'a> InFlightGuard<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let current = counters.in_flight_upkeeps.fetch_add(1, Ordering::SeqCst) + 1;
        counters
            .max_in_flight_upkeeps
            .fetch_max(current, Ordering::SeqCst);

        Self(counters)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight_upkeeps.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<C> ChainReader for FaultyChainReader<C>
where
    C: ChainReader + Send + Sync,
{
    async fn get_config(&self) -> KeeperResult<RegistryConfig> {
        if self.record_call(ChainMethod::GetConfig) {
            bail!(ErrorKind::ChainReadFailed, "Injected get_config failure");
        }

        self.inner.get_config().await
    }

    async fn get_keeper_list(&self) -> KeeperResult<Vec<Address>> {
        if self.record_call(ChainMethod::GetKeeperList) {
            bail!(ErrorKind::ChainReadFailed, "Injected get_keeper_list failure");
        }

        self.inner.get_keeper_list().await
    }

    async fn get_upkeep_count(&self) -> KeeperResult<i64> {
        if self.record_call(ChainMethod::GetUpkeepCount) {
            bail!(ErrorKind::ChainReadFailed, "Injected get_upkeep_count failure");
        }

        self.inner.get_upkeep_count().await
    }

    async fn get_upkeep(&self, upkeep_id: UpkeepId) -> KeeperResult<UpkeepConfig> {
        let failing_method = self.record_call(ChainMethod::GetUpkeep);
        let _guard = InFlightGuard::enter(&self.counters);
        self.counters
            .fetched_upkeeps
            .lock()
            .unwrap()
            .push(upkeep_id);

        let (latency, fails, panics) = {
            let faults = self.faults.lock().unwrap();
            (
                faults.upkeep_latency,
                failing_method || faults.failing_upkeeps.contains(&upkeep_id),
                faults.panicking_upkeeps.contains(&upkeep_id),
            )
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        while self.counters.paused.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        if panics {
            panic!("injected panic while fetching upkeep {upkeep_id}");
        }
        if fails {
            bail!(
                ErrorKind::ChainReadFailed,
                "Injected get_upkeep failure",
                upkeep_id
            );
        }

        self.inner.get_upkeep(upkeep_id).await
    }

    async fn get_canceled_upkeep_list(&self) -> KeeperResult<Vec<UpkeepId>> {
        if self.record_call(ChainMethod::GetCanceledUpkeepList) {
            bail!(
                ErrorKind::ChainReadFailed,
                "Injected get_canceled_upkeep_list failure"
            );
        }

        self.inner.get_canceled_upkeep_list().await
    }
}
