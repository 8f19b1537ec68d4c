use std::time::Duration;

use keeper_config::shared::SynchronizerConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::chain::ChainReader;
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown_channel};
use crate::concurrency::trigger::{SyncTrigger, TriggerRx, TriggerTx, create_trigger_channel};
use crate::error::{ErrorKind, KeeperError, KeeperResult};
use crate::keeper_error;
use crate::reporter::ErrorReporter;
use crate::state::KeeperJob;
use crate::store::KeeperStore;
use crate::sync::{FullSyncEngine, SyncOutcome};
use crate::workers::base::{Worker, WorkerHandle};

/// Lower bound of the sync interval, tokio intervals reject a zero period.
const MIN_SYNC_INTERVAL: Duration = Duration::from_millis(1);

/// Lifecycle state of a [`RegistrySynchronizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchronizerState {
    Idle,
    Syncing,
    /// The loop exited. Terminal.
    Stopped,
}

/// Snapshot published by a running synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SynchronizerStatus {
    pub state: SynchronizerState,
    pub completed_cycles: u64,
    pub last_outcome: Option<SyncOutcome>,
}

impl SynchronizerStatus {
    fn idle() -> Self {
        Self {
            state: SynchronizerState::Idle,
            completed_cycles: 0,
            last_outcome: None,
        }
    }
}

/// Keeps the local mirror of one registry in sync for one node identity.
///
/// Once started, the synchronizer runs a full sync immediately, then on every tick of the sync
/// interval and on every trigger sent through its handle, until it is stopped. Cycle failures
/// are logged and never end the loop.
#[derive(Debug)]
pub struct RegistrySynchronizer<C, S, R> {
    engine: FullSyncEngine<C, S, R>,
    sync_interval: Duration,
    shutdown_tx: ShutdownTx,
}

impl<C, S, R> RegistrySynchronizer<C, S, R>
where
    C: ChainReader + Clone + Send + Sync + 'static,
    S: KeeperStore + Clone + Send + Sync + 'static,
    R: ErrorReporter + Clone + Send + Sync + 'static,
{
    pub fn new(
        job: KeeperJob,
        config: &SynchronizerConfig,
        chain: C,
        store: S,
        reporter: R,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let engine = FullSyncEngine::new(
            job,
            chain,
            store,
            reporter,
            config.sync_upkeep_queue_size as usize,
            shutdown_rx,
        );

        Self {
            engine,
            sync_interval: config.sync_interval().max(MIN_SYNC_INTERVAL),
            shutdown_tx,
        }
    }
}

impl<C, S, R> Worker<RegistrySynchronizerHandle, SynchronizerStatus>
    for RegistrySynchronizer<C, S, R>
where
    C: ChainReader + Clone + Send + Sync + 'static,
    S: KeeperStore + Clone + Send + Sync + 'static,
    R: ErrorReporter + Clone + Send + Sync + 'static,
{
    type Error = KeeperError;

    async fn start(self) -> KeeperResult<RegistrySynchronizerHandle> {
        let (trigger_tx, trigger_rx) = create_trigger_channel();
        let (status_tx, status_rx) = watch::channel(SynchronizerStatus::idle());

        let sync_loop = SyncLoop {
            engine: self.engine,
            sync_interval: self.sync_interval,
            shutdown_rx: self.shutdown_tx.subscribe(),
            trigger_rx,
            status_tx,
        };
        let join_handle = tokio::spawn(sync_loop.run());

        Ok(RegistrySynchronizerHandle {
            trigger_tx,
            shutdown_tx: self.shutdown_tx,
            status_rx,
            join_handle,
        })
    }
}

struct SyncLoop<C, S, R> {
    engine: FullSyncEngine<C, S, R>,
    sync_interval: Duration,
    shutdown_rx: ShutdownRx,
    trigger_rx: TriggerRx,
    status_tx: watch::Sender<SynchronizerStatus>,
}

impl<C, S, R> SyncLoop<C, S, R>
where
    C: ChainReader + Clone + Send + Sync + 'static,
    S: KeeperStore + Clone + Send + Sync + 'static,
    R: ErrorReporter + Clone + Send + Sync + 'static,
{
    async fn run(mut self) {
        let job_id = self.engine.job().job_id;
        let registry_contract = self.engine.job().contract_address;
        info!(
            job_id,
            %registry_contract,
            sync_interval_ms = self.sync_interval.as_millis() as u64,
            "starting registry synchronizer"
        );

        if !self.shutdown_rx.is_shutdown() {
            self.run_cycle(None).await;
        }

        let mut ticker = interval_at(Instant::now() + self.sync_interval, self.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.wait_for_shutdown() => {
                    info!(job_id, %registry_contract, "registry synchronizer received shutdown signal");
                    break;
                }

                Some(trigger) = self.trigger_rx.recv() => {
                    self.run_cycle(Some(trigger)).await;
                }

                _ = ticker.tick() => {
                    self.run_cycle(None).await;
                }
            }
        }

        self.status_tx.send_modify(|status| status.state = SynchronizerState::Stopped);
        info!(job_id, %registry_contract, "registry synchronizer stopped");
    }

    async fn run_cycle(&self, trigger: Option<SyncTrigger>) {
        debug!(job_id = self.engine.job().job_id, ?trigger, "starting sync cycle");
        self.status_tx.send_modify(|status| status.state = SynchronizerState::Syncing);

        let outcome = self.engine.full_sync().await;
        if outcome.is_success() {
            info!(
                job_id = self.engine.job().job_id,
                registry_contract = %self.engine.job().contract_address,
                "full sync completed"
            );
        }

        self.status_tx.send_modify(|status| {
            status.state = SynchronizerState::Idle;
            status.completed_cycles += 1;
            status.last_outcome = Some(outcome);
        });
    }
}

/// Handle of a started [`RegistrySynchronizer`].
///
/// Dropping the handle stops the synchronizer.
#[derive(Debug)]
pub struct RegistrySynchronizerHandle {
    trigger_tx: TriggerTx,
    shutdown_tx: ShutdownTx,
    status_rx: watch::Receiver<SynchronizerStatus>,
    join_handle: JoinHandle<()>,
}

impl RegistrySynchronizerHandle {
    /// Requests an extra sync cycle. Returns `false` when it was coalesced into a pending one.
    pub fn trigger(&self, trigger: SyncTrigger) -> bool {
        self.trigger_tx.trigger(trigger)
    }

    /// Signals the synchronizer to stop. In-flight upkeep syncs are drained, pending ones dropped.
    pub fn stop(&self) {
        self.shutdown_tx.shutdown();
    }

    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Returns a receiver of every status change.
    pub fn subscribe_status(&self) -> watch::Receiver<SynchronizerStatus> {
        self.status_rx.clone()
    }

    pub async fn shutdown_and_wait(self) -> KeeperResult<()> {
        self.stop();
        self.wait().await
    }
}

impl WorkerHandle<SynchronizerStatus> for RegistrySynchronizerHandle {
    fn state(&self) -> SynchronizerStatus {
        self.status_rx.borrow().clone()
    }

    async fn wait(self) -> KeeperResult<()> {
        self.join_handle.await.map_err(|err| {
            keeper_error!(
                ErrorKind::WorkerPanic,
                "Registry synchronizer task panicked",
                err
            )
        })
    }
}
