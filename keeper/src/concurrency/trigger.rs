//! Coalescing sync triggers.
//!
//! The queue holds at most one pending trigger. Triggers sent while one is pending are dropped,
//! since the single cycle that follows observes all chain changes behind them.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Reason for an out-of-schedule sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// A new chain head was observed.
    NewHead(u64),
    /// The registry contract emitted a log that changes its upkeeps or keepers.
    RegistryLog,
    Manual,
}

/// Sending half of the trigger queue.
#[derive(Debug, Clone)]
pub struct TriggerTx(mpsc::Sender<SyncTrigger>);

pub type TriggerRx = mpsc::Receiver<SyncTrigger>;

impl TriggerTx {
    /// Enqueues a trigger without waiting.
    ///
    /// Returns `false` when the trigger was coalesced into a pending one or the receiver is gone.
    pub fn trigger(&self, trigger: SyncTrigger) -> bool {
        match self.0.try_send(trigger) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => false,
        }
    }
}

pub fn create_trigger_channel() -> (TriggerTx, TriggerRx) {
    let (tx, rx) = mpsc::channel(1);

    (TriggerTx(tx), rx)
}
