use std::future::Future;

use crate::error::KeeperResult;

/// A background worker started once and then observed through its handle.
pub trait Worker<H, S>
where
    H: WorkerHandle<S>,
{
    type Error;

    /// Spawns the worker and returns immediately with its handle.
    fn start(self) -> impl Future<Output = Result<H, Self::Error>> + Send;
}

/// Handle of a running worker.
pub trait WorkerHandle<S> {
    /// Returns a snapshot of the worker state.
    fn state(&self) -> S;

    /// Waits for the worker to exit.
    fn wait(self) -> impl Future<Output = KeeperResult<()>> + Send;
}
