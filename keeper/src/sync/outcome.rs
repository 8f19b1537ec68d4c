use std::fmt;

use crate::error::KeeperError;

/// Phases of a full sync, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    SyncRegistry,
    AddNewUpkeeps,
    DeleteCanceledUpkeeps,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::SyncRegistry => "sync_registry",
            SyncPhase::AddNewUpkeeps => "add_new_upkeeps",
            SyncPhase::DeleteCanceledUpkeeps => "delete_canceled_upkeeps",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one full sync cycle.
///
/// A failed phase stops the cycle, but whatever earlier phases wrote stays written.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Success,
    PartialFailure {
        phase: SyncPhase,
        cause: KeeperError,
    },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success)
    }

    /// Returns the phase that failed, if any.
    pub fn failed_phase(&self) -> Option<SyncPhase> {
        match self {
            SyncOutcome::Success => None,
            SyncOutcome::PartialFailure { phase, .. } => Some(*phase),
        }
    }
}
