use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::shared::ValidationError;

/// Tuning knobs of a registry synchronizer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SynchronizerConfig {
    /// Milliseconds between two periodic full syncs.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    /// Maximum number of upkeeps fetched and upserted concurrently during a full sync.
    #[serde(default = "default_sync_upkeep_queue_size")]
    pub sync_upkeep_queue_size: u32,
}

impl SynchronizerConfig {
    /// Thirty minutes, the registry changes slowly and log triggers cover the rest.
    pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 30 * 60 * 1000;

    pub const DEFAULT_SYNC_UPKEEP_QUEUE_SIZE: u32 = 10;

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sync_interval_ms == 0 {
            return Err(ValidationError::SyncIntervalZero);
        }

        if self.sync_upkeep_queue_size == 0 {
            return Err(ValidationError::SyncUpkeepQueueSizeZero);
        }

        Ok(())
    }
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: default_sync_interval_ms(),
            sync_upkeep_queue_size: default_sync_upkeep_queue_size(),
        }
    }
}

fn default_sync_interval_ms() -> u64 {
    SynchronizerConfig::DEFAULT_SYNC_INTERVAL_MS
}

fn default_sync_upkeep_queue_size() -> u32 {
    SynchronizerConfig::DEFAULT_SYNC_UPKEEP_QUEUE_SIZE
}
