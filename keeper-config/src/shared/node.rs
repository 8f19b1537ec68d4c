use serde::Deserialize;

use crate::load::Config;
use crate::shared::{KeeperJobConfig, StoreConfig, SynchronizerConfig, ValidationError};

/// Complete configuration of a node running one registry synchronizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KeeperNodeConfig {
    pub job: KeeperJobConfig,
    #[serde(default)]
    pub synchronizer: SynchronizerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl KeeperNodeConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.job.validate()?;
        self.synchronizer.validate()?;
        self.store.validate()
    }
}

impl Config for KeeperNodeConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
