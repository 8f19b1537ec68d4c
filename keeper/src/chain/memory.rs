use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::chain::base::{ChainReader, RegistryConfig, UpkeepConfig};
use crate::error::{ErrorKind, KeeperResult};
use crate::types::{Address, UpkeepId};

#[derive(Debug)]
struct Inner {
    config: RegistryConfig,
    keepers: Vec<Address>,
    upkeeps: Vec<UpkeepConfig>,
    canceled: BTreeSet<UpkeepId>,
}

/// In-memory registry contract.
///
/// Upkeeps receive sequential ids on registration and stay readable after cancellation, as they
/// do on chain. Cloning shares the underlying state, so a test can mutate the contract while a
/// synchronizer reads it.
#[derive(Debug, Clone)]
pub struct MemoryChainReader {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryChainReader {
    pub fn new(config: RegistryConfig) -> Self {
        let inner = Inner {
            config,
            keepers: Vec::new(),
            upkeeps: Vec::new(),
            canceled: BTreeSet::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub async fn set_config(&self, config: RegistryConfig) {
        self.inner.lock().await.config = config;
    }

    pub async fn set_keepers(&self, keepers: Vec<Address>) {
        self.inner.lock().await.keepers = keepers;
    }

    /// Registers a new upkeep and returns its id.
    pub async fn register_upkeep(&self, upkeep: UpkeepConfig) -> UpkeepId {
        let mut inner = self.inner.lock().await;
        inner.upkeeps.push(upkeep);

        (inner.upkeeps.len() - 1) as UpkeepId
    }

    /// Registers `count` upkeeps with generated check data and returns their ids.
    pub async fn register_upkeeps(&self, count: usize) -> Vec<UpkeepId> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let next = self.inner.lock().await.upkeeps.len();
            let upkeep = UpkeepConfig {
                execute_gas: 100_000 + next as u32,
                check_data: (next as u64).to_be_bytes().to_vec(),
            };
            ids.push(self.register_upkeep(upkeep).await);
        }

        ids
    }

    pub async fn update_upkeep(&self, upkeep_id: UpkeepId, upkeep: UpkeepConfig) -> KeeperResult<()> {
        let mut inner = self.inner.lock().await;
        let Some(slot) = usize::try_from(upkeep_id)
            .ok()
            .and_then(|index| inner.upkeeps.get_mut(index))
        else {
            bail!(ErrorKind::InvalidData, "Unknown upkeep", upkeep_id);
        };
        *slot = upkeep;

        Ok(())
    }

    pub async fn cancel_upkeep(&self, upkeep_id: UpkeepId) {
        self.inner.lock().await.canceled.insert(upkeep_id);
    }
}

impl ChainReader for MemoryChainReader {
    async fn get_config(&self) -> KeeperResult<RegistryConfig> {
        Ok(self.inner.lock().await.config)
    }

    async fn get_keeper_list(&self) -> KeeperResult<Vec<Address>> {
        Ok(self.inner.lock().await.keepers.clone())
    }

    async fn get_upkeep_count(&self) -> KeeperResult<i64> {
        Ok(self.inner.lock().await.upkeeps.len() as i64)
    }

    async fn get_upkeep(&self, upkeep_id: UpkeepId) -> KeeperResult<UpkeepConfig> {
        let inner = self.inner.lock().await;
        let upkeep = usize::try_from(upkeep_id)
            .ok()
            .and_then(|index| inner.upkeeps.get(index));

        match upkeep {
            Some(upkeep) => Ok(upkeep.clone()),
            None => bail!(
                ErrorKind::ChainReadFailed,
                "Upkeep does not exist on the registry",
                upkeep_id
            ),
        }
    }

    async fn get_canceled_upkeep_list(&self) -> KeeperResult<Vec<UpkeepId>> {
        Ok(self.inner.lock().await.canceled.iter().copied().collect())
    }
}
