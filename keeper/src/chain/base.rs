use std::future::Future;

use crate::error::KeeperResult;
use crate::types::{Address, UpkeepId};

/// Registry-wide configuration read from the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub check_gas_limit: u32,
    pub block_count_per_turn: u64,
}

/// Configuration of a single upkeep read from the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpkeepConfig {
    pub execute_gas: u32,
    pub check_data: Vec<u8>,
}

/// Read-only view over a registry contract.
///
/// Every call is idempotent and may fail transiently. Retrying is left to implementations.
pub trait ChainReader {
    fn get_config(&self) -> impl Future<Output = KeeperResult<RegistryConfig>> + Send;

    /// Returns the ordered keeper list. A keeper's position is its keeper index.
    fn get_keeper_list(&self) -> impl Future<Output = KeeperResult<Vec<Address>>> + Send;

    /// Returns how many upkeeps were ever registered, canceled ones included.
    fn get_upkeep_count(&self) -> impl Future<Output = KeeperResult<i64>> + Send;

    fn get_upkeep(
        &self,
        upkeep_id: UpkeepId,
    ) -> impl Future<Output = KeeperResult<UpkeepConfig>> + Send;

    fn get_canceled_upkeep_list(&self) -> impl Future<Output = KeeperResult<Vec<UpkeepId>>> + Send;
}
