use crate::chain::UpkeepConfig;
use crate::positioning::calc_positioning_constant;
use crate::state::Registry;
use crate::types::{RegistryId, UpkeepId};

/// Local record of an upkeep registered on a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpkeepRegistration {
    pub registry_id: RegistryId,
    pub upkeep_id: UpkeepId,
    pub check_data: Vec<u8>,
    pub execute_gas: u64,
    /// See [`calc_positioning_constant`]. Never changes since both inputs are immutable.
    pub positioning_constant: i32,
}

impl UpkeepRegistration {
    /// Builds the registration of `upkeep_id` on a persisted registry.
    pub fn new(registry: &Registry, upkeep_id: UpkeepId, config: UpkeepConfig) -> Self {
        Self {
            registry_id: registry.id,
            upkeep_id,
            check_data: config.check_data,
            execute_gas: u64::from(config.execute_gas),
            positioning_constant: calc_positioning_constant(upkeep_id, &registry.contract_address),
        }
    }
}
