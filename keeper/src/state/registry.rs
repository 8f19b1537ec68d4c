use std::collections::BTreeMap;

use tracing::warn;

use crate::bail;
use crate::chain::RegistryConfig;
use crate::error::{ErrorKind, KeeperResult};
use crate::keeper_error;
use crate::types::{Address, JobId, RegistryId};

/// Keeper index of a node that is not in the registry's keeper list.
pub const NO_KEEPER_INDEX: i32 = -1;

/// Identifier used for a registry that was not persisted yet.
pub const UNSAVED_REGISTRY_ID: RegistryId = 0;

/// Local mirror of a registry contract, owned by one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub id: RegistryId,
    pub job_id: JobId,
    pub contract_address: Address,
    /// Identity of this node in the keeper list.
    pub from_address: Address,
    pub check_gas: i32,
    pub block_count_per_turn: i32,
    /// Position of [`Registry::from_address`] in the keeper list, or [`NO_KEEPER_INDEX`].
    pub keeper_index: i32,
    pub num_keepers: i32,
    pub keeper_index_map: BTreeMap<Address, i32>,
}

impl Registry {
    /// Builds an unsaved registry from freshly read contract state.
    ///
    /// The keeper index map is rebuilt from `keepers` in full. Values that do not fit the stored
    /// columns fail with [`ErrorKind::ConversionError`] and a keeper listed twice fails with
    /// [`ErrorKind::InvalidData`].
    pub fn from_chain(
        job_id: JobId,
        contract_address: Address,
        from_address: Address,
        config: &RegistryConfig,
        keepers: &[Address],
    ) -> KeeperResult<Self> {
        let check_gas = i32::try_from(config.check_gas_limit).map_err(|err| {
            keeper_error!(
                ErrorKind::ConversionError,
                "Check gas limit does not fit in 32 bits",
                config.check_gas_limit,
                source: err
            )
        })?;
        let block_count_per_turn = i32::try_from(config.block_count_per_turn).map_err(|err| {
            keeper_error!(
                ErrorKind::ConversionError,
                "Block count per turn does not fit in 32 bits",
                config.block_count_per_turn,
                source: err
            )
        })?;
        let num_keepers = i32::try_from(keepers.len()).map_err(|err| {
            keeper_error!(
                ErrorKind::ConversionError,
                "Keeper list is too long",
                keepers.len(),
                source: err
            )
        })?;

        let mut keeper_index = NO_KEEPER_INDEX;
        let mut keeper_index_map = BTreeMap::new();
        for (index, keeper) in (0..num_keepers).zip(keepers) {
            if keeper_index_map.insert(*keeper, index).is_some() {
                bail!(
                    ErrorKind::InvalidData,
                    "Keeper is listed more than once",
                    keeper
                );
            }

            if *keeper == from_address {
                keeper_index = index;
            }
        }

        if keeper_index == NO_KEEPER_INDEX {
            warn!(
                job_id,
                from_address = %from_address,
                registry_contract = %contract_address,
                "unable to find node address in the registry keeper list"
            );
        }

        Ok(Self {
            id: UNSAVED_REGISTRY_ID,
            job_id,
            contract_address,
            from_address,
            check_gas,
            block_count_per_turn,
            keeper_index,
            num_keepers,
            keeper_index_map,
        })
    }

    /// Returns whether this node currently takes part in the keeper rotation.
    pub fn is_member(&self) -> bool {
        self.keeper_index != NO_KEEPER_INDEX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AA: Address = Address::repeat_byte(0xaa);
    const BB: Address = Address::repeat_byte(0xbb);
    const CC: Address = Address::repeat_byte(0xcc);
    const DD: Address = Address::repeat_byte(0xdd);

    fn config() -> RegistryConfig {
        RegistryConfig {
            check_gas_limit: 2_000_000,
            block_count_per_turn: 20,
        }
    }

    #[test]
    fn keeper_index_is_position_of_from_address() {
        let registry = Registry::from_chain(42, AA, CC, &config(), &[AA, BB, CC, DD]).unwrap();

        assert_eq!(registry.keeper_index, 2);
        assert_eq!(registry.num_keepers, 4);
        assert_eq!(
            registry.keeper_index_map,
            BTreeMap::from([(AA, 0), (BB, 1), (CC, 2), (DD, 3)])
        );
        assert_eq!(registry.check_gas, 2_000_000);
        assert_eq!(registry.block_count_per_turn, 20);
        assert!(registry.is_member());
    }

    #[test]
    fn absent_from_address_gets_sentinel_index() {
        let registry =
            Registry::from_chain(42, AA, Address::repeat_byte(0xee), &config(), &[AA, BB]).unwrap();

        assert_eq!(registry.keeper_index, NO_KEEPER_INDEX);
        assert_eq!(registry.keeper_index_map.len(), 2);
        assert!(!registry.is_member());
    }

    #[test]
    fn empty_keeper_list_yields_empty_map() {
        let registry = Registry::from_chain(1, AA, BB, &config(), &[]).unwrap();

        assert_eq!(registry.num_keepers, 0);
        assert!(registry.keeper_index_map.is_empty());
        assert_eq!(registry.keeper_index, NO_KEEPER_INDEX);
    }

    #[test]
    fn oversized_chain_values_are_conversion_errors() {
        let gas = RegistryConfig {
            check_gas_limit: u32::MAX,
            block_count_per_turn: 1,
        };
        let turn = RegistryConfig {
            check_gas_limit: 1,
            block_count_per_turn: u64::from(u32::MAX),
        };

        for config in [gas, turn] {
            let err = Registry::from_chain(1, AA, BB, &config, &[BB]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConversionError);
        }
    }

    #[test]
    fn duplicated_keeper_is_rejected() {
        let err = Registry::from_chain(1, AA, BB, &config(), &[BB, CC, BB]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
