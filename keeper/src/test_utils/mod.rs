//! Fault injection, call recording and fixtures for keeper tests.

pub mod chain;
pub mod notify;
pub mod store;

use crate::chain::{MemoryChainReader, RegistryConfig};
use crate::state::KeeperJob;
use crate::types::{Address, JobId};

pub const TEST_JOB_ID: JobId = 42;

pub const TEST_CONTRACT_ADDRESS: Address = Address::repeat_byte(0x5a);

pub const TEST_FROM_ADDRESS: Address = Address::repeat_byte(0xcc);

pub fn test_job() -> KeeperJob {
    KeeperJob {
        job_id: TEST_JOB_ID,
        contract_address: TEST_CONTRACT_ADDRESS,
        from_address: TEST_FROM_ADDRESS,
    }
}

pub fn test_registry_config() -> RegistryConfig {
    RegistryConfig {
        check_gas_limit: 2_500_000,
        block_count_per_turn: 20,
    }
}

/// Chain with keepers `[0xaa.., 0xbb.., 0xcc.., 0xdd..]`, where this node is `0xcc..`,
/// and `upkeeps` registered upkeeps.
pub async fn test_chain(upkeeps: usize) -> MemoryChainReader {
    let chain = MemoryChainReader::new(test_registry_config());
    chain
        .set_keepers(vec![
            Address::repeat_byte(0xaa),
            Address::repeat_byte(0xbb),
            TEST_FROM_ADDRESS,
            Address::repeat_byte(0xdd),
        ])
        .await;
    chain.register_upkeeps(upkeeps).await;

    chain
}
