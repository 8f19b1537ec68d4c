use keeper_config::shared::KeeperJobConfig;

use crate::error::{ErrorKind, KeeperError, KeeperResult};
use crate::keeper_error;
use crate::types::{Address, JobId};

/// The (registry, node identity) pair a synchronizer is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeeperJob {
    pub job_id: JobId,
    pub contract_address: Address,
    /// Address this node uses in the registry keeper list.
    pub from_address: Address,
}

impl TryFrom<&KeeperJobConfig> for KeeperJob {
    type Error = KeeperError;

    fn try_from(config: &KeeperJobConfig) -> KeeperResult<Self> {
        let parse = |field: &'static str, value: &str| {
            value.parse::<Address>().map_err(|err| {
                keeper_error!(
                    ErrorKind::ConfigError,
                    "Invalid address in keeper job configuration",
                    format!("{field}: {value}"),
                    source: err
                )
            })
        };

        Ok(KeeperJob {
            job_id: config.job_id,
            contract_address: parse("contract_address", &config.contract_address)?,
            from_address: parse("from_address", &config.from_address)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_config_addresses_are_parsed() {
        let config = KeeperJobConfig {
            job_id: 42,
            contract_address: "0x00000000000000000000000000000000000000aa".to_owned(),
            from_address: "00000000000000000000000000000000000000CC".to_owned(),
        };

        let job = KeeperJob::try_from(&config).unwrap();

        assert_eq!(job.job_id, 42);
        assert_eq!(job.contract_address.as_bytes()[19], 0xaa);
        assert_eq!(job.from_address.as_bytes()[19], 0xcc);
    }

    #[test]
    fn invalid_address_is_a_config_error() {
        let config = KeeperJobConfig {
            job_id: 1,
            contract_address: "0x1234".to_owned(),
            from_address: "0x00000000000000000000000000000000000000cc".to_owned(),
        };

        let err = KeeperJob::try_from(&config).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert_eq!(err.detail(), Some("contract_address: 0x1234"));
    }
}
