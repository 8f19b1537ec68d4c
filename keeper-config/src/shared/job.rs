use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Identity of one keeper job: which registry contract is mirrored and which
/// address this node acts as on it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct KeeperJobConfig {
    pub job_id: i32,
    /// Registry contract address, `0x` prefixed hex.
    pub contract_address: String,
    /// Address of this node in the registry keeper list, `0x` prefixed hex.
    pub from_address: String,
}

impl KeeperJobConfig {
    /// Checks both addresses are 20 byte hex strings.
    ///
    /// Checksum casing is not enforced, addresses are compared by bytes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_address("contract_address", &self.contract_address)?;
        validate_address("from_address", &self.from_address)?;

        Ok(())
    }
}

fn validate_address(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}
