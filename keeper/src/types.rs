//! Identifiers and the on-chain address type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha3::{Digest, Keccak256};

use crate::bail;
use crate::error::{ErrorKind, KeeperError, KeeperResult};

/// Identifier of the job owning a registry.
pub type JobId = i32;

/// Surrogate identifier assigned to a registry by the store.
pub type RegistryId = i64;

/// Sequential on-chain identifier of an upkeep.
pub type UpkeepId = i64;

/// Number of bytes in an address.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account or contract address.
///
/// Parsed from hex with an optional `0x` prefix and rendered in EIP-55 checksum form.
/// Equality is byte equality, so the casing of the input never matters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns an address with every byte set to `byte`.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; ADDRESS_LEN])
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Renders the address as a `0x`-prefixed EIP-55 mixed-case checksum string.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut checksummed = String::with_capacity(2 + lower.len());
        checksummed.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };

            if c.is_ascii_alphabetic() && nibble >= 8 {
                checksummed.push(c.to_ascii_uppercase());
            } else {
                checksummed.push(c);
            }
        }

        checksummed
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = KeeperError;

    fn try_from(bytes: &[u8]) -> KeeperResult<Self> {
        let Ok(bytes) = <[u8; ADDRESS_LEN]>::try_from(bytes) else {
            bail!(
                ErrorKind::InvalidData,
                "Address has an invalid length",
                format!("expected {ADDRESS_LEN} bytes, got {}", bytes.len())
            );
        };

        Ok(Self(bytes))
    }
}

impl FromStr for Address {
    type Err = KeeperError;

    fn from_str(s: &str) -> KeeperResult<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.len() != ADDRESS_LEN * 2 {
            bail!(
                ErrorKind::InvalidData,
                "Address must have 40 hex digits",
                format!("got `{s}`")
            );
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn checksum_matches_eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let address: Address = expected.to_lowercase().parse().unwrap();
            assert_eq!(address.to_checksum(), expected);
        }
    }

    #[test]
    fn parsing_ignores_case_and_prefix() {
        let a: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        let b: Address = "5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED".parse().unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        for input in ["", "0x", "0x1234", "0xzz00000000000000000000000000000000000000"] {
            let err = input.parse::<Address>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidData, "input `{input}`");
        }

        assert!(Address::try_from(&[0u8; 19][..]).is_err());
        assert_eq!(
            Address::try_from(&[0xaa; 20][..]).unwrap(),
            Address::repeat_byte(0xaa)
        );
    }

    #[test]
    fn address_map_round_trips_through_json() {
        let mut map = BTreeMap::new();
        map.insert(Address::repeat_byte(0xaa), 0);
        map.insert(Address::repeat_byte(0xbb), 1);

        let json = serde_json::to_value(&map).unwrap();
        let decoded: BTreeMap<Address, i32> = serde_json::from_value(json).unwrap();

        assert_eq!(decoded, map);
    }
}
