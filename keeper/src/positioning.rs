//! Deterministic positioning constants.
//!
//! Every node derives the same constant for an upkeep without coordinating, and combines it
//! with the block number and its keeper index to decide whose turn it is to check the upkeep.

use sha3::{Digest, Keccak256};

use crate::types::{ADDRESS_LEN, Address, UpkeepId};

/// Maximum length of a varint-encoded 64-bit integer.
const MAX_VARINT_LEN_64: usize = 10;

/// Computes the positioning constant of an upkeep.
///
/// The upkeep id is zig-zag varint encoded into a zero-filled 10-byte buffer, the raw registry
/// address is appended and the 30 bytes are hashed with Keccak-256. The first two digest bytes,
/// read as a big-endian `u16`, form the constant, so the result always lies in `[0, 65535]`.
pub fn calc_positioning_constant(upkeep_id: UpkeepId, registry_address: &Address) -> i32 {
    let mut bytes = [0u8; MAX_VARINT_LEN_64 + ADDRESS_LEN];
    put_varint(&mut bytes[..MAX_VARINT_LEN_64], upkeep_id);
    bytes[MAX_VARINT_LEN_64..].copy_from_slice(registry_address.as_bytes());

    let digest = Keccak256::digest(bytes);

    i32::from(u16::from_be_bytes([digest[0], digest[1]]))
}

/// Writes `value` as a zig-zag signed varint into `buf` and returns the number of bytes used.
///
/// `buf` must hold at least [`MAX_VARINT_LEN_64`] bytes.
fn put_varint(buf: &mut [u8], value: i64) -> usize {
    let mut zigzag = ((value << 1) ^ (value >> 63)) as u64;

    let mut i = 0;
    while zigzag >= 0x80 {
        buf[i] = (zigzag as u8) | 0x80;
        zigzag >>= 7;
        i += 1;
    }
    buf[i] = zigzag as u8;

    i + 1
}
