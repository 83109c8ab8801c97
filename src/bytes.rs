//! Fixed-width word encoding of primitives.
//!
//! Every value the on-chain verifier hashes is laid out as a left-padded
//! 32-byte word, so these helpers are the building block of all struct and
//! domain hashes in [`crate::eip712`].

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};

/// `0x00..00` or `0x00..01`.
pub fn bool_to_bytes32(value: bool) -> B256 {
    B256::with_last_byte(value as u8)
}

/// 12 zero bytes followed by the 20 address bytes.
pub fn address_to_bytes32(value: Address) -> B256 {
    value.into_word()
}

/// Big-endian, left-padded unsigned integer.
pub fn u256_to_bytes32(value: U256) -> B256 {
    B256::from(value)
}

/// Concatenates words and byte strings into one buffer.
pub fn combine<I, T>(parts: I) -> Bytes
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(part.as_ref());
    }
    out.into()
}

/// `keccak256` of the UTF-8 bytes of a string, as Solidity hashes `string` values.
pub fn hash_string(value: &str) -> B256 {
    keccak256(value.as_bytes())
}

/// `keccak256` of a byte string. Empty input hashes to the well-known
/// `0xc5d2..a470` value, same as Solidity.
pub fn hash_bytes(value: &[u8]) -> B256 {
    keccak256(value)
}
