//! Typed signatures.
//!
//! A typed signature is the 65-byte `r ‖ s ‖ v` ECDSA signature followed by
//! one [`SignatureType`] byte which tells the verifier how the signed hash was
//! prepended before signing. Different signer back-ends prepend differently,
//! so the tag travels with the signature.

use std::{fmt, str::FromStr};

use alloy::primitives::{Address, B256, Signature, hex, keccak256};

/// Preamble applied by `eth_sign` style signers (decimal length).
pub const PREPEND_DEC: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Preamble with the length written as a single raw byte.
pub const PREPEND_HEX: &[u8] = b"\x19Ethereum Signed Message:\n\x20";

pub const RAW_SIGNATURE_LEN: usize = 65;
pub const TYPED_SIGNATURE_LEN: usize = 66;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature length: {0}")]
    InvalidLength(usize),

    #[error("unknown signature type: {0}")]
    UnknownSignatureType(u8),

    #[error("invalid recovery id: {0:#04x}")]
    InvalidRecoveryId(u8),

    #[error("signature recovery failed: {0}")]
    Recovery(String),
}

/// How the hash was prepended before it was signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SignatureType {
    NoPrepend = 0,
    Decimal = 1,
    Hexadecimal = 2,
}

impl TryFrom<u8> for SignatureType {
    type Error = SignatureError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SignatureType::NoPrepend),
            1 => Ok(SignatureType::Decimal),
            2 => Ok(SignatureType::Hexadecimal),
            _ => Err(SignatureError::UnknownSignatureType(value)),
        }
    }
}

impl SignatureType {
    /// Hash the signer actually signed for the given message hash.
    pub fn prepended_hash(&self, hash: B256) -> B256 {
        let preamble = match self {
            SignatureType::NoPrepend => return hash,
            SignatureType::Decimal => PREPEND_DEC,
            SignatureType::Hexadecimal => PREPEND_HEX,
        };
        let mut buf = Vec::with_capacity(preamble.len() + 32);
        buf.extend_from_slice(preamble);
        buf.extend_from_slice(hash.as_slice());
        keccak256(buf)
    }
}

/// Raw signature followed by its [`SignatureType`] tag, always 66 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypedSignature([u8; TYPED_SIGNATURE_LEN]);

impl TypedSignature {
    /// Wraps a raw 65-byte signature, normalizing its recovery id.
    pub fn new(raw: &[u8], sig_type: SignatureType) -> Result<Self, SignatureError> {
        let raw = normalize_recovery_id(raw)?;
        let mut out = [0u8; TYPED_SIGNATURE_LEN];
        out[..RAW_SIGNATURE_LEN].copy_from_slice(&raw);
        out[RAW_SIGNATURE_LEN] = sig_type as u8;
        Ok(Self(out))
    }

    /// Same as [`Self::new`] with the tag given as a byte.
    pub fn encode(raw: &[u8], sig_type: u8) -> Result<Self, SignatureError> {
        Self::new(raw, SignatureType::try_from(sig_type)?)
    }

    pub fn raw(&self) -> &[u8] {
        &self.0[..RAW_SIGNATURE_LEN]
    }

    pub fn tag(&self) -> u8 {
        self.0[RAW_SIGNATURE_LEN]
    }

    pub fn sig_type(&self) -> Option<SignatureType> {
        SignatureType::try_from(self.tag()).ok()
    }

    pub fn as_bytes(&self) -> &[u8; TYPED_SIGNATURE_LEN] {
        &self.0
    }

    /// Recovers the signer, see [`recover_signer`].
    pub fn recover(&self, hash: B256) -> Result<Address, SignatureError> {
        recover_signer(hash, &self.0)
    }
}

impl TryFrom<&[u8]> for TypedSignature {
    type Error = SignatureError;

    /// Takes the bytes as-is, the tag is not validated so that unknown tags
    /// surface at verification time.
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; TYPED_SIGNATURE_LEN] = value
            .try_into()
            .map_err(|_| SignatureError::InvalidLength(value.len()))?;
        Ok(Self(bytes))
    }
}

impl FromStr for TypedSignature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| SignatureError::InvalidLength(s.len() / 2))?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for TypedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TypedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedSignature({self})")
    }
}

/// Rewrites a `v` of 0/1 into 27/28 (`0x1b`/`0x1c`).
pub fn normalize_recovery_id(raw: &[u8]) -> Result<[u8; RAW_SIGNATURE_LEN], SignatureError> {
    let mut out: [u8; RAW_SIGNATURE_LEN] = raw
        .try_into()
        .map_err(|_| SignatureError::InvalidLength(raw.len()))?;
    out[64] = match out[64] {
        0x00 => 0x1b,
        0x01 => 0x1c,
        v @ (0x1b | 0x1c) => v,
        v => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    Ok(out)
}

/// Recovers the address that produced `typed_signature` over `hash`.
///
/// Never panics: malformed input of any shape is an error value so that
/// verification reduces to an equality check.
pub fn recover_signer(hash: B256, typed_signature: &[u8]) -> Result<Address, SignatureError> {
    if typed_signature.len() != TYPED_SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength(typed_signature.len()));
    }
    let sig_type = SignatureType::try_from(typed_signature[RAW_SIGNATURE_LEN])?;
    let prepended = sig_type.prepended_hash(hash);

    let raw = &typed_signature[..RAW_SIGNATURE_LEN];
    match raw[64] {
        0x1b | 0x1c => {}
        v => return Err(SignatureError::InvalidRecoveryId(v)),
    }
    let signature =
        Signature::from_raw(raw).map_err(|err| SignatureError::Recovery(err.to_string()))?;
    signature
        .recover_address_from_prehash(&prepended)
        .map_err(|err| SignatureError::Recovery(err.to_string()))
}

/// True if `typed_signature` over `hash` recovers to `expected`.
pub fn hash_has_valid_signature(hash: B256, typed_signature: &[u8], expected: Address) -> bool {
    recover_signer(hash, typed_signature).is_ok_and(|signer| signer == expected)
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::b256,
        signers::{SignerSync, local::PrivateKeySigner},
    };

    use super::*;
    use crate::testing::DEV_KEYS;

    const HASH: B256 = b256!("0x9a6e4ea53f4e3e5f3c3b5d5a5b3e26b9d6a3b6b01f0f7f0c2c4c0a6d1d2f3e4f");

    fn key() -> PrivateKeySigner {
        DEV_KEYS[0].parse().unwrap()
    }

    fn raw_sign(hash: B256) -> [u8; RAW_SIGNATURE_LEN] {
        key().sign_hash_sync(&hash).unwrap().as_bytes()
    }

    #[test]
    fn test_prepended_hashes() {
        assert_eq!(SignatureType::NoPrepend.prepended_hash(HASH), HASH);
        assert_eq!(
            SignatureType::Decimal.prepended_hash(HASH),
            alloy::primitives::eip191_hash_message(HASH)
        );
        assert_ne!(
            SignatureType::Decimal.prepended_hash(HASH),
            SignatureType::Hexadecimal.prepended_hash(HASH)
        );
    }

    #[test]
    fn test_recover_each_tag() {
        for sig_type in [
            SignatureType::NoPrepend,
            SignatureType::Decimal,
            SignatureType::Hexadecimal,
        ] {
            let raw = raw_sign(sig_type.prepended_hash(HASH));
            let typed = TypedSignature::new(&raw, sig_type).unwrap();
            assert_eq!(typed.recover(HASH).unwrap(), key().address());
            assert!(hash_has_valid_signature(HASH, typed.as_bytes(), key().address()));
        }
    }

    #[test]
    fn test_wrong_tag_does_not_recover_signer() {
        let raw = raw_sign(SignatureType::Decimal.prepended_hash(HASH));
        for wrong in [SignatureType::NoPrepend, SignatureType::Hexadecimal] {
            let typed = TypedSignature::new(&raw, wrong).unwrap();
            assert!(!hash_has_valid_signature(HASH, typed.as_bytes(), key().address()));
        }
    }

    #[test]
    fn test_invalid_signatures_are_values() {
        let mut bad: Vec<Vec<u8>> = vec![
            vec![],
            vec![0xab, 0x03],
            vec![0u8; 64],
            vec![0u8; 66],
            [vec![0xab; 65], vec![0x01]].concat(),
            vec![0x01; 71],
        ];
        // valid signature with an out-of-range tag
        let mut unknown_tag = raw_sign(HASH).to_vec();
        unknown_tag.push(0x03);
        bad.push(unknown_tag);

        for sig in bad {
            assert!(recover_signer(HASH, &sig).is_err(), "{sig:?}");
            assert!(!hash_has_valid_signature(HASH, &sig, key().address()));
        }
    }

    #[test]
    fn test_normalize_recovery_id() {
        let mut raw = raw_sign(HASH);
        let expected = raw[64];
        raw[64] -= 27;
        assert_eq!(normalize_recovery_id(&raw).unwrap()[64], expected);

        raw[64] = 0x1c;
        assert_eq!(normalize_recovery_id(&raw).unwrap()[64], 0x1c);

        raw[64] = 0x25;
        assert_eq!(
            normalize_recovery_id(&raw),
            Err(SignatureError::InvalidRecoveryId(0x25))
        );
        assert_eq!(
            normalize_recovery_id(&raw[..10]),
            Err(SignatureError::InvalidLength(10))
        );
    }

    #[test]
    fn test_encode_rejects_unknown_tag() {
        let raw = raw_sign(HASH);
        assert_eq!(
            TypedSignature::encode(&raw, 3),
            Err(SignatureError::UnknownSignatureType(3))
        );
        assert_eq!(TypedSignature::encode(&raw, 2).unwrap().tag(), 2);
    }

    #[test]
    fn test_hex_wire_format() {
        let typed = TypedSignature::new(&raw_sign(HASH), SignatureType::Decimal).unwrap();
        let text = typed.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 132);
        assert!(text.ends_with("01"));
        assert_eq!(text.parse::<TypedSignature>().unwrap(), typed);
        assert!("0x1234".parse::<TypedSignature>().is_err());
    }
}
