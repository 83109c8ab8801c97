//! EIP-712 typed structured data hashing.
//!
//! Struct hashes are assembled word by word with [`crate::bytes`] so that the
//! byte layout is explicit and matches what the on-chain verifier re-derives.

use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, B256, U256, keccak256},
};
use serde_json::{Value, json};

use crate::{bytes, error::DexError};

pub const EIP712_DOMAIN_STRING: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Two-byte prefix of the signable hash.
pub const EIP191_HEADER: [u8; 2] = [0x19, 0x01];

/// Type schema of a struct: name and `(type, name)` member list.
#[derive(Clone, Copy, Debug)]
pub struct TypeSchema {
    pub name: &'static str,
    pub members: &'static [(&'static str, &'static str)],
}

pub const DOMAIN_SCHEMA: TypeSchema = TypeSchema {
    name: "EIP712Domain",
    members: &[
        ("string", "name"),
        ("string", "version"),
        ("uint256", "chainId"),
        ("address", "verifyingContract"),
    ],
};

impl TypeSchema {
    /// `Name(type1 name1,type2 name2,...)`
    pub fn type_string(&self) -> String {
        let members = self
            .members
            .iter()
            .map(|(ty, name)| format!("{ty} {name}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({members})", self.name)
    }

    pub fn type_hash(&self) -> B256 {
        bytes::hash_string(&self.type_string())
    }

    /// Member list in the JSON shape `eth_signTypedData` expects.
    pub fn json_members(&self) -> Value {
        Value::Array(
            self.members
                .iter()
                .map(|(ty, name)| json!({ "name": name, "type": ty }))
                .collect(),
        )
    }
}

/// Domain the signatures are bound to.
///
/// The hash is derived from the instance on every call, two domains bound to
/// different chains or verifying contracts never share a separator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn hash(&self) -> B256 {
        domain_hash(
            &self.name,
            &self.version,
            self.chain_id,
            self.verifying_contract,
        )
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "version": self.version,
            "chainId": self.chain_id,
            "verifyingContract": self.verifying_contract.to_string(),
        })
    }
}

pub fn domain_hash(name: &str, version: &str, chain_id: u64, verifying_contract: Address) -> B256 {
    struct_hash(
        &DOMAIN_SCHEMA,
        &[
            bytes::hash_string(name),
            bytes::hash_string(version),
            bytes::u256_to_bytes32(U256::from(chain_id)),
            bytes::address_to_bytes32(verifying_contract),
        ],
    )
}

/// `keccak256(typeHash ‖ field_1 ‖ ... ‖ field_n)`, fields already encoded as
/// words in canonical order.
pub fn struct_hash(schema: &TypeSchema, fields: &[B256]) -> B256 {
    debug_assert_eq!(schema.members.len(), fields.len());
    let type_hash = schema.type_hash();
    keccak256(bytes::combine(
        std::iter::once(&type_hash).chain(fields.iter()),
    ))
}

/// `keccak256(0x1901 ‖ domainHash ‖ structHash)`
pub fn signable_hash(domain_hash: B256, struct_hash: B256) -> B256 {
    keccak256(bytes::combine([
        &EIP191_HEADER[..],
        domain_hash.as_slice(),
        struct_hash.as_slice(),
    ]))
}

/// Full typed-data document handed to external `eth_signTypedData` signers.
pub fn typed_data_json(domain: &Domain, primary: &TypeSchema, message: Value) -> Value {
    let mut types = serde_json::Map::new();
    types.insert(DOMAIN_SCHEMA.name.to_string(), DOMAIN_SCHEMA.json_members());
    types.insert(primary.name.to_string(), primary.json_members());
    json!({
        "types": types,
        "domain": domain.to_json(),
        "primaryType": primary.name,
        "message": message,
    })
}

/// Signable hash of a typed-data document, derived from the JSON alone the
/// way a wallet does. Accepts the document or its serialized string.
pub fn typed_data_signing_hash(document: &Value) -> Result<B256, DexError> {
    let typed_data = match document {
        Value::String(serialized) => serde_json::from_str::<TypedData>(serialized),
        document => serde_json::from_value::<TypedData>(document.clone()),
    }
    .map_err(|err| DexError::InvalidArgument(format!("malformed typed data: {err}")))?;
    typed_data
        .eip712_signing_hash()
        .map_err(|err| DexError::InvalidArgument(format!("typed data does not hash: {err}")))
}
