//! Signing back-ends and signing-method dispatch.
//!
//! A [`SigningBackend`] exposes two primitives: the personal-sign primitive
//! (`eth_sign`) and typed-data signing (`eth_signTypedData*`). Which one is
//! used, how its output is tagged, and which RPC shape the typed-data request
//! takes is decided by [`SigningMethod`].

use std::{borrow::Cow, fmt, str::FromStr};

use alloy::{
    primitives::{Address, B256, Bytes},
    providers::Provider,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::DexError,
    signature::{SignatureType, TypedSignature, hash_has_valid_signature},
};

/// How a hash or typed-data message gets signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SigningMethod {
    /// Personal-sign primitive, tagged as signed over the EIP-191 prepended hash.
    Hash,
    /// Personal-sign primitive, tagged as signed over the raw hash.
    UnsafeHash,
    /// [`SigningMethod::UnsafeHash`] if the result verifies locally,
    /// [`SigningMethod::Hash`] otherwise.
    Compatibility,
    /// `eth_signTypedData` with the JSON document.
    TypedData,
    /// `eth_signTypedData_v3` with the serialized document.
    LegacyV3,
    /// `eth_signTypedData_v4` with the serialized document.
    LegacyV4,
    /// `eth_signTypedData_v4` with the JSON document.
    WalletSpecific,
}

impl SigningMethod {
    /// Whether the method goes through `eth_signTypedData*` rather than the
    /// personal-sign primitive.
    pub fn is_typed_data(&self) -> bool {
        match self {
            SigningMethod::Hash | SigningMethod::UnsafeHash | SigningMethod::Compatibility => false,
            SigningMethod::TypedData
            | SigningMethod::LegacyV3
            | SigningMethod::LegacyV4
            | SigningMethod::WalletSpecific => true,
        }
    }
}

impl FromStr for SigningMethod {
    type Err = DexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hash" => Ok(SigningMethod::Hash),
            "UnsafeHash" => Ok(SigningMethod::UnsafeHash),
            "Compatibility" => Ok(SigningMethod::Compatibility),
            "TypedData" => Ok(SigningMethod::TypedData),
            "LegacyV3" | "MetaMask" => Ok(SigningMethod::LegacyV3),
            "LegacyV4" | "MetaMaskLatest" => Ok(SigningMethod::LegacyV4),
            "WalletSpecific" | "CoinbaseWallet" => Ok(SigningMethod::WalletSpecific),
            _ => Err(DexError::InvalidArgument(format!(
                "invalid signing method: {s}"
            ))),
        }
    }
}

impl fmt::Display for SigningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Typed-data signing request in the shape of one of the
/// `eth_signTypedData*` RPC methods.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedDataRequest {
    pub rpc_method: &'static str,
    /// Typed-data document, either the JSON object or its serialized string.
    pub payload: Value,
    /// EIP-712 signable hash of the document.
    pub signing_hash: B256,
}

impl TypedDataRequest {
    /// Request for `method`, `None` for the personal-sign methods.
    pub fn new(method: SigningMethod, document: Value, signing_hash: B256) -> Option<Self> {
        let (rpc_method, as_string) = match method {
            SigningMethod::Hash | SigningMethod::UnsafeHash | SigningMethod::Compatibility => {
                return None;
            }
            SigningMethod::TypedData => ("eth_signTypedData", false),
            SigningMethod::LegacyV3 => ("eth_signTypedData_v3", true),
            SigningMethod::LegacyV4 => ("eth_signTypedData_v4", true),
            SigningMethod::WalletSpecific => ("eth_signTypedData_v4", false),
        };
        let payload = if as_string {
            Value::String(document.to_string())
        } else {
            document
        };
        Some(Self {
            rpc_method,
            payload,
            signing_hash,
        })
    }
}

/// Signer back-end. Both primitives return the raw 65-byte signature, the
/// recovery id may come back as 0/1.
pub trait SigningBackend: Send + Sync {
    /// Personal-sign primitive. Back-ends that follow `eth_sign` semantics
    /// sign the EIP-191 prepended hash, others sign `hash` as-is.
    fn sign_hash(
        &self,
        signer: Address,
        hash: B256,
    ) -> impl Future<Output = Result<Bytes, DexError>> + Send;

    fn sign_typed_data(
        &self,
        signer: Address,
        request: &TypedDataRequest,
    ) -> impl Future<Output = Result<Bytes, DexError>> + Send;
}

/// Signs `hash` with `method` and tags the result.
///
/// `typed_data` builds the typed-data document for the typed-data methods,
/// it is not evaluated for the personal-sign ones.
pub async fn sign_with<S, F>(
    backend: &S,
    method: SigningMethod,
    signer: Address,
    hash: B256,
    typed_data: F,
) -> Result<TypedSignature, DexError>
where
    S: SigningBackend,
    F: FnOnce() -> Value,
{
    if method.is_typed_data() {
        let request = TypedDataRequest::new(method, typed_data(), hash).ok_or_else(|| {
            DexError::InvalidArgument(format!("{method} is not a typed-data method"))
        })?;
        let raw = backend.sign_typed_data(signer, &request).await?;
        return Ok(TypedSignature::new(&raw, SignatureType::NoPrepend)?);
    }

    let raw = backend.sign_hash(signer, hash).await?;
    let hash_sig = TypedSignature::new(&raw, SignatureType::Decimal)?;
    if method == SigningMethod::Hash {
        return Ok(hash_sig);
    }
    let unsafe_hash_sig = TypedSignature::new(&raw, SignatureType::NoPrepend)?;
    if method == SigningMethod::UnsafeHash {
        return Ok(unsafe_hash_sig);
    }
    if hash_has_valid_signature(hash, unsafe_hash_sig.as_bytes(), signer) {
        return Ok(unsafe_hash_sig);
    }
    debug!(%signer, %hash, "signer prepends, falling back to decimal tag");
    Ok(hash_sig)
}

/// Back-end delegating to the signer managed by an RPC node or wallet.
#[derive(Clone, Debug)]
pub struct RpcSigner<P> {
    provider: P,
}

impl<P> RpcSigner<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: Provider + Send + Sync> SigningBackend for RpcSigner<P> {
    async fn sign_hash(&self, signer: Address, hash: B256) -> Result<Bytes, DexError> {
        self.provider
            .raw_request::<_, Bytes>(Cow::Borrowed("eth_sign"), (signer, hash))
            .await
            .map_err(|err| DexError::Signer(err.to_string()))
    }

    async fn sign_typed_data(
        &self,
        signer: Address,
        request: &TypedDataRequest,
    ) -> Result<Bytes, DexError> {
        self.provider
            .raw_request::<_, Bytes>(
                Cow::Borrowed(request.rpc_method),
                (signer, request.payload.clone()),
            )
            .await
            .map_err(|err| DexError::Signer(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_signing_method_parsing() {
        assert_eq!(
            "Compatibility".parse::<SigningMethod>().unwrap(),
            SigningMethod::Compatibility
        );
        assert_eq!(
            "MetaMaskLatest".parse::<SigningMethod>().unwrap(),
            SigningMethod::LegacyV4
        );
        assert!(matches!(
            "Telepathy".parse::<SigningMethod>(),
            Err(DexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_typed_data_methods() {
        let typed = [
            SigningMethod::TypedData,
            SigningMethod::LegacyV3,
            SigningMethod::LegacyV4,
            SigningMethod::WalletSpecific,
        ];
        for method in typed {
            assert!(method.is_typed_data(), "{method}");
            assert!(TypedDataRequest::new(method, Value::Null, B256::ZERO).is_some());
        }
        for method in [
            SigningMethod::Hash,
            SigningMethod::UnsafeHash,
            SigningMethod::Compatibility,
        ] {
            assert!(!method.is_typed_data(), "{method}");
        }
    }

    #[test]
    fn test_typed_data_request_shapes() {
        let doc = json!({ "primaryType": "Order" });
        let hash = B256::repeat_byte(1);

        assert_eq!(TypedDataRequest::new(SigningMethod::Hash, doc.clone(), hash), None);

        let typed = TypedDataRequest::new(SigningMethod::TypedData, doc.clone(), hash).unwrap();
        assert_eq!(typed.rpc_method, "eth_signTypedData");
        assert!(typed.payload.is_object());

        let v3 = TypedDataRequest::new(SigningMethod::LegacyV3, doc.clone(), hash).unwrap();
        assert_eq!(v3.rpc_method, "eth_signTypedData_v3");
        assert_eq!(v3.payload, Value::String(doc.to_string()));

        let v4 = TypedDataRequest::new(SigningMethod::LegacyV4, doc.clone(), hash).unwrap();
        assert_eq!(v4.rpc_method, "eth_signTypedData_v4");
        assert!(v4.payload.is_string());

        let wallet = TypedDataRequest::new(SigningMethod::WalletSpecific, doc, hash).unwrap();
        assert_eq!(wallet.rpc_method, "eth_signTypedData_v4");
        assert!(wallet.payload.is_object());
    }
}
