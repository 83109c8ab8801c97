use std::fmt::Display;

use alloy::{
    primitives::{Address, Bytes},
    providers::PendingTransactionError,
    sol_types::{GenericContractError, SolInterface},
    transports,
};

use crate::signature::SignatureError;

pub type DexError = ProviderError<GenericContractError>;

/// Call/transaction revert reason decoded by
/// the provided known ABI or in a generic raw form
/// if can not be decoded.
#[derive(Debug)]
pub enum RevertReason<R> {
    Known(R),
    Generic(String),
    Unknown,
}

/// Error of a signing, batching or submission operation, including the
/// classified errors returned by the RPC provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError<R> {
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unexpected empty RPC response")]
    NullResp,

    #[error("transaction ran out of gas")]
    OutOfGas,

    #[error("transaction reverted: {0:?}")]
    Reverted(Box<RevertReason<R>>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transaction timed out")]
    Timeout,

    #[error("gas estimation failed, to: {to}, data: {data}: {reason}")]
    Estimation {
        to: Address,
        data: Bytes,
        reason: String,
    },

    #[error("trade operation already committed")]
    AlreadyCommitted,

    #[error("no accounts or trade args to commit")]
    EmptyBatch,

    #[error("signer error: {0}")]
    Signer(String),

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    #[error("transaction event stream ended before the awaited event")]
    ConfirmationDropped,
}

impl<R: SolInterface> From<PendingTransactionError> for ProviderError<R> {
    fn from(value: PendingTransactionError) -> Self {
        match value {
            PendingTransactionError::FailedToRegister => Self::Fatal(value.to_string()),
            PendingTransactionError::TransportError(rpc_err) => Self::from(rpc_err),
            PendingTransactionError::Recv(_) => Self::Transport(value.to_string()),
            PendingTransactionError::TxWatcher(err) => match err {
                alloy::providers::WatchTxError::Timeout => Self::Timeout,
            },
        }
    }
}

impl<E: Display, R: SolInterface> From<transports::RpcError<E>> for ProviderError<R> {
    fn from(value: transports::RpcError<E>) -> Self {
        match value {
            transports::RpcError::ErrorResp(ref resp) => {
                // Heuristic to determine if eth_call failed due to OutOfGas or
                // if transaction was reverted during the gas estimation
                let msg = resp.message.to_ascii_lowercase();
                if (resp.code == -32603) && (msg.contains("gas") || msg.contains("oog")) {
                    Self::OutOfGas
                } else if ((resp.code == -32600 || resp.code == -32601 || resp.code == -32602)
                    && (msg.contains("invalid") || msg.contains("not found")))
                    || (resp.code == -32603
                        && (msg.contains("block by number") || msg.contains("getting block")))
                {
                    Self::InvalidRequest(msg)
                } else if resp.code == 3 && msg.contains("reverted") {
                    Self::Reverted(Box::new(RevertReason::from(value)))
                } else {
                    Self::Transport(value.to_string())
                }
            }
            transports::RpcError::NullResp => Self::NullResp,
            _ => Self::Transport(value.to_string()),
        }
    }
}

impl<R> ProviderError<R> {
    /// Wraps an estimation failure with the call it was estimating.
    pub fn estimation(to: Address, data: Bytes, reason: impl Display) -> Self {
        Self::Estimation {
            to,
            data,
            reason: reason.to_string(),
        }
    }
}

impl<E: Display, R: SolInterface> From<transports::RpcError<E>> for RevertReason<R> {
    fn from(value: transports::RpcError<E>) -> Self {
        match value.as_error_resp() {
            Some(payload) => match payload.as_decoded_interface_error::<R>() {
                Some(known) => Self::Known(known),
                None => Self::Generic(value.to_string()),
            },
            None => Self::Generic(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        rpc::json_rpc::ErrorPayload,
        transports::{RpcError, TransportErrorKind},
    };

    use super::*;

    fn resp(code: i64, message: &str) -> RpcError<TransportErrorKind> {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.to_string().into(),
            data: None,
        })
    }

    #[test]
    fn test_rpc_error_classification() {
        assert!(matches!(
            DexError::from(resp(-32603, "out of gas")),
            DexError::OutOfGas
        ));
        assert!(matches!(
            DexError::from(resp(-32602, "invalid params")),
            DexError::InvalidRequest(_)
        ));
        assert!(matches!(
            DexError::from(resp(3, "execution reverted")),
            DexError::Reverted(_)
        ));
        assert!(matches!(
            DexError::from(resp(-32000, "nonce too low")),
            DexError::Transport(_)
        ));
        assert!(matches!(
            DexError::from(RpcError::<TransportErrorKind>::NullResp),
            DexError::NullResp
        ));
    }

    #[test]
    fn test_estimation_error_carries_call() {
        let err = DexError::estimation(Address::repeat_byte(7), Bytes::from(vec![0xab]), "boom");
        let text = err.to_string();
        assert!(text.contains("0xab"));
        assert!(text.contains("boom"));
        assert!(matches!(err, DexError::Estimation { to, .. } if to == Address::repeat_byte(7)));
    }
}
