//! The chain as seen by the transaction lifecycle: gas estimation, read-only
//! calls and submissions that report their progress as a stream of events.

use alloy::{
    eips::BlockId,
    network::{Ethereum, ReceiptResponse},
    primitives::{B256, Bytes},
    providers::{PendingTransactionBuilder, Provider},
    rpc::types::TransactionRequest,
};
use futures::{StreamExt, stream::{self, BoxStream}};
use tracing::debug;

use crate::error::DexError;

/// Summary of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub status: bool,
}

impl TxReceipt {
    pub fn from_response<R: ReceiptResponse>(receipt: &R) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash(),
            block_number: receipt.block_number(),
            gas_used: Some(receipt.gas_used()),
            status: receipt.status(),
        }
    }
}

/// Progress of one submitted transaction.
#[derive(Debug)]
pub enum TxEvent {
    /// Node accepted the transaction.
    TransactionHash(B256),
    /// Transaction has the given number of confirmations.
    Confirmation(u64, TxReceipt),
    Receipt(TxReceipt),
    Error(DexError),
}

pub type TxEventStream = BoxStream<'static, TxEvent>;

/// Chain collaborator used to estimate, call and send transactions.
pub trait ChainClient: Send + Sync + 'static {
    fn estimate_gas(
        &self,
        tx: &TransactionRequest,
    ) -> impl Future<Output = Result<u64, DexError>> + Send;

    fn call(
        &self,
        tx: &TransactionRequest,
        block: BlockId,
    ) -> impl Future<Output = Result<Bytes, DexError>> + Send;

    /// Submits `tx`. The stream ends after the terminal event: an error, the
    /// receipt, or the `confirmations`-th confirmation when requested.
    fn send(&self, tx: TransactionRequest, confirmations: Option<u64>) -> TxEventStream;
}

/// [`ChainClient`] backed by a JSON-RPC [`Provider`].
///
/// Transactions are signed by the provider's wallet or by the node.
#[derive(Clone, Debug)]
pub struct RpcChain<P> {
    provider: P,
}

impl<P> RpcChain<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

enum SendState<P> {
    Submit {
        provider: P,
        tx: Box<TransactionRequest>,
        confirmations: Option<u64>,
    },
    Pending {
        pending: PendingTransactionBuilder<Ethereum>,
        confirmations: Option<u64>,
    },
    Done,
}

impl<P: Provider + Clone + 'static> ChainClient for RpcChain<P> {
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, DexError> {
        Ok(self.provider.estimate_gas(tx.clone()).await?)
    }

    async fn call(&self, tx: &TransactionRequest, block: BlockId) -> Result<Bytes, DexError> {
        Ok(self.provider.call(tx.clone()).block(block).await?)
    }

    fn send(&self, tx: TransactionRequest, confirmations: Option<u64>) -> TxEventStream {
        let init = SendState::Submit {
            provider: self.provider.clone(),
            tx: Box::new(tx),
            confirmations,
        };
        stream::unfold(init, |state| async move {
            match state {
                SendState::Submit {
                    provider,
                    tx,
                    confirmations,
                } => match provider.send_transaction(*tx).await {
                    Ok(pending) => {
                        let hash = *pending.tx_hash();
                        debug!(%hash, "transaction submitted");
                        Some((
                            TxEvent::TransactionHash(hash),
                            SendState::Pending {
                                pending,
                                confirmations,
                            },
                        ))
                    }
                    Err(err) => Some((TxEvent::Error(err.into()), SendState::Done)),
                },
                SendState::Pending {
                    pending,
                    confirmations,
                } => {
                    let required = confirmations.unwrap_or(1).max(1);
                    let event = match pending
                        .with_required_confirmations(required)
                        .get_receipt()
                        .await
                    {
                        Ok(receipt) => {
                            let receipt = TxReceipt::from_response(&receipt);
                            match confirmations {
                                Some(n) => TxEvent::Confirmation(n, receipt),
                                None => TxEvent::Receipt(receipt),
                            }
                        }
                        Err(err) => TxEvent::Error(err.into()),
                    };
                    Some((event, SendState::Done))
                }
                SendState::Done => None,
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        network::TransactionBuilder,
        node_bindings::Anvil,
        primitives::{Address, U256},
        providers::ProviderBuilder,
    };

    use super::*;

    #[tokio::test]
    #[ignore = "requires a local anvil binary"]
    async fn test_rpc_chain_value_transfer() {
        let anvil = Anvil::new().try_spawn().unwrap();
        let from = anvil.addresses()[0];
        let provider = ProviderBuilder::new()
            .wallet(anvil.wallet().unwrap())
            .connect_http(anvil.endpoint_url());
        let chain = RpcChain::new(provider);

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(Address::repeat_byte(0x42))
            .with_value(U256::from(1));
        let gas = chain.estimate_gas(&tx).await.unwrap();
        assert_eq!(gas, 21_000);

        let events = chain.send(tx, None).collect::<Vec<_>>().await;
        assert_eq!(events.len(), 2);
        let TxEvent::TransactionHash(hash) = events[0] else {
            panic!("expected hash, got {:?}", events[0]);
        };
        let TxEvent::Receipt(receipt) = &events[1] else {
            panic!("expected receipt, got {:?}", events[1]);
        };
        assert_eq!(receipt.transaction_hash, hash);
        assert_eq!(receipt.gas_used, Some(21_000));
        assert!(receipt.status);
    }
}
