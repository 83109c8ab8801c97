//! Transaction lifecycle: gas estimation, submission and resolution
//! according to a [`ConfirmationType`], with optional gas accounting.
//!
//! A submission runs as a background task reading the event stream of the
//! [`ChainClient`]. It settles up to two one-shot results:
//!
//! * the hash result, on the first transaction hash, or on an error arriving
//!   before the hash is known;
//! * the confirmation result, on the receipt (or the requested confirmation),
//!   or on an error arriving under [`ConfirmationType::Confirmed`], or under
//!   [`ConfirmationType::Both`] once the hash is known.
//!
//! The task stops reading the stream as soon as every result it tracks is
//! settled, so later events can not settle anything twice.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use alloy::{
    eips::BlockId,
    network::TransactionBuilder,
    primitives::{Address, B256, Bytes},
    rpc::types::TransactionRequest,
};
use futures::StreamExt;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{
    Chain,
    chain::{ChainClient, TxEvent, TxEventStream, TxReceipt},
    error::DexError,
    gas::GasLedger,
    types::{CallOptions, ConfirmationType, SendOptions},
};

pub const DEFAULT_GAS_MULTIPLIER: f64 = 1.5;

/// Whether gas used by a call counts towards the [`GasLedger`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallKind {
    /// Call to a protocol contract, tracked.
    #[default]
    Protocol,
    /// Call to a test helper contract, never tracked.
    Test,
}

/// Encoded contract call.
#[derive(Clone, Debug)]
pub struct ContractCall {
    /// Function name, used as the gas ledger key.
    pub name: String,
    pub to: Address,
    pub data: Bytes,
    pub kind: CallKind,
}

impl ContractCall {
    pub fn new(name: impl Into<String>, to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            to,
            data: data.into(),
            kind: CallKind::Protocol,
        }
    }

    pub fn test(mut self) -> Self {
        self.kind = CallKind::Test;
        self
    }
}

/// Outcome of [`Contracts::send`], shaped by the confirmation type.
#[derive(Debug)]
pub enum TxResult {
    Simulated { gas_estimate: u64 },
    Hash { transaction_hash: B256 },
    Confirmed(TxReceipt),
    Both {
        transaction_hash: B256,
        confirmation: PendingConfirmation,
    },
}

impl TxResult {
    pub fn transaction_hash(&self) -> Option<B256> {
        match self {
            TxResult::Simulated { .. } => None,
            TxResult::Hash { transaction_hash } | TxResult::Both { transaction_hash, .. } => {
                Some(*transaction_hash)
            }
            TxResult::Confirmed(receipt) => Some(receipt.transaction_hash),
        }
    }
}

/// Receipt of a [`ConfirmationType::Both`] submission. Dropping it does not
/// cancel anything, the transaction is already submitted.
#[derive(Debug)]
pub struct PendingConfirmation {
    rx: oneshot::Receiver<Result<TxReceipt, DexError>>,
}

impl Future for PendingConfirmation {
    type Output = Result<TxReceipt, DexError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(DexError::ConfirmationDropped)))
    }
}

/// Sends contract calls through a [`ChainClient`].
#[derive(Debug)]
pub struct Contracts<C> {
    client: Arc<C>,
    chain: Chain,
    ledger: GasLedger,
    defaults: SendOptions,
    track_gas: bool,
}

impl<C> Clone for Contracts<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            chain: self.chain.clone(),
            ledger: self.ledger.clone(),
            defaults: self.defaults.clone(),
            track_gas: self.track_gas,
        }
    }
}

impl<C: ChainClient> Contracts<C> {
    pub fn new(client: C, chain: Chain) -> Self {
        Self {
            client: Arc::new(client),
            chain,
            ledger: GasLedger::new(),
            defaults: SendOptions::default()
                .gas_multiplier(DEFAULT_GAS_MULTIPLIER)
                .confirmation_type(ConfirmationType::Confirmed),
            track_gas: false,
        }
    }

    /// Options applied where a submission leaves them unset.
    pub fn with_defaults(mut self, defaults: SendOptions) -> Self {
        self.defaults = defaults.or(&self.defaults);
        self
    }

    /// Records gas of confirmed protocol calls, meant for local networks.
    pub fn with_gas_tracking(mut self, track_gas: bool) -> Self {
        self.track_gas = track_gas;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn ledger(&self) -> &GasLedger {
        &self.ledger
    }

    pub fn defaults(&self) -> &SendOptions {
        &self.defaults
    }

    fn transaction(&self, call: &ContractCall, options: &SendOptions) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .with_to(call.to)
            .with_input(call.data.clone());
        tx.from = options.from;
        tx.gas = options.gas;
        tx.gas_price = options.gas_price;
        tx.value = options.value;
        tx.nonce = options.nonce;
        tx
    }

    /// Read-only call, returns the raw return data.
    pub async fn call(&self, call: &ContractCall, options: CallOptions) -> Result<Bytes, DexError> {
        let mut tx = TransactionRequest::default()
            .with_to(call.to)
            .with_input(call.data.clone());
        tx.from = options.from.or(self.defaults.from);
        self.client
            .call(&tx, options.block.unwrap_or(BlockId::latest()))
            .await
    }

    /// Submits `call` and resolves it according to the confirmation type.
    ///
    /// The gas is estimated unless given explicitly, and is always estimated
    /// under [`ConfirmationType::Simulate`] which submits nothing.
    pub async fn send(&self, call: ContractCall, options: SendOptions) -> Result<TxResult, DexError> {
        let options = options.or(&self.defaults);
        let confirmation_type = options.confirmation_type.unwrap_or_default();
        let multiplier = options.gas_multiplier.unwrap_or(DEFAULT_GAS_MULTIPLIER);
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(DexError::InvalidArgument(format!(
                "gas multiplier must be positive, got {multiplier}"
            )));
        }
        let mut tx = self.transaction(&call, &options);

        if confirmation_type == ConfirmationType::Simulate || options.gas.is_none() {
            let estimate = self.client.estimate_gas(&tx).await.map_err(|err| {
                warn!(name = %call.name, to = %call.to, %err, "gas estimation failed");
                DexError::estimation(call.to, call.data.clone(), err)
            })?;
            debug!(name = %call.name, estimate, "gas estimated");
            if confirmation_type == ConfirmationType::Simulate {
                return Ok(TxResult::Simulated {
                    gas_estimate: estimate,
                });
            }
            if options.gas.is_none() {
                tx.gas = Some((estimate as f64 * multiplier).floor() as u64);
            }
        }

        let confirmations = options.confirmations.filter(|n| *n >= 1);
        info!(
            name = %call.name,
            to = %call.to,
            gas = ?tx.gas,
            ?confirmation_type,
            "sending transaction"
        );
        let events = self.client.send(tx, confirmations);

        let (hash_tx, hash_rx) = channel_if(confirmation_type.awaits_hash());
        let (receipt_tx, receipt_rx) = channel_if(confirmation_type.awaits_receipt());
        let gas_record = (self.track_gas && call.kind == CallKind::Protocol)
            .then(|| (self.ledger.clone(), call.name.clone()));
        tokio::spawn(dispatch(
            events,
            confirmation_type,
            confirmations,
            hash_tx,
            receipt_tx,
            gas_record,
        ));

        match (hash_rx, receipt_rx) {
            (Some(hash_rx), None) => Ok(TxResult::Hash {
                transaction_hash: hash_rx.await.unwrap_or(Err(DexError::ConfirmationDropped))?,
            }),
            (None, Some(receipt_rx)) => Ok(TxResult::Confirmed(
                PendingConfirmation { rx: receipt_rx }.await?,
            )),
            (Some(hash_rx), Some(receipt_rx)) => Ok(TxResult::Both {
                transaction_hash: hash_rx.await.unwrap_or(Err(DexError::ConfirmationDropped))?,
                confirmation: PendingConfirmation { rx: receipt_rx },
            }),
            (None, None) => Err(DexError::InvalidArgument(format!(
                "nothing to await under {confirmation_type:?}"
            ))),
        }
    }
}

type ResultSender<T> = oneshot::Sender<Result<T, DexError>>;
type ResultReceiver<T> = oneshot::Receiver<Result<T, DexError>>;

fn channel_if<T>(enabled: bool) -> (Option<ResultSender<T>>, Option<ResultReceiver<T>>) {
    if enabled {
        let (tx, rx) = oneshot::channel();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    }
}

/// Settles the hash and confirmation results from the submission events.
async fn dispatch(
    mut events: TxEventStream,
    confirmation_type: ConfirmationType,
    confirmations: Option<u64>,
    mut hash: Option<ResultSender<B256>>,
    mut receipt: Option<ResultSender<TxReceipt>>,
    gas_record: Option<(GasLedger, String)>,
) {
    let mut hash_known = false;
    // The confirmation stays open without a listener while gas is recorded.
    let mut confirmation_open = receipt.is_some();

    while hash.is_some() || confirmation_open {
        if hash.as_ref().is_some_and(|tx| tx.is_closed()) {
            hash = None;
        }
        if receipt.as_ref().is_some_and(|tx| tx.is_closed()) {
            receipt = None;
            confirmation_open = gas_record.is_some();
        }

        let Some(event) = events.next().await else {
            debug!("transaction event stream ended");
            break;
        };
        match event {
            TxEvent::TransactionHash(transaction_hash) => {
                hash_known = true;
                if let Some(tx) = hash.take() {
                    let _ = tx.send(Ok(transaction_hash));
                }
            }
            TxEvent::Confirmation(n, tx_receipt) => {
                if confirmation_open && confirmations.is_some_and(|required| n >= required) {
                    debug!(hash = %tx_receipt.transaction_hash, n, "transaction confirmed");
                    settle_receipt(&mut receipt, &gas_record, tx_receipt);
                    confirmation_open = false;
                }
            }
            TxEvent::Receipt(tx_receipt) => {
                if confirmation_open && confirmations.is_none() {
                    debug!(hash = %tx_receipt.transaction_hash, "transaction mined");
                    settle_receipt(&mut receipt, &gas_record, tx_receipt);
                    confirmation_open = false;
                }
            }
            TxEvent::Error(err) => {
                warn!(%err, hash_known, "transaction error");
                if !hash_known && let Some(tx) = hash.take() {
                    let _ = tx.send(Err(err));
                    // the caller gets no confirmation half after a hash failure
                    confirmation_open = false;
                } else if confirmation_open
                    && (confirmation_type == ConfirmationType::Confirmed || hash_known)
                {
                    if let Some(tx) = receipt.take() {
                        let _ = tx.send(Err(err));
                    }
                    confirmation_open = false;
                }
            }
        }
    }
}

fn settle_receipt(
    receipt: &mut Option<ResultSender<TxReceipt>>,
    gas_record: &Option<(GasLedger, String)>,
    tx_receipt: TxReceipt,
) {
    if let (Some((ledger, name)), Some(gas_used)) = (gas_record, tx_receipt.gas_used) {
        debug!(%name, gas_used, "recording gas");
        ledger.record(name.clone(), gas_used);
    }
    if let Some(tx) = receipt.take() {
        let _ = tx.send(Ok(tx_receipt));
    }
}
