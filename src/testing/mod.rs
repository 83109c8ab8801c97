//! In-process collaborators for tests and local development.
//!
//! [`LocalSigners`] is a [`SigningBackend`] over private keys held in memory,
//! either with `eth_sign` semantics or signing hashes as-is.
//!
//! [`ScriptedChain`] is a [`ChainClient`] replaying scripted submission
//! events and recording every transaction it was asked to send.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use alloy::{
    eips::BlockId,
    primitives::{Address, B256, Bytes, address, eip191_hash_message},
    rpc::types::TransactionRequest,
    signers::{SignerSync, local::PrivateKeySigner},
};
use dashmap::DashMap;
use futures::{StreamExt, stream};

use crate::{
    Chain,
    chain::{ChainClient, TxEvent, TxEventStream, TxReceipt},
    eip712,
    error::{DexError, RevertReason},
    signing::{SigningBackend, TypedDataRequest},
};

pub const CHAIN_ID: u64 = 1337;

/// Default anvil/hardhat development keys.
pub const DEV_KEYS: [&str; 4] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "0x7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
];

/// Deployment with fixed addresses, nothing is deployed behind them.
pub fn test_chain() -> Chain {
    Chain::custom(
        CHAIN_ID,
        address!("0x06012c8cf97bead5deae237070f9587f8e7a266d"),
        address!("0x22012c8cf97bead5deae237070f9587f8e7a266d"),
        address!("0x32012c8cf97bead5deae237070f9587f8e7a266d"),
        address!("0x42012c8cf97bead5deae237070f9587f8e7a266d"),
        address!("0x52012c8cf97bead5deae237070f9587f8e7a266d"),
    )
}

/// Signing back-end over in-memory private keys.
#[derive(Debug)]
pub struct LocalSigners {
    keys: DashMap<Address, PrivateKeySigner>,
    prepend: bool,
}

impl Default for LocalSigners {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSigners {
    /// `eth_sign` semantics: the personal-sign primitive signs the EIP-191
    /// prepended hash.
    pub fn new() -> Self {
        Self {
            keys: DashMap::new(),
            prepend: true,
        }
    }

    /// The personal-sign primitive signs the hash as-is.
    pub fn raw() -> Self {
        Self {
            keys: DashMap::new(),
            prepend: false,
        }
    }

    /// Adds all [`DEV_KEYS`].
    pub fn with_dev_keys(self) -> Self {
        for key in DEV_KEYS {
            // constant keys are valid
            if let Ok(signer) = key.parse::<PrivateKeySigner>() {
                self.add(signer);
            }
        }
        self
    }

    pub fn add(&self, signer: PrivateKeySigner) -> Address {
        let address = signer.address();
        self.keys.insert(address, signer);
        address
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.keys.contains_key(address)
    }

    fn sign(&self, signer: Address, hash: B256) -> Result<Bytes, DexError> {
        let key = self
            .keys
            .get(&signer)
            .ok_or_else(|| DexError::Signer(format!("unknown account {signer}")))?;
        let signature = key
            .sign_hash_sync(&hash)
            .map_err(|err| DexError::Signer(err.to_string()))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

/// Address of `DEV_KEYS[i]`.
pub fn dev_address(i: usize) -> Address {
    DEV_KEYS
        .get(i)
        .and_then(|key| key.parse::<PrivateKeySigner>().ok())
        .map(|signer| signer.address())
        .unwrap_or_default()
}

impl SigningBackend for LocalSigners {
    async fn sign_hash(&self, signer: Address, hash: B256) -> Result<Bytes, DexError> {
        if self.prepend {
            self.sign(signer, eip191_hash_message(hash))
        } else {
            self.sign(signer, hash)
        }
    }

    /// Signs the hash of the document itself, like a wallet would.
    async fn sign_typed_data(
        &self,
        signer: Address,
        request: &TypedDataRequest,
    ) -> Result<Bytes, DexError> {
        let hash = eip712::typed_data_signing_hash(&request.payload)
            .map_err(|err| DexError::Signer(err.to_string()))?;
        self.sign(signer, hash)
    }
}

/// Mined receipt of `hash` with a successful status.
pub fn receipt(hash: B256, gas_used: u64) -> TxReceipt {
    TxReceipt {
        transaction_hash: hash,
        block_number: Some(1),
        gas_used: Some(gas_used),
        status: true,
    }
}

/// Events of a submission mined without confirmations requested.
pub fn mined(hash: B256, gas_used: u64) -> Vec<TxEvent> {
    vec![
        TxEvent::TransactionHash(hash),
        TxEvent::Receipt(receipt(hash, gas_used)),
    ]
}

/// Events of a submission reaching `confirmations` confirmations.
pub fn confirmed(hash: B256, gas_used: u64, confirmations: u64) -> Vec<TxEvent> {
    let mut events = vec![TxEvent::TransactionHash(hash)];
    events.extend((1..=confirmations).map(|n| TxEvent::Confirmation(n, receipt(hash, gas_used))));
    events
}

/// [`ChainClient`] replaying one script of events per submission, in order.
///
/// A submission with no script left yields an empty stream.
#[derive(Debug)]
pub struct ScriptedChain {
    estimate: Mutex<Result<u64, String>>,
    scripts: Mutex<VecDeque<Vec<TxEvent>>>,
    sent: Mutex<Vec<(TransactionRequest, Option<u64>)>>,
    call_result: Bytes,
}

impl Default for ScriptedChain {
    fn default() -> Self {
        Self::new(21_000)
    }
}

impl ScriptedChain {
    pub fn new(gas_estimate: u64) -> Self {
        Self {
            estimate: Mutex::new(Ok(gas_estimate)),
            scripts: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            call_result: Bytes::new(),
        }
    }

    /// Gas estimation reverts with `reason`.
    pub fn reverting(self, reason: impl Into<String>) -> Self {
        *lock(&self.estimate) = Err(reason.into());
        self
    }

    pub fn with_call_result(mut self, data: impl Into<Bytes>) -> Self {
        self.call_result = data.into();
        self
    }

    /// Queues the events of the next submission.
    pub fn push_script(&self, events: Vec<TxEvent>) {
        lock(&self.scripts).push_back(events);
    }

    /// Transactions sent so far, with their requested confirmations.
    pub fn sent(&self) -> Vec<(TransactionRequest, Option<u64>)> {
        lock(&self.sent).clone()
    }
}

impl ChainClient for ScriptedChain {
    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64, DexError> {
        lock(&self.estimate)
            .clone()
            .map_err(|reason| DexError::Reverted(Box::new(RevertReason::Generic(reason))))
    }

    async fn call(&self, _tx: &TransactionRequest, _block: BlockId) -> Result<Bytes, DexError> {
        Ok(self.call_result.clone())
    }

    fn send(&self, tx: TransactionRequest, confirmations: Option<u64>) -> TxEventStream {
        lock(&self.sent).push((tx, confirmations));
        let events = lock(&self.scripts).pop_front().unwrap_or_default();
        stream::iter(events).boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
