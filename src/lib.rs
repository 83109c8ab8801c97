//! Perpetual exchange client SDK.
//!
//! # Overview
//!
//! Produces and verifies signed off-chain orders, batches fills into one
//! atomic `trade` call and drives the submission of that call to the chain.
//!
//! Use [`orders::Orders`] to hash and sign [`types::Order`]s with any
//! [`signing::SigningBackend`], [`trade::TradeOperation`] to batch fills,
//! liquidations and deleveragings, and [`contracts::Contracts`] to submit
//! transactions with one of the [`types::ConfirmationType`]s.
//!
//! [`Perpetual`] bundles all of the above for one deployment.
//!
//! See `./tests` for examples.
//!
//! # Testing
//!
//! [`testing`] module provides in-process chain and signer collaborators
//! with scripted behavior.

pub mod abi;
pub mod bridge;
pub mod bytes;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod eip712;
pub mod error;
pub mod gas;
pub mod num;
pub mod orders;
mod perpetual;
pub mod signature;
pub mod signing;
pub mod testing;
pub mod trade;
pub mod types;

pub use perpetual::Perpetual;

use alloy::primitives::Address;

#[derive(Clone, Debug)]
/// Deployment of the perpetual and its trader modules on one chain.
pub struct Chain {
    chain_id: u64,
    perpetual: Address,
    orders: Address,
    liquidation: Address,
    deleveraging: Address,
    bridge_proxy: Address,
}

impl Chain {
    pub fn custom(
        chain_id: u64,
        perpetual: Address,
        orders: Address,
        liquidation: Address,
        deleveraging: Address,
        bridge_proxy: Address,
    ) -> Self {
        Self {
            chain_id,
            perpetual,
            orders,
            liquidation,
            deleveraging,
            bridge_proxy,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Perpetual proxy, target of `trade`.
    pub fn perpetual(&self) -> Address {
        self.perpetual
    }

    /// Orders trader, verifying contract of order signatures.
    pub fn orders(&self) -> Address {
        self.orders
    }

    pub fn liquidation(&self) -> Address {
        self.liquidation
    }

    pub fn deleveraging(&self) -> Address {
        self.deleveraging
    }

    pub fn bridge_proxy(&self) -> Address {
        self.bridge_proxy
    }
}
