use std::str::FromStr;

use alloy::{
    eips::BlockId,
    primitives::{Address, U256},
};

use crate::error::DexError;

/// Which chain event a submission resolves on.
///
/// * [`ConfirmationType::Hash`] resolves as soon as the node accepts the
///   transaction and returns its hash.
/// * [`ConfirmationType::Confirmed`] resolves on the receipt, or on the
///   requested number of confirmations.
/// * [`ConfirmationType::Both`] resolves on the hash and hands back the
///   confirmation as a separate future the caller may or may not await.
/// * [`ConfirmationType::Simulate`] only estimates gas, nothing is submitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Deserialize)]
pub enum ConfirmationType {
    Hash,
    #[default]
    Confirmed,
    Both,
    Simulate,
}

impl ConfirmationType {
    pub(crate) fn awaits_hash(&self) -> bool {
        matches!(self, ConfirmationType::Hash | ConfirmationType::Both)
    }

    pub(crate) fn awaits_receipt(&self) -> bool {
        matches!(self, ConfirmationType::Confirmed | ConfirmationType::Both)
    }
}

impl TryFrom<u8> for ConfirmationType {
    type Error = DexError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ConfirmationType::Hash),
            1 => Ok(ConfirmationType::Confirmed),
            2 => Ok(ConfirmationType::Both),
            3 => Ok(ConfirmationType::Simulate),
            _ => Err(DexError::InvalidArgument(format!(
                "invalid confirmation type: {value}"
            ))),
        }
    }
}

impl FromStr for ConfirmationType {
    type Err = DexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(ConfirmationType::Hash),
            "confirmed" => Ok(ConfirmationType::Confirmed),
            "both" => Ok(ConfirmationType::Both),
            "simulate" => Ok(ConfirmationType::Simulate),
            _ => Err(DexError::InvalidArgument(format!(
                "invalid confirmation type: {s}"
            ))),
        }
    }
}

/// Options of a state-changing submission.
///
/// Unset fields fall back to the defaults the [`crate::contracts::Contracts`]
/// instance was created with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendOptions {
    pub from: Option<Address>,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub value: Option<U256>,
    pub nonce: Option<u64>,
    /// Resolve on the N-th confirmation instead of the receipt.
    pub confirmations: Option<u64>,
    pub confirmation_type: Option<ConfirmationType>,
    /// Applied to the gas estimate when no explicit `gas` is set.
    pub gas_multiplier: Option<f64>,
}

impl SendOptions {
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = Some(confirmations);
        self
    }

    pub fn confirmation_type(mut self, confirmation_type: ConfirmationType) -> Self {
        self.confirmation_type = Some(confirmation_type);
        self
    }

    pub fn gas_multiplier(mut self, gas_multiplier: f64) -> Self {
        self.gas_multiplier = Some(gas_multiplier);
        self
    }

    /// Fields set on `self` win over `defaults`.
    pub fn or(self, defaults: &SendOptions) -> Self {
        Self {
            from: self.from.or(defaults.from),
            gas: self.gas.or(defaults.gas),
            gas_price: self.gas_price.or(defaults.gas_price),
            value: self.value.or(defaults.value),
            nonce: self.nonce.or(defaults.nonce),
            confirmations: self.confirmations.or(defaults.confirmations),
            confirmation_type: self.confirmation_type.or(defaults.confirmation_type),
            gas_multiplier: self.gas_multiplier.or(defaults.gas_multiplier),
        }
    }
}

/// Options of a read-only call.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    pub from: Option<Address>,
    pub block: Option<BlockId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_type_parsing() {
        assert_eq!("Both".parse::<ConfirmationType>().unwrap(), ConfirmationType::Both);
        assert_eq!(ConfirmationType::try_from(3).unwrap(), ConfirmationType::Simulate);
        assert!(matches!(
            "eventually".parse::<ConfirmationType>(),
            Err(DexError::InvalidArgument(_))
        ));
        assert!(matches!(
            ConfirmationType::try_from(4),
            Err(DexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_send_options_merge() {
        let defaults = SendOptions::default()
            .gas_multiplier(1.5)
            .confirmation_type(ConfirmationType::Hash)
            .from(Address::repeat_byte(1));
        let merged = SendOptions::default()
            .confirmation_type(ConfirmationType::Both)
            .or(&defaults);
        assert_eq!(merged.confirmation_type, Some(ConfirmationType::Both));
        assert_eq!(merged.gas_multiplier, Some(1.5));
        assert_eq!(merged.from, Some(Address::repeat_byte(1)));
        assert_eq!(merged.gas, None);
    }
}
