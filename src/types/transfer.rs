use alloy::primitives::{Address, B256, U256};

use crate::signature::TypedSignature;

/// Direction of a bridge transfer between the perpetual and the lending
/// protocol account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransferMode {
    SomeToPerpetual = 0,
    SomeToSolo = 1,
    AllToPerpetual = 2,
}

/// Bridge transfer authorisation, signed by `account`.
#[derive(Clone, derive_more::Debug, PartialEq, Eq)]
pub struct Transfer {
    pub account: Address,
    pub perpetual: Address,
    #[debug("{solo_account_number}")]
    pub solo_account_number: U256,
    #[debug("{solo_market_id}")]
    pub solo_market_id: U256,
    #[debug("{amount}")]
    pub amount: U256,
    pub transfer_mode: TransferMode,
    #[debug("{expiration}")]
    pub expiration: U256,
    #[debug("{salt}")]
    pub salt: U256,
}

impl Transfer {
    /// `salt[16] ‖ expiration[15] ‖ mode[1]`, each truncated to its low bytes.
    pub fn options(&self) -> B256 {
        let salt = self.salt.to_be_bytes::<32>();
        let expiration = self.expiration.to_be_bytes::<32>();
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&salt[16..]);
        out[16..31].copy_from_slice(&expiration[17..]);
        out[31] = self.transfer_mode as u8;
        B256::from(out)
    }

    pub fn with_signature(self, typed_signature: TypedSignature) -> SignedTransfer {
        SignedTransfer {
            transfer: self,
            typed_signature,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransfer {
    transfer: Transfer,
    typed_signature: TypedSignature,
}

impl SignedTransfer {
    pub fn transfer(&self) -> &Transfer {
        &self.transfer
    }

    pub fn typed_signature(&self) -> &TypedSignature {
        &self.typed_signature
    }
}

impl std::ops::Deref for SignedTransfer {
    type Target = Transfer;

    fn deref(&self) -> &Self::Target {
        &self.transfer
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::b256;

    use super::*;

    #[test]
    fn test_options_packing() {
        let transfer = Transfer {
            account: Address::ZERO,
            perpetual: Address::ZERO,
            solo_account_number: U256::from(5),
            solo_market_id: U256::from(2),
            amount: U256::from(1),
            transfer_mode: TransferMode::SomeToSolo,
            expiration: U256::from(0x5f5e100),
            salt: U256::MAX,
        };
        assert_eq!(
            transfer.options(),
            b256!("0xffffffffffffffffffffffffffffffff000000000000000000000005f5e10001")
        );
    }
}
