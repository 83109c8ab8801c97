use alloy::primitives::{Address, B256, U256};

use crate::{
    num::{Fee, Price},
    signature::TypedSignature,
};

/// Bits of the lowest nibble of the order flags word.
pub mod flags {
    pub const IS_BUY: u8 = 1;
    pub const IS_DECREASE_ONLY: u8 = 2;
    pub const IS_NEGATIVE_LIMIT_FEE: u8 = 4;
}

/// Intent to trade, signed by the maker off-chain and filled on-chain
/// by a taker through the orders trader module.
///
/// * `amount` is in base units of the position token.
/// * `trigger_price` of zero means the order has no trigger.
/// * `expiration` is a unix timestamp, zero means never.
/// * `salt` only makes otherwise identical orders distinct. Only its
///   lowest 252 bits are encoded.
#[derive(Clone, derive_more::Debug, PartialEq)]
pub struct Order {
    pub is_buy: bool,
    pub is_decrease_only: bool,
    #[debug("{amount}")]
    pub amount: U256,
    #[debug("{limit_price}")]
    pub limit_price: Price,
    #[debug("{trigger_price}")]
    pub trigger_price: Price,
    #[debug("{limit_fee}")]
    pub limit_fee: Fee,
    pub maker: Address,
    pub taker: Address,
    #[debug("{expiration}")]
    pub expiration: U256,
    #[debug("{salt}")]
    pub salt: U256,
}

impl Order {
    /// The `bytes32 flags` word: salt in the upper 63 nibbles, boolean flags
    /// in the lowest one.
    pub fn flags(&self) -> B256 {
        let mut bits = 0u8;
        if self.limit_fee.is_negative() {
            bits |= flags::IS_NEGATIVE_LIMIT_FEE;
        }
        if self.is_decrease_only {
            bits |= flags::IS_DECREASE_ONLY;
        }
        if self.is_buy {
            bits |= flags::IS_BUY;
        }
        B256::from((self.salt << 4usize) | U256::from(bits))
    }

    /// Attaches a signature. The signature covers the exact field values,
    /// a [`SignedOrder`] exposes them read-only.
    pub fn with_signature(self, typed_signature: TypedSignature) -> SignedOrder {
        SignedOrder {
            order: self,
            typed_signature,
        }
    }
}

/// Order with the maker's typed signature.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedOrder {
    order: Order,
    typed_signature: TypedSignature,
}

impl SignedOrder {
    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn typed_signature(&self) -> &TypedSignature {
        &self.typed_signature
    }

    pub fn into_parts(self) -> (Order, TypedSignature) {
        (self.order, self.typed_signature)
    }
}

impl std::ops::Deref for SignedOrder {
    type Target = Order;

    fn deref(&self) -> &Self::Target {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::b256;
    use fastnum::{dec128, udec128};

    use super::*;

    fn order() -> Order {
        Order {
            is_buy: false,
            is_decrease_only: false,
            amount: U256::from(10u64).pow(U256::from(18)),
            limit_price: Price::new(udec128!(987.65432)).unwrap(),
            trigger_price: Price::ZERO,
            limit_fee: Fee::from_bips(dec128!(20)).unwrap(),
            maker: Address::ZERO,
            taker: Address::ZERO,
            expiration: U256::ZERO,
            salt: U256::from(425),
        }
    }

    #[test]
    fn test_flags_word() {
        assert_eq!(
            order().flags(),
            b256!("0x0000000000000000000000000000000000000000000000000000000000001a90")
        );

        let full = Order {
            is_buy: true,
            is_decrease_only: true,
            limit_fee: Fee::from_bips(dec128!(-20)).unwrap(),
            ..order()
        };
        assert_eq!(
            full.flags(),
            b256!("0x0000000000000000000000000000000000000000000000000000000000001a97")
        );
    }

    #[test]
    fn test_flags_drop_top_salt_nibble() {
        let o = Order {
            salt: U256::MAX,
            is_buy: true,
            ..order()
        };
        assert_eq!(
            o.flags(),
            b256!("0xfffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff1")
        );
    }
}
