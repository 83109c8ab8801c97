//! Order hashing, signing and encoding for the orders trader module.

use alloy::primitives::{Address, B256, Bytes, I256, U256};
use serde_json::{Value, json};

use crate::{
    Chain, bytes,
    eip712::{self, Domain, TypeSchema},
    error::DexError,
    num::{Fee, Price},
    signature::{TYPED_SIGNATURE_LEN, TypedSignature, hash_has_valid_signature},
    signing::{SigningBackend, SigningMethod, sign_with},
    types::{Order, SignedOrder},
};

pub const DEFAULT_DOMAIN_NAME: &str = "P1Orders";
pub const DOMAIN_VERSION: &str = "1.0";
pub const CANCEL_ACTION: &str = "Cancel Orders";

pub const ORDER_SCHEMA: TypeSchema = TypeSchema {
    name: "Order",
    members: &[
        ("bytes32", "flags"),
        ("uint256", "amount"),
        ("uint256", "limitPrice"),
        ("uint256", "triggerPrice"),
        ("uint256", "limitFee"),
        ("address", "maker"),
        ("address", "taker"),
        ("uint256", "expiration"),
    ],
};

pub const CANCEL_ORDER_SCHEMA: TypeSchema = TypeSchema {
    name: "CancelLimitOrder",
    members: &[("string", "action"), ("bytes32[]", "orderHashes")],
};

/// Trailing padding after the typed signature in fill trade data, keeps the
/// payload word-aligned.
const SIGNATURE_PADDING: usize = 32 * 3 - TYPED_SIGNATURE_LEN;

/// Effect of a fill on the maker's balances, in base units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub margin_delta: I256,
    pub position_delta: I256,
}

/// Order codec bound to one orders contract.
#[derive(Clone, Debug)]
pub struct Orders {
    domain: Domain,
}

impl Orders {
    pub fn new(chain: &Chain) -> Self {
        Self::with_domain_name(chain, DEFAULT_DOMAIN_NAME)
    }

    pub fn with_domain_name(chain: &Chain, name: &str) -> Self {
        Self {
            domain: Domain::new(name, DOMAIN_VERSION, chain.chain_id(), chain.orders()),
        }
    }

    pub fn address(&self) -> Address {
        self.domain.verifying_contract
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn domain_hash(&self) -> B256 {
        self.domain.hash()
    }

    /// Fields in the on-chain struct order, each encoded as one word.
    pub fn order_fields(order: &Order) -> [B256; 8] {
        [
            order.flags(),
            bytes::u256_to_bytes32(order.amount),
            bytes::u256_to_bytes32(order.limit_price.to_solidity()),
            bytes::u256_to_bytes32(order.trigger_price.to_solidity()),
            bytes::u256_to_bytes32(order.limit_fee.to_solidity()),
            bytes::address_to_bytes32(order.maker),
            bytes::address_to_bytes32(order.taker),
            bytes::u256_to_bytes32(order.expiration),
        ]
    }

    /// Signable EIP-712 hash of the order.
    pub fn order_hash(&self, order: &Order) -> B256 {
        let struct_hash = eip712::struct_hash(&ORDER_SCHEMA, &Self::order_fields(order));
        eip712::signable_hash(self.domain_hash(), struct_hash)
    }

    /// Signable hash of the message cancelling the order with `order_hash`.
    pub fn cancel_order_hash(&self, order_hash: B256) -> B256 {
        let struct_hash = eip712::struct_hash(
            &CANCEL_ORDER_SCHEMA,
            &[
                bytes::hash_string(CANCEL_ACTION),
                bytes::hash_bytes(order_hash.as_slice()),
            ],
        );
        eip712::signable_hash(self.domain_hash(), struct_hash)
    }

    /// ABI encoding of the order struct, eight static words.
    pub fn order_to_bytes(order: &Order) -> Bytes {
        bytes::combine(Self::order_fields(order))
    }

    /// Trade data consumed by the orders trader module:
    /// `order ‖ amount ‖ price ‖ fee ‖ isNegativeFee ‖ typedSignature ‖ padding`.
    pub fn fill_to_trade_data(
        order: &SignedOrder,
        amount: U256,
        price: Price,
        fee: Fee,
    ) -> Bytes {
        bytes::combine([
            &Self::order_to_bytes(order)[..],
            bytes::u256_to_bytes32(amount).as_slice(),
            bytes::u256_to_bytes32(price.to_solidity()).as_slice(),
            bytes::u256_to_bytes32(fee.to_solidity()).as_slice(),
            bytes::bool_to_bytes32(fee.is_negative()).as_slice(),
            order.typed_signature().as_bytes().as_slice(),
            &[0u8; SIGNATURE_PADDING][..],
        ])
    }

    /// Message of the order as the typed-data JSON document expects it.
    pub fn order_message(order: &Order) -> Value {
        json!({
            "flags": order.flags().to_string(),
            "amount": order.amount.to_string(),
            "limitPrice": order.limit_price.to_solidity().to_string(),
            "triggerPrice": order.trigger_price.to_solidity().to_string(),
            "limitFee": order.limit_fee.to_solidity().to_string(),
            "maker": order.maker.to_string(),
            "taker": order.taker.to_string(),
            "expiration": order.expiration.to_string(),
        })
    }

    pub fn order_typed_data(&self, order: &Order) -> Value {
        eip712::typed_data_json(&self.domain, &ORDER_SCHEMA, Self::order_message(order))
    }

    pub fn cancel_order_typed_data(&self, order_hash: B256) -> Value {
        eip712::typed_data_json(
            &self.domain,
            &CANCEL_ORDER_SCHEMA,
            json!({
                "action": CANCEL_ACTION,
                "orderHashes": [order_hash.to_string()],
            }),
        )
    }

    /// Signs the order as its maker.
    pub async fn sign_order<S: SigningBackend>(
        &self,
        backend: &S,
        order: &Order,
        method: SigningMethod,
    ) -> Result<TypedSignature, DexError> {
        sign_with(backend, method, order.maker, self.order_hash(order), || {
            self.order_typed_data(order)
        })
        .await
    }

    pub async fn signed_order<S: SigningBackend>(
        &self,
        backend: &S,
        order: Order,
        method: SigningMethod,
    ) -> Result<SignedOrder, DexError> {
        let typed_signature = self.sign_order(backend, &order, method).await?;
        Ok(order.with_signature(typed_signature))
    }

    pub async fn sign_cancel_order<S: SigningBackend>(
        &self,
        backend: &S,
        order: &Order,
        method: SigningMethod,
    ) -> Result<TypedSignature, DexError> {
        self.sign_cancel_order_by_hash(backend, self.order_hash(order), order.maker, method)
            .await
    }

    /// Signs the cancel message of `order_hash` as `signer`.
    pub async fn sign_cancel_order_by_hash<S: SigningBackend>(
        &self,
        backend: &S,
        order_hash: B256,
        signer: Address,
        method: SigningMethod,
    ) -> Result<TypedSignature, DexError> {
        sign_with(
            backend,
            method,
            signer,
            self.cancel_order_hash(order_hash),
            || self.cancel_order_typed_data(order_hash),
        )
        .await
    }

    /// True if the order carries a valid signature of its maker.
    pub fn order_has_valid_signature(&self, order: &SignedOrder) -> bool {
        hash_has_valid_signature(
            self.order_hash(order),
            order.typed_signature().as_bytes(),
            order.maker,
        )
    }

    pub fn cancel_order_has_valid_signature(&self, order: &Order, typed_signature: &[u8]) -> bool {
        self.cancel_order_by_hash_has_valid_signature(
            self.order_hash(order),
            typed_signature,
            order.maker,
        )
    }

    pub fn cancel_order_by_hash_has_valid_signature(
        &self,
        order_hash: B256,
        typed_signature: &[u8],
        expected_signer: Address,
    ) -> bool {
        hash_has_valid_signature(
            self.cancel_order_hash(order_hash),
            typed_signature,
            expected_signer,
        )
    }
}

/// Maker balance changes after filling `amount` at `price` with `fee`.
///
/// The fee per position unit is truncated to 18 decimals and the margin
/// amount to an integer, both toward zero. Buying pays margin and gains
/// position, selling the reverse.
pub fn balance_updates_after_filling_order(
    amount: U256,
    price: Price,
    fee: Fee,
    is_buy: bool,
) -> Result<BalanceUpdate, DexError> {
    let overflow = || DexError::InvalidArgument("fill amount overflows".to_string());
    let one = I256::try_from(10u128.pow(18)).map_err(|_| overflow())?;

    let position = I256::try_from(amount).map_err(|_| overflow())?;
    let price = I256::try_from(price.to_solidity()).map_err(|_| overflow())?;
    let fee_per_position = fee
        .to_signed_solidity()
        .checked_mul(price)
        .ok_or_else(overflow)?
        / one;
    let margin_per_position = if is_buy {
        price + fee_per_position
    } else {
        price - fee_per_position
    };
    let margin = position
        .checked_mul(margin_per_position)
        .ok_or_else(overflow)?
        / one;

    Ok(if is_buy {
        BalanceUpdate {
            margin_delta: -margin,
            position_delta: position,
        }
    } else {
        BalanceUpdate {
            margin_delta: margin,
            position_delta: -position,
        }
    })
}

const MAKER_FEE: Fee = Fee::exact(fastnum::dec128!(-0.00025), 250_000_000_000_000);
const SMALL_TAKER_FEE: Fee = Fee::exact(fastnum::dec128!(0.005), 5_000_000_000_000_000);
const TAKER_FEE: Fee = Fee::exact(fastnum::dec128!(0.00075), 750_000_000_000_000);

/// Fee rate the exchange charges for an order of `amount` base units.
///
/// Makers get a 2.5 bips rebate. Takers pay 50 bips below `0.1e8` base units,
/// 7.5 bips otherwise.
pub fn fee_for_order(amount: U256, is_taker: bool) -> Fee {
    if !is_taker {
        return MAKER_FEE;
    }
    if amount < U256::from(10_000_000u64) {
        SMALL_TAKER_FEE
    } else {
        TAKER_FEE
    }
}
