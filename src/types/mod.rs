mod order;
mod request;
mod transfer;

use alloy::primitives::{Address, Bytes, U256};

pub use order::{Order, SignedOrder, flags};
pub use request::{CallOptions, ConfirmationType, SendOptions};
pub use transfer::{SignedTransfer, Transfer, TransferMode};

use crate::abi::perpetual::PerpetualV1;

/// One leg of a batched `trade` call. Accounts are referenced by their index
/// in the batch account list to keep the calldata small.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeInstruction {
    pub maker_index: usize,
    pub taker_index: usize,
    /// Trader module contract interpreting `data`.
    pub trader: Address,
    pub data: Bytes,
}

impl From<&TradeInstruction> for PerpetualV1::TradeArg {
    fn from(value: &TradeInstruction) -> Self {
        PerpetualV1::TradeArg {
            takerIndex: U256::from(value.taker_index),
            makerIndex: U256::from(value.maker_index),
            trader: value.trader,
            data: value.data.clone(),
        }
    }
}
