//! Batched settlement through the perpetual `trade` entry point.
//!
//! Accounts are passed once, sorted and unique, and every trade arg refers to
//! its maker and taker by index into that list.

use std::collections::BTreeSet;

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use itertools::Itertools;
use tracing::info;

use crate::{
    abi::perpetual::PerpetualV1,
    bytes,
    chain::ChainClient,
    contracts::{ContractCall, Contracts, TxResult},
    error::DexError,
    num::{Fee, Price},
    orders::Orders,
    types::{ConfirmationType, SendOptions, SignedOrder, TradeInstruction},
};

/// `amount ‖ isBuy ‖ allOrNothing`, the trade data of the liquidation trader.
pub fn liquidate_trade_data(amount: U256, is_buy: bool, all_or_nothing: bool) -> Bytes {
    bytes::combine([
        bytes::u256_to_bytes32(amount),
        bytes::bool_to_bytes32(is_buy),
        bytes::bool_to_bytes32(all_or_nothing),
    ])
}

/// Same layout as [`liquidate_trade_data`], for the deleveraging trader.
pub fn deleverage_trade_data(amount: U256, is_buy: bool, all_or_nothing: bool) -> Bytes {
    liquidate_trade_data(amount, is_buy, all_or_nothing)
}

/// Calldata of `trade(accounts, trades)`.
pub fn trade_calldata(accounts: &[Address], args: &[TradeInstruction]) -> Bytes {
    PerpetualV1::tradeCall {
        accounts: accounts.to_vec(),
        trades: args.iter().map(PerpetualV1::TradeArg::from).collect(),
    }
    .abi_encode()
    .into()
}

#[derive(Clone, Debug)]
struct TradeLeg {
    maker: Address,
    taker: Address,
    trader: Address,
    data: Bytes,
}

/// Entry point for trades: direct batches and [`TradeOperation`]s.
#[derive(Debug)]
pub struct Trade<C> {
    contracts: Contracts<C>,
    orders: Orders,
}

impl<C: ChainClient> Trade<C> {
    pub fn new(contracts: Contracts<C>, orders: Orders) -> Self {
        Self { contracts, orders }
    }

    /// Starts an empty batch.
    pub fn initiate(&self) -> TradeOperation<C> {
        TradeOperation::new(self.contracts.clone(), self.orders.clone())
    }

    /// Submits a prepared batch. `accounts` must be strictly ascending and
    /// every index must point into it.
    pub async fn trade(
        &self,
        accounts: &[Address],
        args: &[TradeInstruction],
        options: SendOptions,
    ) -> Result<TxResult, DexError> {
        if !accounts.iter().tuple_windows().all(|(a, b)| a < b) {
            return Err(DexError::InvalidArgument(format!(
                "accounts should be unique and sorted, got: {accounts:?}"
            )));
        }
        for arg in args {
            if arg.maker_index >= accounts.len() {
                return Err(DexError::InvalidArgument(format!(
                    "trade arg maker index out of bounds: {}",
                    arg.maker_index
                )));
            }
            if arg.taker_index >= accounts.len() {
                return Err(DexError::InvalidArgument(format!(
                    "trade arg taker index out of bounds: {}",
                    arg.taker_index
                )));
            }
        }
        let call = ContractCall::new(
            "trade",
            self.contracts.chain().perpetual(),
            trade_calldata(accounts, args),
        );
        self.contracts.send(call, options).await
    }
}

/// Batch of trades committed in one `trade` transaction.
///
/// Open until a commit succeeds; a failed commit reopens it.
#[derive(Debug)]
pub struct TradeOperation<C> {
    contracts: Contracts<C>,
    orders: Orders,
    trades: Vec<TradeLeg>,
    committed: bool,
}

impl<C: ChainClient> TradeOperation<C> {
    pub fn new(contracts: Contracts<C>, orders: Orders) -> Self {
        Self {
            contracts,
            orders,
            trades: Vec::new(),
            committed: false,
        }
    }

    /// Fills a signed order between its maker and taker through the orders
    /// trader.
    pub fn fill_signed_order(
        &mut self,
        order: &SignedOrder,
        amount: U256,
        price: Price,
        fee: Fee,
    ) -> Result<&mut Self, DexError> {
        let data = Orders::fill_to_trade_data(order, amount, price, fee);
        let trader = self.orders.address();
        self.add_trade_arg(order.maker, order.taker, trader, data)
    }

    pub fn liquidate(
        &mut self,
        maker: Address,
        taker: Address,
        amount: U256,
        is_buy: bool,
        all_or_nothing: bool,
    ) -> Result<&mut Self, DexError> {
        let trader = self.contracts.chain().liquidation();
        self.add_trade_arg(
            maker,
            taker,
            trader,
            liquidate_trade_data(amount, is_buy, all_or_nothing),
        )
    }

    pub fn deleverage(
        &mut self,
        maker: Address,
        taker: Address,
        amount: U256,
        is_buy: bool,
        all_or_nothing: bool,
    ) -> Result<&mut Self, DexError> {
        let trader = self.contracts.chain().deleveraging();
        self.add_trade_arg(
            maker,
            taker,
            trader,
            deleverage_trade_data(amount, is_buy, all_or_nothing),
        )
    }

    /// Appends a trade with arbitrary trader and trade data.
    pub fn add_trade_arg(
        &mut self,
        maker: Address,
        taker: Address,
        trader: Address,
        data: Bytes,
    ) -> Result<&mut Self, DexError> {
        if self.committed {
            return Err(DexError::AlreadyCommitted);
        }
        self.trades.push(TradeLeg {
            maker,
            taker,
            trader,
            data,
        });
        Ok(self)
    }

    /// Makers and takers of all trades, sorted and unique.
    pub fn accounts(&self) -> Vec<Address> {
        self.trades
            .iter()
            .flat_map(|t| [t.maker, t.taker])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Trades with maker and taker resolved to indices into [`Self::accounts`].
    pub fn trade_args(&self) -> Vec<TradeInstruction> {
        let accounts = self.accounts();
        let index_of = |account: &Address| accounts.binary_search(account).unwrap_or_default();
        self.trades
            .iter()
            .map(|t| TradeInstruction {
                maker_index: index_of(&t.maker),
                taker_index: index_of(&t.taker),
                trader: t.trader,
                data: t.data.clone(),
            })
            .collect()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Submits all trades as one transaction.
    ///
    /// A simulation leaves the batch open.
    pub async fn commit(&mut self, options: SendOptions) -> Result<TxResult, DexError> {
        if self.committed {
            return Err(DexError::AlreadyCommitted);
        }
        if self.trades.is_empty() {
            return Err(DexError::EmptyBatch);
        }
        let confirmation_type = options
            .confirmation_type
            .or(self.contracts.defaults().confirmation_type)
            .unwrap_or_default();
        if confirmation_type != ConfirmationType::Simulate {
            self.committed = true;
        }

        let accounts = self.accounts();
        let args = self.trade_args();
        info!(
            accounts = accounts.len(),
            trades = args.len(),
            ?confirmation_type,
            "committing trade operation"
        );
        let call = ContractCall::new(
            "trade",
            self.contracts.chain().perpetual(),
            trade_calldata(&accounts, &args),
        );
        let result = self.contracts.send(call, options).await;
        if result.is_err() {
            self.committed = false;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::b256;

    use super::*;

    #[test]
    fn test_liquidate_trade_data() {
        let data = liquidate_trade_data(U256::from(0x10), true, false);
        assert_eq!(data.len(), 96);
        assert_eq!(
            &data[..32],
            b256!("0x0000000000000000000000000000000000000000000000000000000000000010").as_slice()
        );
        assert_eq!(data[63], 1);
        assert_eq!(data[95], 0);
        assert_eq!(deleverage_trade_data(U256::from(0x10), true, false), data);
    }

    #[test]
    fn test_trade_calldata_decodes() {
        let accounts = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let args = vec![TradeInstruction {
            maker_index: 1,
            taker_index: 0,
            trader: Address::repeat_byte(9),
            data: Bytes::from(vec![0xde, 0xad]),
        }];
        let data = trade_calldata(&accounts, &args);
        assert_eq!(&data[..4], PerpetualV1::tradeCall::SELECTOR.as_slice());

        let decoded = PerpetualV1::tradeCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.accounts, accounts);
        assert_eq!(decoded.trades[0].makerIndex, U256::from(1));
        assert_eq!(decoded.trades[0].takerIndex, U256::ZERO);
        assert_eq!(decoded.trades[0].data, Bytes::from(vec![0xde, 0xad]));
    }
}
