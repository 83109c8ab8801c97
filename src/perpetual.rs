use crate::{
    Chain,
    bridge::BridgeTransfers,
    chain::ChainClient,
    contracts::Contracts,
    gas::GasLedger,
    orders::Orders,
    trade::{Trade, TradeOperation},
};

/// Client of one perpetual deployment.
#[derive(Debug)]
pub struct Perpetual<C> {
    contracts: Contracts<C>,
    orders: Orders,
    bridge: BridgeTransfers,
    trade: Trade<C>,
}

impl<C: ChainClient> Perpetual<C> {
    pub fn new(client: C, chain: Chain) -> Self {
        Self::from_contracts(Contracts::new(client, chain))
    }

    /// Uses pre-configured contracts, see [`Contracts::with_defaults`].
    pub fn from_contracts(contracts: Contracts<C>) -> Self {
        let orders = Orders::new(contracts.chain());
        Self::with_orders(contracts, orders)
    }

    /// Uses an order codec with a non-default domain.
    pub fn with_orders(contracts: Contracts<C>, orders: Orders) -> Self {
        let bridge = BridgeTransfers::new(contracts.chain());
        let trade = Trade::new(contracts.clone(), orders.clone());
        Self {
            contracts,
            orders,
            bridge,
            trade,
        }
    }

    pub fn chain(&self) -> &Chain {
        self.contracts.chain()
    }

    pub fn contracts(&self) -> &Contracts<C> {
        &self.contracts
    }

    pub fn orders(&self) -> &Orders {
        &self.orders
    }

    pub fn bridge(&self) -> &BridgeTransfers {
        &self.bridge
    }

    pub fn trade(&self) -> &Trade<C> {
        &self.trade
    }

    pub fn gas_ledger(&self) -> &GasLedger {
        self.contracts.ledger()
    }

    /// Starts an empty trade batch.
    pub fn initiate_trade(&self) -> TradeOperation<C> {
        self.trade.initiate()
    }
}
