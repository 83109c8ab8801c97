#[allow(clippy::too_many_arguments)]
pub mod perpetual {
    alloy::sol!(
        /// Settlement entry point of the perpetual.
        #[derive(Debug, PartialEq, Eq)]
        interface PerpetualV1 {
            struct TradeArg {
                uint256 takerIndex;
                uint256 makerIndex;
                address trader;
                bytes data;
            }

            function trade(address[] accounts, TradeArg[] trades) external;
        }
    );
}

/// Solidity shapes of the signed messages, used to cross-check the
/// word-by-word hashes built in [`crate::orders`] and [`crate::bridge`].
#[allow(clippy::too_many_arguments)]
pub mod messages {
    alloy::sol!(
        #[derive(Debug)]
        struct Order {
            bytes32 flags;
            uint256 amount;
            uint256 limitPrice;
            uint256 triggerPrice;
            uint256 limitFee;
            address maker;
            address taker;
            uint256 expiration;
        }

        #[derive(Debug)]
        struct CancelLimitOrder {
            string action;
            bytes32[] orderHashes;
        }

        #[derive(Debug)]
        struct Transfer {
            address account;
            address perpetual;
            uint256 soloAccountNumber;
            uint256 soloMarketId;
            uint256 amount;
            bytes32 options;
        }
    );
}
