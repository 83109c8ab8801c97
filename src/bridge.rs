//! Signed transfers between the perpetual and a lending protocol account,
//! executed by the bridge proxy.

use alloy::primitives::B256;
use serde_json::{Value, json};

use crate::{
    Chain, bytes,
    eip712::{self, Domain, TypeSchema},
    error::DexError,
    signature::{TypedSignature, hash_has_valid_signature},
    signing::{SigningBackend, SigningMethod, sign_with},
    types::{SignedTransfer, Transfer},
};

pub const DOMAIN_NAME: &str = "P1SoloBridgeProxy";
pub const DOMAIN_VERSION: &str = "1.0";

pub const TRANSFER_SCHEMA: TypeSchema = TypeSchema {
    name: "Transfer",
    members: &[
        ("address", "account"),
        ("address", "perpetual"),
        ("uint256", "soloAccountNumber"),
        ("uint256", "soloMarketId"),
        ("uint256", "amount"),
        ("bytes32", "options"),
    ],
};

#[derive(Clone, Debug)]
pub struct BridgeTransfers {
    domain: Domain,
}

impl BridgeTransfers {
    pub fn new(chain: &Chain) -> Self {
        Self {
            domain: Domain::new(
                DOMAIN_NAME,
                DOMAIN_VERSION,
                chain.chain_id(),
                chain.bridge_proxy(),
            ),
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn transfer_hash(&self, transfer: &Transfer) -> B256 {
        let struct_hash = eip712::struct_hash(
            &TRANSFER_SCHEMA,
            &[
                bytes::address_to_bytes32(transfer.account),
                bytes::address_to_bytes32(transfer.perpetual),
                bytes::u256_to_bytes32(transfer.solo_account_number),
                bytes::u256_to_bytes32(transfer.solo_market_id),
                bytes::u256_to_bytes32(transfer.amount),
                transfer.options(),
            ],
        );
        eip712::signable_hash(self.domain.hash(), struct_hash)
    }

    pub fn transfer_typed_data(&self, transfer: &Transfer) -> Value {
        eip712::typed_data_json(
            &self.domain,
            &TRANSFER_SCHEMA,
            json!({
                "account": transfer.account.to_string(),
                "perpetual": transfer.perpetual.to_string(),
                "soloAccountNumber": transfer.solo_account_number.to_string(),
                "soloMarketId": transfer.solo_market_id.to_string(),
                "amount": transfer.amount.to_string(),
                "options": transfer.options().to_string(),
            }),
        )
    }

    /// Signs the transfer as its `account`.
    pub async fn sign_transfer<S: SigningBackend>(
        &self,
        backend: &S,
        transfer: &Transfer,
        method: SigningMethod,
    ) -> Result<TypedSignature, DexError> {
        sign_with(
            backend,
            method,
            transfer.account,
            self.transfer_hash(transfer),
            || self.transfer_typed_data(transfer),
        )
        .await
    }

    pub async fn signed_transfer<S: SigningBackend>(
        &self,
        backend: &S,
        transfer: Transfer,
        method: SigningMethod,
    ) -> Result<SignedTransfer, DexError> {
        let typed_signature = self.sign_transfer(backend, &transfer, method).await?;
        Ok(transfer.with_signature(typed_signature))
    }

    pub fn transfer_has_valid_signature(&self, transfer: &SignedTransfer) -> bool {
        hash_has_valid_signature(
            self.transfer_hash(transfer),
            transfer.typed_signature().as_bytes(),
            transfer.account,
        )
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{Address, U256},
        sol_types::{SolStruct, eip712_domain},
    };

    use super::*;
    use crate::{abi::messages, testing, types::TransferMode};

    fn transfer() -> Transfer {
        Transfer {
            account: Address::repeat_byte(0xaa),
            perpetual: testing::test_chain().perpetual(),
            solo_account_number: U256::from(3),
            solo_market_id: U256::from(2),
            amount: U256::from(10u64).pow(U256::from(9)),
            transfer_mode: TransferMode::SomeToPerpetual,
            expiration: U256::from(1_900_000_000u64),
            salt: U256::from(77),
        }
    }

    #[test]
    fn test_transfer_hash_matches_sol_types() {
        let chain = testing::test_chain();
        let bridge = BridgeTransfers::new(&chain);
        let transfer = transfer();
        let domain = eip712_domain! {
            name: "P1SoloBridgeProxy",
            version: "1.0",
            chain_id: chain.chain_id(),
            verifying_contract: chain.bridge_proxy(),
        };
        let sol = messages::Transfer {
            account: transfer.account,
            perpetual: transfer.perpetual,
            soloAccountNumber: transfer.solo_account_number,
            soloMarketId: transfer.solo_market_id,
            amount: transfer.amount,
            options: transfer.options(),
        };
        assert_eq!(
            bridge.transfer_hash(&transfer),
            sol.eip712_signing_hash(&domain)
        );
    }

    #[test]
    fn test_transfer_mode_changes_hash() {
        let bridge = BridgeTransfers::new(&testing::test_chain());
        let to_solo = Transfer {
            transfer_mode: TransferMode::SomeToSolo,
            ..transfer()
        };
        assert_ne!(bridge.transfer_hash(&transfer()), bridge.transfer_hash(&to_solo));
    }

    #[test]
    fn test_transfer_typed_data() {
        let bridge = BridgeTransfers::new(&testing::test_chain());
        let doc = bridge.transfer_typed_data(&transfer());
        assert_eq!(doc["primaryType"], "Transfer");
        assert_eq!(doc["domain"]["name"], "P1SoloBridgeProxy");
        assert_eq!(doc["message"]["soloMarketId"], "2");
    }
}
