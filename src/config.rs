//! Client configuration from the environment.
//!
//! Variables carry the `PERPETUAL_` prefix, e.g. `PERPETUAL_CHAIN_ID`.
//! A `.env` file is loaded first when present.

use alloy::primitives::{Address, hex::FromHexError};
use url::Url;

use crate::{
    Chain,
    contracts::DEFAULT_GAS_MULTIPLIER,
    orders::DEFAULT_DOMAIN_NAME,
    types::{ConfirmationType, SendOptions},
};

pub const ENV_PREFIX: &str = "PERPETUAL_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid {field} address: {source}")]
    Address {
        field: &'static str,
        source: FromHexError,
    },

    #[error("invalid node RPC URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid confirmation type: {0}")]
    ConfirmationType(String),

    #[error("gas multiplier must be positive, got {0}")]
    GasMultiplier(f64),
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct ClientConfig {
    pub chain_id: u64,
    pub perpetual_address: String,
    pub orders_address: String,
    pub liquidation_address: String,
    pub deleveraging_address: String,
    pub bridge_proxy_address: String,
    pub node_rpc_url: String,
    pub gas_multiplier: Option<f64>,
    pub confirmations: Option<u64>,
    /// One of `hash`, `confirmed`, `both`, `simulate`.
    pub confirmation_type: Option<String>,
    #[serde(default)]
    pub track_gas: bool,
    pub orders_domain_name: Option<String>,
}

impl ClientConfig {
    /// Loads `.env` if present, then reads the prefixed variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(envy::prefixed(ENV_PREFIX).from_env()?)
    }

    pub fn chain(&self) -> Result<Chain, ConfigError> {
        Ok(Chain::custom(
            self.chain_id,
            parse_address("perpetual", &self.perpetual_address)?,
            parse_address("orders", &self.orders_address)?,
            parse_address("liquidation", &self.liquidation_address)?,
            parse_address("deleveraging", &self.deleveraging_address)?,
            parse_address("bridge proxy", &self.bridge_proxy_address)?,
        ))
    }

    pub fn node_rpc_url(&self) -> Result<Url, ConfigError> {
        Ok(self.node_rpc_url.parse()?)
    }

    /// Send options applied to every submission unless overridden.
    pub fn send_defaults(&self) -> Result<SendOptions, ConfigError> {
        let gas_multiplier = self.gas_multiplier.unwrap_or(DEFAULT_GAS_MULTIPLIER);
        if gas_multiplier <= 0.0 || !gas_multiplier.is_finite() {
            return Err(ConfigError::GasMultiplier(gas_multiplier));
        }
        let confirmation_type = match &self.confirmation_type {
            Some(value) => value
                .parse::<ConfirmationType>()
                .map_err(|_| ConfigError::ConfirmationType(value.clone()))?,
            None => ConfirmationType::default(),
        };
        Ok(SendOptions {
            confirmations: self.confirmations,
            confirmation_type: Some(confirmation_type),
            gas_multiplier: Some(gas_multiplier),
            ..SendOptions::default()
        })
    }

    pub fn orders_domain_name(&self) -> &str {
        self.orders_domain_name
            .as_deref()
            .unwrap_or(DEFAULT_DOMAIN_NAME)
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    value
        .parse()
        .map_err(|source| ConfigError::Address { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(extra: &[(&str, &str)]) -> Vec<(String, String)> {
        [
            ("PERPETUAL_CHAIN_ID", "1337"),
            (
                "PERPETUAL_PERPETUAL_ADDRESS",
                "0x06012c8cf97bead5deae237070f9587f8e7a266d",
            ),
            (
                "PERPETUAL_ORDERS_ADDRESS",
                "0x22012c8cf97bead5deae237070f9587f8e7a266d",
            ),
            (
                "PERPETUAL_LIQUIDATION_ADDRESS",
                "0x32012c8cf97bead5deae237070f9587f8e7a266d",
            ),
            (
                "PERPETUAL_DELEVERAGING_ADDRESS",
                "0x42012c8cf97bead5deae237070f9587f8e7a266d",
            ),
            (
                "PERPETUAL_BRIDGE_PROXY_ADDRESS",
                "0x52012c8cf97bead5deae237070f9587f8e7a266d",
            ),
            ("PERPETUAL_NODE_RPC_URL", "http://127.0.0.1:8545"),
        ]
        .iter()
        .filter(|(key, _)| !extra.iter().any(|(k, _)| k == key))
        .chain(extra)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn load(extra: &[(&str, &str)]) -> ClientConfig {
        envy::prefixed(ENV_PREFIX).from_iter(vars(extra)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);
        let chain = config.chain().unwrap();
        assert_eq!(chain.chain_id(), 1337);
        assert_eq!(
            chain.orders(),
            "0x22012c8cf97bead5deae237070f9587f8e7a266d"
                .parse::<Address>()
                .unwrap()
        );
        assert!(!config.track_gas);
        assert_eq!(config.orders_domain_name(), "P1Orders");
        assert_eq!(config.node_rpc_url().unwrap().port(), Some(8545));

        let defaults = config.send_defaults().unwrap();
        assert_eq!(defaults.gas_multiplier, Some(1.5));
        assert_eq!(defaults.confirmation_type, Some(ConfirmationType::Confirmed));
        assert_eq!(defaults.confirmations, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PERPETUAL_CONFIRMATION_TYPE", "both"),
            ("PERPETUAL_CONFIRMATIONS", "3"),
            ("PERPETUAL_GAS_MULTIPLIER", "2"),
            ("PERPETUAL_TRACK_GAS", "true"),
        ]);
        let defaults = config.send_defaults().unwrap();
        assert_eq!(defaults.confirmation_type, Some(ConfirmationType::Both));
        assert_eq!(defaults.confirmations, Some(3));
        assert_eq!(defaults.gas_multiplier, Some(2.0));
        assert!(config.track_gas);
    }

    #[test]
    fn test_invalid_values() {
        let config = load(&[("PERPETUAL_CONFIRMATION_TYPE", "eventually")]);
        assert!(matches!(
            config.send_defaults(),
            Err(ConfigError::ConfirmationType(_))
        ));

        let config = load(&[("PERPETUAL_ORDERS_ADDRESS", "0x1234")]);
        assert!(matches!(
            config.chain(),
            Err(ConfigError::Address { field: "orders", .. })
        ));

        let config = load(&[("PERPETUAL_NODE_RPC_URL", "not a url")]);
        assert!(config.node_rpc_url().is_err());
    }
}
