//! Checkout configuration.
//!
//! Every address is optional at load time because each one only gates one of
//! the two payment paths. A path asks for its own view ([`CheckoutConfig::local_path`]
//! or [`CheckoutConfig::relayed_path`]) and fails with [`ConfigError::Missing`]
//! naming the environment variable that was not provided.

use crate::domain::amount::DEFAULT_DECIMALS;
use crate::domain::network::{Address, ChainSelector, NetworkId};
use crate::domain::outcome::PaymentPath;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

pub const ENV_SETTLEMENT_CONTRACT: &str = "SETTLEMENT_CONTRACT_ADDRESS";
pub const ENV_PAYMENT_TOKEN: &str = "PAYMENT_TOKEN_ADDRESS";
pub const ENV_DESTINATION_NETWORK: &str = "DESTINATION_NETWORK_IDENTITY";
pub const ENV_RELAY_CONTRACT: &str = "RELAY_CONTRACT_ADDRESS";
pub const ENV_RELAY_PAYMENT_TOKEN: &str = "RELAY_PAYMENT_TOKEN_ADDRESS";
pub const ENV_DESTINATION_CHAIN_SELECTOR: &str = "DESTINATION_CHAIN_SELECTOR";

/// Payment token on the source network used by the relayed path.
pub const DEFAULT_RELAY_PAYMENT_TOKEN: &str = "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238";
pub const DEFAULT_DESTINATION_CHAIN_SELECTOR: ChainSelector = ChainSelector(14_767_482_510_784_806_043);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Network on which the settlement contract lives.
    pub destination_network: NetworkId,
    #[serde(default)]
    pub settlement_contract: Option<Address>,
    #[serde(default)]
    pub payment_token: Option<Address>,
    #[serde(default)]
    pub relay_contract: Option<Address>,
    #[serde(default = "default_relay_payment_token")]
    pub relay_payment_token: Option<Address>,
    #[serde(default = "default_chain_selector")]
    pub destination_chain_selector: ChainSelector,
    #[serde(default = "default_decimals")]
    pub token_decimals: u32,
}

/// Addresses the local path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPathConfig {
    pub settlement_contract: Address,
    pub payment_token: Address,
}

/// Addresses and selector the relayed path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedPathConfig {
    pub relay_contract: Address,
    pub payment_token: Address,
    pub destination_selector: ChainSelector,
}

impl CheckoutConfig {
    pub fn new(destination_network: NetworkId) -> Self {
        Self {
            destination_network,
            settlement_contract: None,
            payment_token: None,
            relay_contract: None,
            relay_payment_token: default_relay_payment_token(),
            destination_chain_selector: default_chain_selector(),
            token_decimals: default_decimals(),
        }
    }

    pub fn local_path(&self) -> Result<LocalPathConfig, ConfigError> {
        Ok(LocalPathConfig {
            settlement_contract: require(&self.settlement_contract, ENV_SETTLEMENT_CONTRACT)?,
            payment_token: require(&self.payment_token, ENV_PAYMENT_TOKEN)?,
        })
    }

    pub fn relayed_path(&self) -> Result<RelayedPathConfig, ConfigError> {
        Ok(RelayedPathConfig {
            relay_contract: require(&self.relay_contract, ENV_RELAY_CONTRACT)?,
            payment_token: require(&self.relay_payment_token, ENV_RELAY_PAYMENT_TOKEN)?,
            destination_selector: self.destination_chain_selector,
        })
    }

    /// Names of the settings `path` needs that are not set.
    pub fn missing_for(&self, path: PaymentPath) -> Vec<&'static str> {
        let required = match path {
            PaymentPath::Local => [
                (&self.settlement_contract, ENV_SETTLEMENT_CONTRACT),
                (&self.payment_token, ENV_PAYMENT_TOKEN),
            ],
            PaymentPath::Relayed => [
                (&self.relay_contract, ENV_RELAY_CONTRACT),
                (&self.relay_payment_token, ENV_RELAY_PAYMENT_TOKEN),
            ],
        };
        required
            .into_iter()
            .filter(|(value, _)| value.is_none())
            .map(|(_, name)| name)
            .collect()
    }
}

fn require(value: &Option<Address>, name: &'static str) -> Result<Address, ConfigError> {
    value.clone().ok_or(ConfigError::Missing(name))
}

fn default_relay_payment_token() -> Option<Address> {
    DEFAULT_RELAY_PAYMENT_TOKEN.parse().ok()
}

fn default_chain_selector() -> ChainSelector {
    DEFAULT_DESTINATION_CHAIN_SELECTOR
}

fn default_decimals() -> u32 {
    DEFAULT_DECIMALS
}
