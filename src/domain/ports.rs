use super::amount::BaseUnits;
use super::catalog::ItemId;
use super::network::{Address, ChainSelector, NetworkId};
use crate::error::LedgerError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Chain-mutating operations the checkout can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Approve,
    Transfer,
    SelectItems,
    SendMessage,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Approve => "approve",
            Self::Transfer => "transfer",
            Self::SelectItems => "select_items",
            Self::SendMessage => "send_message",
        };
        f.write_str(name)
    }
}

/// Acknowledgment that a submitted operation was durably included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub tx: String,
    pub operation: Operation,
}

/// A submitted operation awaiting inclusion.
#[async_trait]
pub trait TxHandle: Send {
    fn id(&self) -> &str;
    async fn await_confirmation(self: Box<Self>) -> Result<Confirmation, LedgerError>;
}

#[async_trait]
pub trait TokenContract: Send + Sync {
    async fn approve(&self, spender: &Address, amount: BaseUnits) -> Result<TxHandleBox, LedgerError>;
    async fn transfer(&self, recipient: &Address, amount: BaseUnits) -> Result<TxHandleBox, LedgerError>;
}

#[async_trait]
pub trait SettlementContract: Send + Sync {
    async fn select_items(&self, ids: &[ItemId]) -> Result<TxHandleBox, LedgerError>;
}

#[async_trait]
pub trait RelayContract: Send + Sync {
    async fn send_message(
        &self,
        destination: ChainSelector,
        recipient: &Address,
        ids: &[ItemId],
        amount: BaseUnits,
    ) -> Result<TxHandleBox, LedgerError>;
}

/// Hands out contract bindings that sign with the current signer.
pub trait ContractProvider: Send + Sync {
    fn token(&self, address: &Address) -> TokenContractBox;
    fn settlement(&self, address: &Address) -> SettlementContractBox;
    fn relay(&self, address: &Address) -> RelayContractBox;
}

/// The account able to sign right now, with its contract bindings.
#[derive(Clone)]
pub struct SigningHandle {
    pub account: Address,
    pub contracts: Arc<dyn ContractProvider>,
}

impl fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningHandle")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Whichever wallet connection is currently authorized to sign.
///
/// `context_id` changes whenever the wallet switches account or network, so
/// consumers can tell a new context from the one they already resolved.
#[async_trait]
pub trait SigningContext: Send + Sync {
    fn context_id(&self) -> &str;
    async fn active_network(&self) -> Result<NetworkId, LedgerError>;
    async fn signer(&self) -> Result<SigningHandle, LedgerError>;
}

pub type TxHandleBox = Box<dyn TxHandle>;
pub type TokenContractBox = Box<dyn TokenContract>;
pub type SettlementContractBox = Box<dyn SettlementContract>;
pub type RelayContractBox = Box<dyn RelayContract>;
pub type SigningContextRef = Arc<dyn SigningContext>;
