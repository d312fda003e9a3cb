use crate::domain::amount::BaseUnits;
use crate::domain::catalog::{Catalog, ItemId};
use crate::domain::network::{Address, ChainSelector, NetworkId};
use crate::domain::ports::{
    Confirmation, ContractProvider, Operation, RelayContract, RelayContractBox,
    SettlementContract, SettlementContractBox, SigningContext, SigningHandle, TokenContract,
    TokenContractBox, TxHandle, TxHandleBox,
};
use crate::error::LedgerError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::debug;

/// Lifecycle of submitted operations, in the order the ledger saw them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    Submitted { tx: String, operation: Operation },
    Confirmed { tx: String, operation: Operation },
    Reverted {
        tx: String,
        operation: Operation,
        reason: String,
    },
}

impl LedgerEvent {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Submitted { operation, .. }
            | Self::Confirmed { operation, .. }
            | Self::Reverted { operation, .. } => *operation,
        }
    }
}

/// Failure to force on every occurrence of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The signer refuses to sign.
    Decline,
    /// The node refuses the submission.
    RejectSubmission,
    /// The operation is included but reverts.
    Revert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Purchase {
    pub buyer: Address,
    pub items: Vec<ItemId>,
    pub paid: BaseUnits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayedMessage {
    pub sender: Address,
    pub destination: ChainSelector,
    pub recipient: Address,
    pub items: Vec<ItemId>,
    pub amount: BaseUnits,
}

#[derive(Debug, Clone)]
struct SettlementSetup {
    token: Address,
    prices: HashMap<ItemId, BaseUnits>,
}

#[derive(Debug, Default)]
struct LedgerState {
    // (token, holder)
    balances: HashMap<(Address, Address), u128>,
    // (token, owner, spender)
    allowances: HashMap<(Address, Address, Address), u128>,
    settlements: HashMap<Address, SettlementSetup>,
    // relay -> token it forwards
    relays: HashMap<Address, Address>,
    faults: HashMap<Operation, Fault>,
    purchases: Vec<Purchase>,
    messages: Vec<RelayedMessage>,
    events: Vec<LedgerEvent>,
    next_tx: u64,
}

#[derive(Debug, Clone)]
enum Effect {
    Approve {
        token: Address,
        spender: Address,
        amount: BaseUnits,
    },
    Transfer {
        token: Address,
        recipient: Address,
        amount: BaseUnits,
    },
    SelectItems {
        settlement: Address,
        items: Vec<ItemId>,
    },
    SendMessage {
        relay: Address,
        destination: ChainSelector,
        recipient: Address,
        items: Vec<ItemId>,
        amount: BaseUnits,
    },
}

impl Effect {
    fn operation(&self) -> Operation {
        match self {
            Self::Approve { .. } => Operation::Approve,
            Self::Transfer { .. } => Operation::Transfer,
            Self::SelectItems { .. } => Operation::SelectItems,
            Self::SendMessage { .. } => Operation::SendMessage,
        }
    }
}

impl LedgerState {
    fn balance(&self, token: &Address, holder: &Address) -> u128 {
        self.balances
            .get(&(token.clone(), holder.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn debit(&mut self, token: &Address, holder: &Address, amount: u128) -> Result<(), String> {
        let balance = self.balance(token, holder);
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| format!("{holder} holds {balance}, needs {amount}"))?;
        self.balances
            .insert((token.clone(), holder.clone()), remaining);
        Ok(())
    }

    fn credit(&mut self, token: &Address, holder: &Address, amount: u128) -> Result<(), String> {
        let entry = self
            .balances
            .entry((token.clone(), holder.clone()))
            .or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| "balance overflow".to_string())?;
        Ok(())
    }

    fn apply(&mut self, caller: &Address, effect: &Effect) -> Result<(), String> {
        if self.faults.get(&effect.operation()) == Some(&Fault::Revert) {
            return Err("execution reverted".to_string());
        }

        match effect {
            Effect::Approve {
                token,
                spender,
                amount,
            } => {
                self.allowances
                    .insert((token.clone(), caller.clone(), spender.clone()), amount.0);
                Ok(())
            }
            Effect::Transfer {
                token,
                recipient,
                amount,
            } => {
                self.debit(token, caller, amount.0)?;
                self.credit(token, recipient, amount.0)
            }
            Effect::SelectItems { settlement, items } => {
                let setup = self
                    .settlements
                    .get(settlement)
                    .cloned()
                    .ok_or_else(|| format!("no settlement contract at {settlement}"))?;
                let price = items.iter().try_fold(0u128, |total, id| {
                    let price = setup
                        .prices
                        .get(id)
                        .ok_or_else(|| format!("unknown item {id}"))?;
                    total
                        .checked_add(price.0)
                        .ok_or_else(|| "price overflow".to_string())
                })?;

                let key = (setup.token.clone(), caller.clone(), settlement.clone());
                let allowance = self.allowances.get(&key).copied().unwrap_or_default();
                if allowance < price {
                    return Err(format!("allowance {allowance} below price {price}"));
                }
                self.debit(&setup.token, caller, price)?;
                self.credit(&setup.token, settlement, price)?;
                self.allowances.insert(key, allowance - price);
                self.purchases.push(Purchase {
                    buyer: caller.clone(),
                    items: items.clone(),
                    paid: BaseUnits(price),
                });
                Ok(())
            }
            Effect::SendMessage {
                relay,
                destination,
                recipient,
                items,
                amount,
            } => {
                let token = self
                    .relays
                    .get(relay)
                    .cloned()
                    .ok_or_else(|| format!("no relay contract at {relay}"))?;
                // Funds leave relay custody for the destination network.
                self.debit(&token, relay, amount.0)?;
                self.messages.push(RelayedMessage {
                    sender: caller.clone(),
                    destination: *destination,
                    recipient: recipient.clone(),
                    items: items.clone(),
                    amount: *amount,
                });
                Ok(())
            }
        }
    }
}

/// An in-memory ledger implementing every contract the checkout talks to.
///
/// Tracks token balances, allowances, settlement purchases, and relayed
/// messages, and records every submission and confirmation in order. Faults
/// can be injected per operation, and confirmations can be held back behind
/// a semaphore to observe in-flight behaviour.
#[derive(Debug, Clone, Default)]
pub struct SimulatedLedger {
    state: Arc<RwLock<LedgerState>>,
    gate: Option<Arc<Semaphore>>,
}

impl SimulatedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each confirmation consumes one permit from `gate` before completing.
    pub fn with_confirmation_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Deploys a settlement contract drawing `token` at `catalog` prices.
    pub async fn deploy_settlement(&self, address: Address, token: Address, catalog: &Catalog) {
        let prices = catalog.iter().map(|item| (item.id, item.price)).collect();
        self.state
            .write()
            .await
            .settlements
            .insert(address, SettlementSetup { token, prices });
    }

    /// Deploys a relay contract forwarding `token`.
    pub async fn deploy_relay(&self, address: Address, token: Address) {
        self.state.write().await.relays.insert(address, token);
    }

    pub async fn mint(&self, token: &Address, holder: &Address, amount: BaseUnits) {
        let mut state = self.state.write().await;
        let entry = state
            .balances
            .entry((token.clone(), holder.clone()))
            .or_default();
        *entry = entry.saturating_add(amount.0);
    }

    pub async fn inject_fault(&self, operation: Operation, fault: Fault) {
        self.state.write().await.faults.insert(operation, fault);
    }

    pub async fn clear_faults(&self) {
        self.state.write().await.faults.clear();
    }

    pub async fn balance_of(&self, token: &Address, holder: &Address) -> BaseUnits {
        BaseUnits(self.state.read().await.balance(token, holder))
    }

    pub async fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> BaseUnits {
        let state = self.state.read().await;
        let key = (token.clone(), owner.clone(), spender.clone());
        BaseUnits(state.allowances.get(&key).copied().unwrap_or_default())
    }

    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.state.read().await.events.clone()
    }

    pub async fn purchases(&self) -> Vec<Purchase> {
        self.state.read().await.purchases.clone()
    }

    pub async fn messages(&self) -> Vec<RelayedMessage> {
        self.state.read().await.messages.clone()
    }

    /// Contract bindings signing as `caller`.
    pub fn bind(&self, caller: Address) -> Arc<dyn ContractProvider> {
        Arc::new(BoundContracts {
            ledger: self.clone(),
            caller,
        })
    }

    async fn submit(&self, caller: &Address, effect: Effect) -> Result<TxHandleBox, LedgerError> {
        let operation = effect.operation();
        let mut state = self.state.write().await;

        match state.faults.get(&operation) {
            Some(Fault::Decline) => {
                return Err(LedgerError::Declined(format!("{caller} declined {operation}")));
            }
            Some(Fault::RejectSubmission) => {
                return Err(LedgerError::Rejected(format!("{operation} refused by node")));
            }
            _ => {}
        }

        state.next_tx += 1;
        let tx = format!("0x{:064x}", state.next_tx);
        state.events.push(LedgerEvent::Submitted {
            tx: tx.clone(),
            operation,
        });
        debug!(%operation, %tx, "Simulated submission");

        Ok(Box::new(PendingTx {
            ledger: self.clone(),
            tx,
            caller: caller.clone(),
            effect,
        }))
    }
}

struct PendingTx {
    ledger: SimulatedLedger,
    tx: String,
    caller: Address,
    effect: Effect,
}

#[async_trait]
impl TxHandle for PendingTx {
    fn id(&self) -> &str {
        &self.tx
    }

    async fn await_confirmation(self: Box<Self>) -> Result<Confirmation, LedgerError> {
        if let Some(gate) = &self.ledger.gate {
            gate.acquire()
                .await
                .map_err(|_| LedgerError::Unavailable("confirmation gate closed".to_string()))?
                .forget();
        }

        let operation = self.effect.operation();
        let mut state = self.ledger.state.write().await;
        match state.apply(&self.caller, &self.effect) {
            Ok(()) => {
                state.events.push(LedgerEvent::Confirmed {
                    tx: self.tx.clone(),
                    operation,
                });
                Ok(Confirmation {
                    tx: self.tx.clone(),
                    operation,
                })
            }
            Err(reason) => {
                state.events.push(LedgerEvent::Reverted {
                    tx: self.tx.clone(),
                    operation,
                    reason: reason.clone(),
                });
                Err(LedgerError::Reverted(reason))
            }
        }
    }
}

struct BoundContracts {
    ledger: SimulatedLedger,
    caller: Address,
}

impl ContractProvider for BoundContracts {
    fn token(&self, address: &Address) -> TokenContractBox {
        Box::new(SimulatedToken {
            ledger: self.ledger.clone(),
            caller: self.caller.clone(),
            address: address.clone(),
        })
    }

    fn settlement(&self, address: &Address) -> SettlementContractBox {
        Box::new(SimulatedSettlement {
            ledger: self.ledger.clone(),
            caller: self.caller.clone(),
            address: address.clone(),
        })
    }

    fn relay(&self, address: &Address) -> RelayContractBox {
        Box::new(SimulatedRelay {
            ledger: self.ledger.clone(),
            caller: self.caller.clone(),
            address: address.clone(),
        })
    }
}

struct SimulatedToken {
    ledger: SimulatedLedger,
    caller: Address,
    address: Address,
}

#[async_trait]
impl TokenContract for SimulatedToken {
    async fn approve(&self, spender: &Address, amount: BaseUnits) -> Result<TxHandleBox, LedgerError> {
        let effect = Effect::Approve {
            token: self.address.clone(),
            spender: spender.clone(),
            amount,
        };
        self.ledger.submit(&self.caller, effect).await
    }

    async fn transfer(&self, recipient: &Address, amount: BaseUnits) -> Result<TxHandleBox, LedgerError> {
        let effect = Effect::Transfer {
            token: self.address.clone(),
            recipient: recipient.clone(),
            amount,
        };
        self.ledger.submit(&self.caller, effect).await
    }
}

struct SimulatedSettlement {
    ledger: SimulatedLedger,
    caller: Address,
    address: Address,
}

#[async_trait]
impl SettlementContract for SimulatedSettlement {
    async fn select_items(&self, ids: &[ItemId]) -> Result<TxHandleBox, LedgerError> {
        let effect = Effect::SelectItems {
            settlement: self.address.clone(),
            items: ids.to_vec(),
        };
        self.ledger.submit(&self.caller, effect).await
    }
}

struct SimulatedRelay {
    ledger: SimulatedLedger,
    caller: Address,
    address: Address,
}

#[async_trait]
impl RelayContract for SimulatedRelay {
    async fn send_message(
        &self,
        destination: ChainSelector,
        recipient: &Address,
        ids: &[ItemId],
        amount: BaseUnits,
    ) -> Result<TxHandleBox, LedgerError> {
        let effect = Effect::SendMessage {
            relay: self.address.clone(),
            destination,
            recipient: recipient.clone(),
            items: ids.to_vec(),
            amount,
        };
        self.ledger.submit(&self.caller, effect).await
    }
}

/// A wallet connected to [`SimulatedLedger`] on a given network.
///
/// The context id combines account and network, so switching either one
/// yields a new signing context.
pub struct SimulatedWallet {
    id: String,
    account: Address,
    network: NetworkId,
    ledger: SimulatedLedger,
    network_query_fails: bool,
}

impl SimulatedWallet {
    pub fn new(ledger: SimulatedLedger, account: Address, network: NetworkId) -> Self {
        Self {
            id: format!("{account}@{network}"),
            account,
            network,
            ledger,
            network_query_fails: false,
        }
    }

    /// Makes the network query fail, as a disconnected provider would.
    pub fn with_failing_network_query(mut self) -> Self {
        self.network_query_fails = true;
        self
    }

    pub fn account(&self) -> &Address {
        &self.account
    }
}

#[async_trait]
impl SigningContext for SimulatedWallet {
    fn context_id(&self) -> &str {
        &self.id
    }

    async fn active_network(&self) -> Result<NetworkId, LedgerError> {
        if self.network_query_fails {
            return Err(LedgerError::Unavailable("provider disconnected".to_string()));
        }
        Ok(self.network)
    }

    async fn signer(&self) -> Result<SigningHandle, LedgerError> {
        Ok(SigningHandle {
            account: self.account.clone(),
            contracts: self.ledger.bind(self.account.clone()),
        })
    }
}
