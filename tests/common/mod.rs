#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use xchain_checkout::application::session::CheckoutSession;
use xchain_checkout::config::CheckoutConfig;
use xchain_checkout::domain::amount::BaseUnits;
use xchain_checkout::domain::catalog::{Catalog, ItemId};
use xchain_checkout::domain::network::{Address, NetworkId, NetworkIdentity};
use xchain_checkout::domain::ports::{Operation, SigningContextRef};
use xchain_checkout::infrastructure::simulated::{LedgerEvent, SimulatedLedger, SimulatedWallet};

/// Network hosting the settlement contract.
pub const DESTINATION: NetworkId = NetworkId(43113);
/// Any other network the wallet may be on.
pub const SOURCE: NetworkId = NetworkId(11155111);

pub const TEN_TOKENS: BaseUnits = BaseUnits(10_000_000_000_000_000_000);
pub const SCENARIO_TOTAL: BaseUnits = BaseUnits(1_250_000_000_000_000_000);

pub fn address(byte: u8) -> Address {
    format!("0x{}", hex::encode([byte; 20])).parse().unwrap()
}

pub struct Fixture {
    pub ledger: SimulatedLedger,
    pub session: Arc<CheckoutSession>,
    pub account: Address,
    pub settlement: Address,
    pub token: Address,
    pub relay: Address,
    pub relay_token: Address,
}

pub async fn fixture() -> Fixture {
    fixture_with(SimulatedLedger::new()).await
}

/// Deploys both paths' contracts and funds the wallet with ten tokens on each.
pub async fn fixture_with(ledger: SimulatedLedger) -> Fixture {
    let catalog = Catalog::lab_tests();
    let account = address(0xa1);
    let settlement = address(0x5e);
    let token = address(0x70);
    let relay = address(0x7e);
    let relay_token = address(0x71);

    ledger
        .deploy_settlement(settlement.clone(), token.clone(), &catalog)
        .await;
    ledger.deploy_relay(relay.clone(), relay_token.clone()).await;
    ledger.mint(&token, &account, TEN_TOKENS).await;
    ledger.mint(&relay_token, &account, TEN_TOKENS).await;

    let mut config = CheckoutConfig::new(DESTINATION);
    config.settlement_contract = Some(settlement.clone());
    config.payment_token = Some(token.clone());
    config.relay_contract = Some(relay.clone());
    config.relay_payment_token = Some(relay_token.clone());

    Fixture {
        session: Arc::new(CheckoutSession::new(Arc::new(catalog), config)),
        ledger,
        account,
        settlement,
        token,
        relay,
        relay_token,
    }
}

impl Fixture {
    pub fn wallet(&self, network: NetworkId) -> SigningContextRef {
        Arc::new(SimulatedWallet::new(
            self.ledger.clone(),
            self.account.clone(),
            network,
        ))
    }

    pub async fn connect(&self, network: NetworkId) -> NetworkIdentity {
        self.session.attach_signer(Some(self.wallet(network))).await
    }

    pub async fn select(&self, ids: &[u32]) {
        for id in ids {
            self.session.toggle_selection(ItemId(*id)).await;
        }
    }

    /// Ledger events reduced to (kind, operation) pairs.
    pub async fn trace(&self) -> Vec<(&'static str, Operation)> {
        self.ledger
            .events()
            .await
            .iter()
            .map(|event| {
                let kind = match event {
                    LedgerEvent::Submitted { .. } => "submitted",
                    LedgerEvent::Confirmed { .. } => "confirmed",
                    LedgerEvent::Reverted { .. } => "reverted",
                };
                (kind, event.operation())
            })
            .collect()
    }

    /// Waits until the ledger has recorded at least `count` events.
    pub async fn wait_for_events(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.ledger.events().await.len() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("ledger events did not arrive in time");
    }
}
