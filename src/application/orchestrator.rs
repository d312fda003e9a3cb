use crate::application::pricing::compute_total;
use crate::config::{CheckoutConfig, LocalPathConfig, RelayedPathConfig};
use crate::domain::amount::BaseUnits;
use crate::domain::catalog::{Catalog, ItemId};
use crate::domain::network::{NetworkId, NetworkIdentity};
use crate::domain::outcome::{
    CheckoutState, FailureReason, OutcomeStatus, PaymentPath, PendingEffect, TransactionOutcome,
};
use crate::domain::ports::{
    Confirmation, Operation, SigningContext, SigningHandle, TxHandleBox,
};
use crate::error::{CheckoutError, LedgerError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inputs captured when the user submits: the selection and the network as
/// last resolved. Neither is read again while the submission runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub selection: Vec<ItemId>,
    pub network: NetworkIdentity,
}

/// What a validated submission will pay, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPlan {
    pub items: Vec<ItemId>,
    pub total: BaseUnits,
    pub path: PaymentPath,
}

/// Runs one payment sequence per submission.
///
/// ```text
/// Idle -> Validating -> LocalPath   -> Approving -> Executing -> Settled
///                    -> RelayedPath ---------------> Executing -> Settled
/// ```
///
/// Any non-terminal state can move to `Failed`. Every chain-mutating step is
/// confirmed before the next one is submitted, and nothing is rolled back when
/// a later step fails.
pub struct PaymentOrchestrator {
    catalog: Arc<Catalog>,
    config: CheckoutConfig,
}

impl PaymentOrchestrator {
    pub fn new(catalog: Arc<Catalog>, config: CheckoutConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Which path a signer on `network` takes.
    pub fn select_path(&self, network: NetworkId) -> PaymentPath {
        if network == self.config.destination_network {
            PaymentPath::Local
        } else {
            PaymentPath::Relayed
        }
    }

    /// Validates a submission and derives its plan. Performs no ledger calls.
    pub fn plan(&self, submission: &Submission) -> Result<PaymentPlan> {
        if submission.selection.is_empty() {
            return Err(CheckoutError::InvalidSubmission(
                "no items selected".to_string(),
            ));
        }

        let Some(network) = submission.network.known() else {
            return Err(CheckoutError::InvalidSubmission(
                "signer network is not resolved".to_string(),
            ));
        };

        let total = compute_total(&submission.selection, &self.catalog)?;

        Ok(PaymentPlan {
            items: submission.selection.clone(),
            total,
            path: self.select_path(network),
        })
    }

    /// Runs the submission to a terminal state. Failures never escape; they are
    /// folded into the returned outcome.
    pub async fn submit(
        &self,
        submission: Submission,
        context: Option<&dyn SigningContext>,
    ) -> TransactionOutcome {
        let mut run = Run::new();
        let result = self.execute(&submission, context, &mut run).await;
        run.finish(result)
    }

    async fn execute(
        &self,
        submission: &Submission,
        context: Option<&dyn SigningContext>,
        run: &mut Run,
    ) -> Result<()> {
        run.enter(CheckoutState::Validating);
        let plan = self.plan(submission)?;
        run.total = Some(plan.total);
        run.path = Some(plan.path);
        info!(
            path = ?plan.path,
            total = %plan.total,
            items = plan.items.len(),
            "Payment path selected"
        );

        match plan.path {
            PaymentPath::Local => {
                run.enter(CheckoutState::LocalPath);
                let config = self.config.local_path()?;
                let signer = acquire_signer(context).await?;
                self.pay_locally(&plan, &config, &signer, run).await
            }
            PaymentPath::Relayed => {
                run.enter(CheckoutState::RelayedPath);
                let config = self.config.relayed_path()?;
                let signer = acquire_signer(context).await?;
                self.pay_via_relay(&plan, &config, &signer, run).await
            }
        }
    }

    async fn pay_locally(
        &self,
        plan: &PaymentPlan,
        config: &LocalPathConfig,
        signer: &SigningHandle,
        run: &mut Run,
    ) -> Result<()> {
        run.enter(CheckoutState::Approving);
        let token = signer.contracts.token(&config.payment_token);
        let approval = confirm(
            Operation::Approve,
            token.approve(&config.settlement_contract, plan.total).await,
        )
        .await?;
        run.confirmed(approval);
        run.pending = Some(PendingEffect::AllowanceGranted {
            token: config.payment_token.clone(),
            spender: config.settlement_contract.clone(),
            amount: plan.total,
        });

        run.enter(CheckoutState::Executing);
        let settlement = signer.contracts.settlement(&config.settlement_contract);
        let settled = confirm(
            Operation::SelectItems,
            settlement.select_items(&plan.items).await,
        )
        .await?;
        run.confirmed(settled);
        run.pending = None;
        Ok(())
    }

    async fn pay_via_relay(
        &self,
        plan: &PaymentPlan,
        config: &RelayedPathConfig,
        signer: &SigningHandle,
        run: &mut Run,
    ) -> Result<()> {
        run.enter(CheckoutState::Executing);
        let token = signer.contracts.token(&config.payment_token);
        let transfer = confirm(
            Operation::Transfer,
            token.transfer(&config.relay_contract, plan.total).await,
        )
        .await?;
        run.confirmed(transfer);
        run.pending = Some(PendingEffect::FundsInRelayCustody {
            token: config.payment_token.clone(),
            relay: config.relay_contract.clone(),
            amount: plan.total,
        });

        // Dispatch spends the funds the transfer just put in relay custody.
        let relay = signer.contracts.relay(&config.relay_contract);
        let dispatched = confirm(
            Operation::SendMessage,
            relay
                .send_message(
                    config.destination_selector,
                    &signer.account,
                    &plan.items,
                    plan.total,
                )
                .await,
        )
        .await?;
        run.confirmed(dispatched);
        run.pending = None;
        Ok(())
    }
}

async fn acquire_signer(context: Option<&dyn SigningContext>) -> Result<SigningHandle> {
    let context = context.ok_or_else(|| {
        CheckoutError::InvalidSubmission("no signing context attached".to_string())
    })?;
    context
        .signer()
        .await
        .map_err(CheckoutError::SignerUnavailable)
}

async fn confirm(
    operation: Operation,
    submitted: std::result::Result<TxHandleBox, LedgerError>,
) -> Result<Confirmation> {
    let handle = submitted.map_err(|e| CheckoutError::from_ledger(operation, e))?;
    debug!(%operation, tx = handle.id(), "Awaiting confirmation");
    handle
        .await_confirmation()
        .await
        .map_err(|e| CheckoutError::from_ledger(operation, e))
}

/// Bookkeeping for a single submission.
struct Run {
    states: Vec<CheckoutState>,
    path: Option<PaymentPath>,
    total: Option<BaseUnits>,
    confirmations: Vec<Confirmation>,
    pending: Option<PendingEffect>,
}

impl Run {
    fn new() -> Self {
        Self {
            states: vec![CheckoutState::Idle],
            path: None,
            total: None,
            confirmations: Vec::new(),
            pending: None,
        }
    }

    fn enter(&mut self, state: CheckoutState) {
        debug!(?state, "Checkout transition");
        self.states.push(state);
    }

    fn confirmed(&mut self, confirmation: Confirmation) {
        info!(
            operation = %confirmation.operation,
            tx = %confirmation.tx,
            "Operation confirmed"
        );
        self.confirmations.push(confirmation);
    }

    fn finish(mut self, result: Result<()>) -> TransactionOutcome {
        let (status, failure_reason, message) = match result {
            Ok(()) => {
                self.enter(CheckoutState::Settled);
                info!(path = ?self.path, "Checkout settled");
                (OutcomeStatus::Success, None, None)
            }
            Err(e) => {
                self.enter(CheckoutState::Failed);
                let reason = FailureReason::from(&e);
                warn!(?reason, error = %e, "Checkout failed");
                if let Some(effect) = &self.pending {
                    warn!(?effect, "Earlier confirmed step was not rolled back");
                }
                (OutcomeStatus::Failed, Some(reason), Some(e.to_string()))
            }
        };

        TransactionOutcome {
            status,
            category: failure_reason.map(|r| r.category()),
            failure_reason,
            message,
            path: self.path,
            total: self.total,
            confirmations: self.confirmations,
            states: self.states,
            pending_effect: self.pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> PaymentOrchestrator {
        PaymentOrchestrator::new(
            Arc::new(Catalog::lab_tests()),
            CheckoutConfig::new(NetworkId(43113)),
        )
    }

    fn submission(ids: &[u32], network: NetworkIdentity) -> Submission {
        Submission {
            selection: ids.iter().copied().map(ItemId).collect(),
            network,
        }
    }

    #[test]
    fn test_path_selection() {
        let orchestrator = orchestrator();
        assert_eq!(orchestrator.select_path(NetworkId(43113)), PaymentPath::Local);
        assert_eq!(
            orchestrator.select_path(NetworkId(11155111)),
            PaymentPath::Relayed
        );
    }

    #[test]
    fn test_plan_totals_and_routes() {
        let orchestrator = orchestrator();
        let plan = orchestrator
            .plan(&submission(&[1, 2], NetworkId(43113).into()))
            .unwrap();
        assert_eq!(plan.path, PaymentPath::Local);
        assert_eq!(plan.total, BaseUnits(1_250_000_000_000_000_000));
        assert_eq!(plan.items, vec![ItemId(1), ItemId(2)]);
    }

    #[test]
    fn test_plan_rejects_unknown_network() {
        let result = orchestrator().plan(&submission(&[1], NetworkIdentity::Unknown));
        assert!(matches!(result, Err(CheckoutError::InvalidSubmission(_))));
    }

    #[test]
    fn test_plan_rejects_empty_selection_on_any_network() {
        for network in [
            NetworkIdentity::Unknown,
            NetworkId(43113).into(),
            NetworkId(1).into(),
        ] {
            let result = orchestrator().plan(&submission(&[], network));
            assert!(matches!(result, Err(CheckoutError::InvalidSubmission(_))));
        }
    }

    #[tokio::test]
    async fn test_unknown_network_fails_before_path_choice() {
        let outcome = orchestrator()
            .submit(submission(&[1], NetworkIdentity::Unknown), None)
            .await;

        assert_eq!(outcome.failure_reason, Some(FailureReason::InvalidSubmission));
        assert_eq!(outcome.path, None);
        assert_eq!(
            outcome.states,
            vec![
                CheckoutState::Idle,
                CheckoutState::Validating,
                CheckoutState::Failed
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_local_config_is_misconfigured() {
        let outcome = orchestrator()
            .submit(submission(&[1], NetworkId(43113).into()), None)
            .await;

        assert_eq!(outcome.failure_reason, Some(FailureReason::Misconfigured));
        assert_eq!(outcome.path, Some(PaymentPath::Local));
        assert!(outcome.confirmations.is_empty());
    }

    #[tokio::test]
    async fn test_missing_signing_context_is_invalid_submission() {
        let mut config = CheckoutConfig::new(NetworkId(43113));
        config.settlement_contract = Some(
            "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e".parse().unwrap(),
        );
        config.payment_token = Some(
            "0x7070707070707070707070707070707070707070".parse().unwrap(),
        );
        let orchestrator = PaymentOrchestrator::new(Arc::new(Catalog::lab_tests()), config);

        let outcome = orchestrator
            .submit(submission(&[1], NetworkId(43113).into()), None)
            .await;

        assert_eq!(outcome.failure_reason, Some(FailureReason::InvalidSubmission));
        assert_eq!(
            outcome.category,
            Some(crate::domain::outcome::ErrorCategory::Validation)
        );
        assert_eq!(outcome.path, Some(PaymentPath::Local));
        assert!(outcome.confirmations.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_item_is_catalog_integrity_failure() {
        let outcome = orchestrator()
            .submit(submission(&[1, 77], NetworkId(43113).into()), None)
            .await;

        assert_eq!(outcome.failure_reason, Some(FailureReason::UnknownItem));
        assert_eq!(
            outcome.category,
            Some(crate::domain::outcome::ErrorCategory::CatalogIntegrity)
        );
    }
}
