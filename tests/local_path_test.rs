mod common;

use common::*;
use xchain_checkout::domain::amount::BaseUnits;
use xchain_checkout::domain::catalog::ItemId;
use xchain_checkout::domain::outcome::{
    CheckoutState, ErrorCategory, FailureReason, PaymentPath, PendingEffect,
};
use xchain_checkout::domain::ports::Operation;
use xchain_checkout::infrastructure::simulated::Fault;

#[tokio::test]
async fn test_local_checkout_settles() {
    let fx = fixture().await;
    fx.select(&[1, 2]).await;
    fx.connect(DESTINATION).await;

    let outcome = fx.session.submit().await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(outcome.path, Some(PaymentPath::Local));
    assert_eq!(outcome.total, Some(SCENARIO_TOTAL));
    assert_eq!(
        outcome.states,
        vec![
            CheckoutState::Idle,
            CheckoutState::Validating,
            CheckoutState::LocalPath,
            CheckoutState::Approving,
            CheckoutState::Executing,
            CheckoutState::Settled,
        ]
    );
    let operations: Vec<Operation> = outcome.confirmations.iter().map(|c| c.operation).collect();
    assert_eq!(operations, vec![Operation::Approve, Operation::SelectItems]);
    assert_eq!(outcome.pending_effect, None);

    let purchases = fx.ledger.purchases().await;
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].items, vec![ItemId(1), ItemId(2)]);
    assert_eq!(purchases[0].paid, SCENARIO_TOTAL);
    assert_eq!(
        fx.ledger.balance_of(&fx.token, &fx.account).await,
        BaseUnits(8_750_000_000_000_000_000)
    );
    assert_eq!(
        fx.ledger.allowance(&fx.token, &fx.account, &fx.settlement).await,
        BaseUnits::ZERO
    );
}

#[tokio::test]
async fn test_approval_confirmed_before_settlement_is_submitted() {
    let fx = fixture().await;
    fx.select(&[1, 2]).await;
    fx.connect(DESTINATION).await;

    fx.session.submit().await;

    assert_eq!(
        fx.trace().await,
        vec![
            ("submitted", Operation::Approve),
            ("confirmed", Operation::Approve),
            ("submitted", Operation::SelectItems),
            ("confirmed", Operation::SelectItems),
        ]
    );
}

#[tokio::test]
async fn test_declined_approval_never_reaches_settlement() {
    let fx = fixture().await;
    fx.ledger.inject_fault(Operation::Approve, Fault::Decline).await;
    fx.select(&[1, 2]).await;
    fx.connect(DESTINATION).await;

    let outcome = fx.session.submit().await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.failure_reason, Some(FailureReason::AuthorizationRejected));
    assert_eq!(outcome.category, Some(ErrorCategory::Authorization));
    assert_eq!(outcome.states.last(), Some(&CheckoutState::Failed));
    assert_eq!(
        outcome.states[outcome.states.len() - 2],
        CheckoutState::Approving
    );
    assert!(
        fx.trace()
            .await
            .iter()
            .all(|(_, op)| *op != Operation::SelectItems)
    );
    assert!(fx.ledger.purchases().await.is_empty());
}

#[tokio::test]
async fn test_reverted_approval_is_settlement_error() {
    let fx = fixture().await;
    fx.ledger.inject_fault(Operation::Approve, Fault::Revert).await;
    fx.select(&[1]).await;
    fx.connect(DESTINATION).await;

    let outcome = fx.session.submit().await;

    assert_eq!(outcome.failure_reason, Some(FailureReason::TxReverted));
    assert_eq!(outcome.category, Some(ErrorCategory::Settlement));
    assert_eq!(
        fx.trace().await,
        vec![
            ("submitted", Operation::Approve),
            ("reverted", Operation::Approve),
        ]
    );
}

#[tokio::test]
async fn test_failed_settlement_leaves_allowance_in_place() {
    let fx = fixture().await;
    fx.ledger
        .inject_fault(Operation::SelectItems, Fault::Revert)
        .await;
    fx.select(&[1, 2]).await;
    fx.connect(DESTINATION).await;

    let outcome = fx.session.submit().await;

    assert_eq!(outcome.failure_reason, Some(FailureReason::TxReverted));
    assert_eq!(outcome.confirmations.len(), 1);
    assert_eq!(
        outcome.pending_effect,
        Some(PendingEffect::AllowanceGranted {
            token: fx.token.clone(),
            spender: fx.settlement.clone(),
            amount: SCENARIO_TOTAL,
        })
    );
    // No compensating revoke is issued
    assert_eq!(
        fx.ledger.allowance(&fx.token, &fx.account, &fx.settlement).await,
        SCENARIO_TOTAL
    );
}

#[tokio::test]
async fn test_resubmission_after_failure_starts_fresh() {
    let fx = fixture().await;
    fx.ledger.inject_fault(Operation::Approve, Fault::Decline).await;
    fx.select(&[3]).await;
    fx.connect(DESTINATION).await;

    let failed = fx.session.submit().await;
    assert!(!failed.is_success());

    fx.ledger.clear_faults().await;
    let retried = fx.session.submit().await;

    assert!(retried.is_success(), "{retried:?}");
    assert_eq!(
        &retried.states[..3],
        &[
            CheckoutState::Idle,
            CheckoutState::Validating,
            CheckoutState::LocalPath
        ]
    );
    assert_eq!(fx.ledger.purchases().await.len(), 1);
}
