use super::amount::BaseUnits;
use super::network::Address;
use super::ports::Confirmation;
use crate::error::{CheckoutError, LedgerError};
use serde::Serialize;

/// The two mutually exclusive payment sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentPath {
    /// Signer is on the destination network: approve, then settle.
    Local,
    /// Signer is elsewhere: transfer to the relay, then dispatch a message.
    Relayed,
}

/// States of a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutState {
    Idle,
    Validating,
    LocalPath,
    RelayedPath,
    Approving,
    Executing,
    Settled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    InvalidSubmission,
    SubmissionInProgress,
    UnknownItem,
    AmountOverflow,
    InvalidCatalog,
    Misconfigured,
    AuthorizationRejected,
    TxRejected,
    TxReverted,
}

/// Error taxonomy a [`FailureReason`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "CatalogIntegrityError")]
    CatalogIntegrity,
    #[serde(rename = "ConfigurationError")]
    Configuration,
    #[serde(rename = "AuthorizationError")]
    Authorization,
    #[serde(rename = "SettlementError")]
    Settlement,
}

impl FailureReason {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSubmission | Self::SubmissionInProgress => ErrorCategory::Validation,
            Self::UnknownItem | Self::AmountOverflow | Self::InvalidCatalog => {
                ErrorCategory::CatalogIntegrity
            }
            Self::Misconfigured => ErrorCategory::Configuration,
            Self::AuthorizationRejected => ErrorCategory::Authorization,
            Self::TxRejected | Self::TxReverted => ErrorCategory::Settlement,
        }
    }
}

impl From<&CheckoutError> for FailureReason {
    fn from(error: &CheckoutError) -> Self {
        match error {
            CheckoutError::InvalidSubmission(_) => Self::InvalidSubmission,
            CheckoutError::SubmissionInProgress => Self::SubmissionInProgress,
            CheckoutError::UnknownItem(_) => Self::UnknownItem,
            CheckoutError::AmountOverflow => Self::AmountOverflow,
            CheckoutError::DuplicateItem(_)
            | CheckoutError::InvalidAmount(_)
            | CheckoutError::Csv(_)
            | CheckoutError::Io(_) => Self::InvalidCatalog,
            CheckoutError::Config(_) => Self::Misconfigured,
            CheckoutError::Authorization { .. } => Self::AuthorizationRejected,
            CheckoutError::SignerUnavailable(source) | CheckoutError::Settlement { source, .. } => {
                match source {
                    LedgerError::Declined(_) => Self::AuthorizationRejected,
                    LedgerError::Reverted(_) => Self::TxReverted,
                    LedgerError::Rejected(_) | LedgerError::Unavailable(_) => Self::TxRejected,
                }
            }
        }
    }
}

/// External state left behind when a sequence fails after a confirmed step.
///
/// Nothing is rolled back; the effect is reported so the caller can act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingEffect {
    AllowanceGranted {
        token: Address,
        spender: Address,
        amount: BaseUnits,
    },
    FundsInRelayCustody {
        token: Address,
        relay: Address,
        amount: BaseUnits,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// Result of one submission attempt. Produced once, never retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOutcome {
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub path: Option<PaymentPath>,
    pub total: Option<BaseUnits>,
    pub confirmations: Vec<Confirmation>,
    /// States visited, in order, ending in a terminal state.
    pub states: Vec<CheckoutState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_effect: Option<PendingEffect>,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// Outcome for a submission turned away before entering the state machine.
    pub fn rejected(error: &CheckoutError) -> Self {
        let reason = FailureReason::from(error);
        Self {
            status: OutcomeStatus::Failed,
            failure_reason: Some(reason),
            category: Some(reason.category()),
            message: Some(error.to_string()),
            path: None,
            total: None,
            confirmations: Vec::new(),
            states: vec![CheckoutState::Failed],
            pending_effect: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Operation;

    #[test]
    fn test_reason_mapping_for_ledger_errors() {
        let declined = CheckoutError::from_ledger(
            Operation::Approve,
            LedgerError::Declined("user rejected".into()),
        );
        assert_eq!(FailureReason::from(&declined), FailureReason::AuthorizationRejected);
        assert_eq!(
            FailureReason::from(&declined).category(),
            ErrorCategory::Authorization
        );

        let reverted = CheckoutError::from_ledger(
            Operation::Transfer,
            LedgerError::Reverted("insufficient balance".into()),
        );
        assert_eq!(FailureReason::from(&reverted), FailureReason::TxReverted);

        let rejected = CheckoutError::from_ledger(
            Operation::SendMessage,
            LedgerError::Unavailable("timeout".into()),
        );
        assert_eq!(FailureReason::from(&rejected), FailureReason::TxRejected);
        assert_eq!(
            FailureReason::from(&rejected).category(),
            ErrorCategory::Settlement
        );
    }

    #[test]
    fn test_reason_mapping_for_signer_errors() {
        let declined = CheckoutError::SignerUnavailable(LedgerError::Declined("locked".into()));
        assert_eq!(FailureReason::from(&declined), FailureReason::AuthorizationRejected);

        let unreachable =
            CheckoutError::SignerUnavailable(LedgerError::Unavailable("wallet offline".into()));
        assert_eq!(FailureReason::from(&unreachable), FailureReason::TxRejected);
        assert_eq!(
            FailureReason::from(&unreachable).category(),
            ErrorCategory::Settlement
        );

        let detached = CheckoutError::InvalidSubmission("no signing context attached".into());
        assert_eq!(
            FailureReason::from(&detached).category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ErrorCategory::Validation).unwrap();
        assert_eq!(json, "\"ValidationError\"");
        let json = serde_json::to_string(&FailureReason::TxReverted).unwrap();
        assert_eq!(json, "\"TX_REVERTED\"");
    }

    #[test]
    fn test_rejected_outcome() {
        let outcome = TransactionOutcome::rejected(&CheckoutError::SubmissionInProgress);
        assert!(!outcome.is_success());
        assert_eq!(outcome.failure_reason, Some(FailureReason::SubmissionInProgress));
        assert_eq!(outcome.states, vec![CheckoutState::Failed]);
    }
}
