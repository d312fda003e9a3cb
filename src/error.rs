use crate::domain::catalog::ItemId;
use crate::domain::ports::Operation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),
    #[error("A submission is already in progress for this session")]
    SubmissionInProgress,
    #[error("Item {0} is not in the catalog")]
    UnknownItem(ItemId),
    #[error("Item {0} appears more than once in the catalog")]
    DuplicateItem(ItemId),
    #[error("Amount overflow while summing selected prices")]
    AmountOverflow,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Signer unavailable: {0}")]
    SignerUnavailable(#[source] LedgerError),
    #[error("{operation} was not authorized: {source}")]
    Authorization {
        operation: Operation,
        #[source]
        source: LedgerError,
    },
    #[error("{operation} failed: {source}")]
    Settlement {
        operation: Operation,
        #[source]
        source: LedgerError,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckoutError {
    /// Classifies a collaborator failure raised while running `operation`.
    pub fn from_ledger(operation: Operation, source: LedgerError) -> Self {
        match source {
            LedgerError::Declined(_) => Self::Authorization { operation, source },
            _ => Self::Settlement { operation, source },
        }
    }
}

/// Failures reported by the external ledger client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("declined by signer: {0}")]
    Declined(String),
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("reverted: {0}")]
    Reverted(String),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid address {value:?}: {reason}")]
    InvalidAddress { value: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
