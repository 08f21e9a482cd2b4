//! Errors
//!
//! Three families, in the order they can happen:
//!
//! | Family | When | Side effects |
//! |--------|------|--------------|
//! | [`paylink::DecodeError`] | resolving a link | none, no network call made |
//! | [`BuildError`] | validating against the ledger | none, nothing submitted |
//! | [`ExecutionError`] | after submission started | the batch may have landed |

use paylink::{Amount, HoldingAccount};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::SettlementStatus;

/// Wallet Error
#[derive(Debug, Error)]
pub enum Error {
    /// Settlement could not be built
    #[error(transparent)]
    Build(#[from] BuildError),
    /// Another attempt for the same intent and payer is processing
    #[error("A payment for this request is already processing")]
    AttemptInProgress,
    /// Settlement state machine refused a transition
    #[error("Invalid settlement transition from `{from}` to `{to}`")]
    InvalidTransition {
        /// Current status
        from: SettlementStatus,
        /// Requested status
        to: SettlementStatus,
    },
    /// Paylink error
    #[error(transparent)]
    Paylink(#[from] paylink::Error),
}

/// Pre-submission validation failure
#[derive(Debug, Error)]
pub enum BuildError {
    /// Intent failed validation
    #[error("Payment request is invalid: {0}")]
    InvalidIntent(#[from] paylink::Error),
    /// Payer does not hold the asset
    #[error("Payer has no holding account `{0}` for this asset")]
    PayerAccountMissing(HoldingAccount),
    /// Amount is zero once converted to base units
    #[error("Invalid amount `{0}`: below the smallest unit of the asset")]
    InvalidAmount(String),
    /// Payer balance does not cover the amount
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Base units required
        required: Amount,
        /// Base units held
        available: Amount,
    },
    /// Ledger cannot apply account creation and transfer atomically
    #[error("Ledger cannot submit account creation and transfer atomically")]
    AtomicityUnsupported,
    /// Ledger read failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Error reported by a ledger client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    /// Source balance too low
    #[error("Insufficient funds")]
    InsufficientFunds,
    /// Request timed out
    #[error("Request timed out")]
    Timeout,
    /// Ledger rejected the batch
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    /// Any other client failure
    #[error("{0}")]
    Client(String),
}

/// Error reported by a signer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The user declined to sign
    #[error("User rejected the request")]
    Rejected,
    /// Signing failed
    #[error("{0}")]
    Signing(String),
}

/// Classified post-submission failure
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExecutionError {
    /// Source or destination account does not exist
    #[error("The payment account could not be found on the ledger")]
    AccountNotFound,
    /// Payer balance too low at execution time
    #[error("Insufficient funds to complete the payment")]
    InsufficientFunds,
    /// Payer declined to sign
    #[error("The payment was rejected in the wallet")]
    UserRejected,
    /// Finality was not observed in time
    #[error("Timed out waiting for the payment to confirm")]
    NetworkTimeout,
    /// Transaction confirmed but the recipient balance did not move as expected
    #[error("Payment confirmed but the recipient received {observed} of {expected}")]
    BalanceMismatch {
        /// Base units expected at the recipient
        expected: Amount,
        /// Base units observed at the recipient
        observed: Amount,
    },
    /// Unclassified failure with the raw diagnostic
    #[error("Payment failed: {0}")]
    Unknown(String),
}

impl ExecutionError {
    /// Classify a ledger client failure message
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("user rejected")
            || lower.contains("rejected the request")
            || lower.contains("user denied")
        {
            Self::UserRejected
        } else if lower.contains("insufficient") {
            Self::InsufficientFunds
        } else if lower.contains("account not found")
            || lower.contains("could not find account")
            || lower.contains("accountnotfound")
        {
            Self::AccountNotFound
        } else if lower.contains("timed out") || lower.contains("timeout") {
            Self::NetworkTimeout
        } else {
            Self::Unknown(message.to_string())
        }
    }

    /// Check if the error is a definitive failure
    ///
    /// A definitive failure means the batch was rejected before it landed, so retrying cannot pay
    /// twice. If false the outcome on the ledger is unknown or the batch landed, and the ledger
    /// must be checked before retrying.
    pub fn is_definitive_failure(&self) -> bool {
        match self {
            Self::AccountNotFound | Self::InsufficientFunds | Self::UserRejected => true,
            Self::NetworkTimeout | Self::BalanceMismatch { .. } | Self::Unknown(_) => false,
        }
    }

    /// The transaction is known to have landed
    pub fn landed(&self) -> bool {
        matches!(self, Self::BalanceMismatch { .. })
    }
}

impl From<LedgerError> for ExecutionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(_) => Self::AccountNotFound,
            LedgerError::InsufficientFunds => Self::InsufficientFunds,
            LedgerError::Timeout => Self::NetworkTimeout,
            LedgerError::Rejected(reason) | LedgerError::Client(reason) => Self::classify(&reason),
        }
    }
}

impl From<SignerError> for ExecutionError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Rejected => Self::UserRejected,
            SignerError::Signing(reason) => Self::classify(&reason),
        }
    }
}
