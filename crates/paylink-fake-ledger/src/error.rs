//! Fake Ledger Error

use paylink::HoldingAccount;
use paylink_wallet::LedgerError;
use thiserror::Error;

/// Fake Ledger Error
#[derive(Debug, Error)]
pub enum Error {
    /// Attempt was never submitted or already settled
    #[error("Unknown attempt `{0}`")]
    UnknownAttempt(String),
    /// Source balance too low
    #[error("Insufficient funds in `{0}`")]
    InsufficientFunds(HoldingAccount),
    /// Holding account does not exist
    #[error("Account not found: `{0}`")]
    AccountNotFound(HoldingAccount),
    /// Balance overflow
    #[error("Amount Overflow")]
    AmountOverflow,
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<Error> for LedgerError {
    fn from(e: Error) -> Self {
        match e {
            Error::InsufficientFunds(_) => Self::InsufficientFunds,
            Error::AccountNotFound(account) => Self::AccountNotFound(account.to_string()),
            err => Self::Client(err.to_string()),
        }
    }
}
