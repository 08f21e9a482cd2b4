//! Errors

use thiserror::Error;

/// Paylink Error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Address is not valid base58 or has the wrong length
    #[error("Invalid address: `{0}`")]
    InvalidAddress(String),
    /// Recipient is required when creating an intent
    #[error("Recipient is required")]
    MissingRecipient,
    /// Amount is required when creating an intent
    #[error("Amount is required")]
    MissingAmount,
    /// Intent amount must be greater than zero
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    /// Label is required when creating an intent
    #[error("Label is required")]
    MissingLabel,
    /// Message is present but empty
    #[error("Message cannot be empty, omit it instead")]
    EmptyMessage,
    /// Split intent is inconsistent
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    /// Link origin cannot be used
    #[error("Invalid link origin: `{0}`")]
    InvalidOrigin(String),
    /// Amount error
    #[error(transparent)]
    Amount(#[from] crate::amount::Error),
    /// Split allocation error
    #[error(transparent)]
    Split(#[from] crate::split::Error),
    /// Url error
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
