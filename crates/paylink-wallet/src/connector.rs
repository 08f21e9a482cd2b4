//! Ledger connector
//!
//! The executor never talks to a ledger directly. Implementations of [`LedgerConnector`] wrap
//! whichever client reaches the settlement ledger.

use std::fmt::{self, Debug};
use std::time::Duration;

use async_trait::async_trait;
use paylink::{Address, Amount, HoldingAccount};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::operation::SettlementOperation;

/// Ledger-assigned identifier of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(String);

impl AttemptId {
    /// Create new [`AttemptId`]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Id as str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a finalized ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create new [`TransactionId`]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Id as str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of waiting for a submission to settle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finality {
    /// Applied by the ledger
    Finalized(TransactionId),
    /// Refused by the ledger, with its diagnostic
    Rejected(String),
    /// Not settled within the wait window
    TimedOut,
}

/// Operations authorized by a signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBatch {
    /// Signing identity
    pub signer: Address,
    /// Operations in application order
    pub operations: Vec<SettlementOperation>,
    /// Opaque signature payload
    pub payload: Vec<u8>,
}

/// Interface to the settlement ledger
#[async_trait]
pub trait LedgerConnector: Debug + Send + Sync {
    /// Whether an account exists on the ledger
    async fn account_exists(&self, address: &Address) -> Result<bool, LedgerError>;

    /// Balance of a holding account, `None` when it does not exist
    async fn get_balance(&self, account: &HoldingAccount) -> Result<Option<Amount>, LedgerError>;

    /// Whether a multi-operation batch is applied all-or-nothing
    fn supports_atomic_batch(&self) -> bool;

    /// Submit a signed batch.
    ///
    /// Returns once the ledger has accepted the batch for processing. The batch is not final yet.
    async fn submit(&self, batch: SignedBatch) -> Result<AttemptId, LedgerError>;

    /// Wait up to `timeout` for a submission to settle
    async fn await_finality(
        &self,
        attempt: &AttemptId,
        timeout: Duration,
    ) -> Result<Finality, LedgerError>;
}
