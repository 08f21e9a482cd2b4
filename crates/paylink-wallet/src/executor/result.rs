//! Settlement result
//!
//! Serializable snapshot of one attempt. Once terminal it never changes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connector::{AttemptId, TransactionId};
use crate::error::{Error, ExecutionError};
use crate::util::unix_time;

/// Settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Nothing submitted yet
    Idle,
    /// Submitted and awaiting finality
    Processing,
    /// Finalized
    Success,
    /// Failed, see the attached error
    Failed,
}

impl SettlementStatus {
    /// No further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Whether `next` may follow `self`
    pub fn can_transition_to(&self, next: SettlementStatus) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Processing)
                | (Self::Processing, Self::Success)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Processing => write!(f, "processing"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Recorded status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Status entered
    pub status: SettlementStatus,
    /// Unix time of the change
    pub at: u64,
}

/// Snapshot of a settlement attempt.
///
/// Only the executor moves it between statuses; callers read it through the accessors.
///
/// ```compile_fail
/// fn forge(result: &mut paylink_wallet::SettlementResult) {
///     result.status = paylink_wallet::SettlementStatus::Success;
/// }
/// ```
///
/// ```compile_fail
/// use paylink_wallet::{SettlementResult, TransactionId};
///
/// fn forge(result: &mut SettlementResult) {
///     let _ = result.mark_success(TransactionId::new("made-up"));
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    /// Local attempt identifier
    pub(crate) attempt_id: Uuid,
    /// Current status
    pub(crate) status: SettlementStatus,
    /// Ledger submission id, set on entering processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) submission_id: Option<AttemptId>,
    /// Finalized transaction id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) transaction_id: Option<TransactionId>,
    /// Failure classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<ExecutionError>,
    /// Status changes in order, starting with idle
    pub(crate) history: Vec<Transition>,
    /// Unix time of the last change
    pub(crate) updated_at: u64,
}

impl SettlementResult {
    /// New idle attempt
    pub(crate) fn new() -> Self {
        let now = unix_time();
        Self {
            attempt_id: Uuid::new_v4(),
            status: SettlementStatus::Idle,
            submission_id: None,
            transaction_id: None,
            error: None,
            history: vec![Transition {
                status: SettlementStatus::Idle,
                at: now,
            }],
            updated_at: now,
        }
    }

    /// Local attempt identifier
    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    /// Current status
    pub fn status(&self) -> SettlementStatus {
        self.status
    }

    /// Ledger submission id, once submitted
    pub fn submission_id(&self) -> Option<&AttemptId> {
        self.submission_id.as_ref()
    }

    /// Finalized transaction id
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    /// Failure classification
    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    /// Status changes in order, starting with idle
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Unix time of the last change
    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    /// Finished with a transaction id
    pub fn is_success(&self) -> bool {
        self.status == SettlementStatus::Success
    }

    /// Finished with an error
    pub fn is_failed(&self) -> bool {
        self.status == SettlementStatus::Failed
    }

    /// Statuses visited, in order
    pub fn statuses(&self) -> Vec<SettlementStatus> {
        self.history.iter().map(|t| t.status).collect()
    }

    fn transition(&mut self, next: SettlementStatus) -> Result<(), Error> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let now = unix_time();
        self.status = next;
        self.updated_at = now;
        self.history.push(Transition {
            status: next,
            at: now,
        });
        Ok(())
    }

    /// Enter processing
    pub(crate) fn mark_processing(&mut self, submission_id: Option<AttemptId>) -> Result<(), Error> {
        self.transition(SettlementStatus::Processing)?;
        self.submission_id = submission_id;
        Ok(())
    }

    /// Record the ledger submission id
    pub(crate) fn set_submission_id(&mut self, submission_id: AttemptId) -> Result<(), Error> {
        if self.status != SettlementStatus::Processing {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: SettlementStatus::Processing,
            });
        }
        self.submission_id = Some(submission_id);
        Ok(())
    }

    /// Enter success
    pub(crate) fn mark_success(&mut self, transaction_id: TransactionId) -> Result<(), Error> {
        self.transition(SettlementStatus::Success)?;
        self.transaction_id = Some(transaction_id);
        Ok(())
    }

    /// Enter failed.
    ///
    /// `transaction_id` is kept when the transaction landed but did not verify.
    pub(crate) fn mark_failed(
        &mut self,
        error: ExecutionError,
        transaction_id: Option<TransactionId>,
    ) -> Result<(), Error> {
        self.transition(SettlementStatus::Failed)?;
        self.error = Some(error);
        self.transaction_id = transaction_id;
        Ok(())
    }
}
